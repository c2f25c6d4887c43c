//! Monte Carlo estimation of each candidate's probability of winning, by simulating complete
//! elections from the posterior in parallel batches.
//!
//! Worker sub-seeds are drawn from the tree's stream in a single pass before dispatch, one per
//! batch plus one for the remainder handled on the calling thread, so results are bit-identical
//! however the pool schedules its tasks.

use crate::ballot::Outcome;
use crate::engine;
use crate::irv::{self, InvalidElection};
use crate::timed::Timed;
use crate::tree::{SetSizeTooSmall, Tree};
use rayon::ThreadPoolBuildError;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tinyrand::Rand;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("n_ballots ({n_ballots}) must be at least the number of observed ballots ({observed})")]
    TooFewBallots { n_ballots: u64, observed: u64 },

    #[error("n_winners ({n_winners}) must be at least 1 and fewer than the number of candidates ({n_candidates})")]
    InvalidWinners { n_winners: usize, n_candidates: usize },

    #[error("at least one election must be simulated")]
    NoElections,

    #[error("at least one batch is required")]
    NoBatches,

    #[error("simulation cancelled")]
    Cancelled,

    #[error("{0}")]
    SetSizeTooSmall(#[from] SetSizeTooSmall),

    #[error("{0}")]
    InvalidElection(#[from] InvalidElection),

    #[error("{0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

/// A cooperative cancellation signal, shared between the caller and a running simulation.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorConfig {
    /// Number of complete elections to simulate.
    pub n_elections: usize,
    /// Size of the full ballot population, observed ballots included.
    pub n_ballots: u64,
    pub n_winners: usize,
    pub n_batches: usize,
    /// Worker pool size; defaults to the available hardware parallelism.
    pub threads: Option<usize>,
}

impl PosteriorConfig {
    pub fn new(n_elections: usize, n_ballots: u64, n_winners: usize, n_batches: usize) -> Self {
        Self {
            n_elections,
            n_ballots,
            n_winners,
            n_batches,
            threads: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn validate(&self, n_candidates: usize, n_observed: u64) -> Result<(), SimulationError> {
        if self.n_ballots < n_observed {
            return Err(SimulationError::TooFewBallots {
                n_ballots: self.n_ballots,
                observed: n_observed,
            });
        }
        if self.n_winners < 1 || self.n_winners >= n_candidates {
            return Err(SimulationError::InvalidWinners {
                n_winners: self.n_winners,
                n_candidates,
            });
        }
        if self.n_elections == 0 {
            return Err(SimulationError::NoElections);
        }
        if self.n_batches == 0 {
            return Err(SimulationError::NoBatches);
        }
        Ok(())
    }

    fn threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    /// Elections per pool batch, and the remainder left to the calling thread.
    fn partition(&self) -> (usize, usize) {
        if self.n_elections <= 1 {
            (0, self.n_elections)
        } else {
            (
                self.n_elections / self.n_batches,
                self.n_elections % self.n_batches,
            )
        }
    }
}

/// A unit of work, owning everything a worker needs besides the shared read-only tree.
#[derive(Debug, Clone, Copy)]
struct Batch {
    index: usize,
    seed: u64,
    n_elections: usize,
}

type EliminationOrders = Vec<Vec<usize>>;

impl<O: Outcome> Tree<O> {
    /// Re-seeds the tree from `seed`, then estimates each candidate's probability of being among
    /// the `n_winners` IRV winners of the full population of `n_ballots`.
    ///
    /// The returned vector holds one entry per candidate, summing to `n_winners`. If `interrupt`
    /// is raised while the simulation runs, no estimate is returned.
    pub fn sample_posterior(
        &mut self,
        config: &PosteriorConfig,
        seed: impl AsRef<[u8]>,
        interrupt: &Interrupt,
    ) -> Result<Vec<f64>, SimulationError> {
        let n_candidates = self.params().n_candidates();
        config.validate(n_candidates, self.n_observed())?;
        self.set_seed(seed);
        let seeds: Vec<u64> = (0..=config.n_batches)
            .map(|_| self.engine_mut().next_u64())
            .collect();
        let (batch_size, remainder) = config.partition();
        let threads = config.threads();
        debug!(
            "simulating {} elections of {} ballots: {} batches of {batch_size} + {remainder} on {threads} threads",
            config.n_elections, config.n_ballots, config.n_batches
        );

        let tree = &*self;
        let timed = Timed::result(|| {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
            let mut slots: Vec<Result<EliminationOrders, SimulationError>> =
                (0..config.n_batches).map(|_| Ok(vec![])).collect();
            let remainder_orders = pool.in_place_scope(|scope| {
                for (index, slot) in slots.iter_mut().enumerate() {
                    let batch = Batch {
                        index,
                        seed: seeds[index],
                        n_elections: batch_size,
                    };
                    scope.spawn(move |_| *slot = tree.simulate_batch(batch, config.n_ballots, interrupt));
                }
                let batch = Batch {
                    index: config.n_batches,
                    seed: seeds[config.n_batches],
                    n_elections: remainder,
                };
                tree.simulate_batch(batch, config.n_ballots, interrupt)
            });

            let mut wins = vec![0u64; n_candidates];
            for orders in slots.into_iter().chain([remainder_orders]) {
                for elimination in orders? {
                    let (_, winners) = irv::split_winners(&elimination, config.n_winners);
                    for &winner in winners {
                        wins[winner] += 1;
                    }
                }
            }
            Ok::<_, SimulationError>(
                wins.into_iter()
                    .map(|count| count as f64 / config.n_elections as f64)
                    .collect::<Vec<_>>(),
            )
        })?;
        debug!("posterior: {:?}, took {:.3}s", timed.value, timed.elapsed_secs());
        Ok(timed.value)
    }

    fn simulate_batch(
        &self,
        batch: Batch,
        n_ballots: u64,
        interrupt: &Interrupt,
    ) -> Result<EliminationOrders, SimulationError> {
        if interrupt.is_raised() {
            debug!("batch {} cancelled before starting", batch.index);
            return Err(SimulationError::Cancelled);
        }
        let n_candidates = self.params().n_candidates();
        let mut rand = engine::from_u64(batch.seed);
        let elections = self.posterior_sets_with(batch.n_elections, n_ballots, &mut rand)?;
        elections
            .iter()
            .map(|election| {
                if interrupt.is_raised() {
                    return Err(SimulationError::Cancelled);
                }
                match irv::social_choice_irv(election, n_candidates, &mut rand) {
                    Err(InvalidElection::NoValidBallots) => Ok(tied_elimination(n_candidates, &mut rand)),
                    result => Ok(result?),
                }
            })
            .collect()
    }
}

/// The elimination order of an election in which no ballot expresses a preference: every round
/// is a tie among all remaining candidates.
fn tied_elimination(n_candidates: usize, rand: &mut impl Rand) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..n_candidates).collect();
    let mut elimination = Vec::with_capacity(n_candidates);
    while !remaining.is_empty() {
        let index = engine::random_index(remaining.len(), rand);
        elimination.push(remaining.remove(index));
    }
    elimination
}
