//! The Dirichlet-tree driver: owns the root [Node], the [Parameters], the observed ballots and the
//! tree's own pseudo-random stream.

use crate::ballot::{validate_preferences, Ballot, BallotCount, InvalidBallot, Outcome};
use crate::engine::{self, Engine};
use crate::node::{Node, SamplingPath};
use crate::params::{InvalidParameters, Parameters};
use rustc_hash::FxHashSet;
use std::fmt::{Debug, Display, Formatter};
use std::mem;
use thiserror::Error;
use tinyrand::Rand;
use tracing::{debug, trace, warn};

/// Advisory, non-fatal diagnostics. The operation that produced them went ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A ballot shorter than `min_depth` was observed; the posterior no longer reduces exactly to
    /// a single Dirichlet distribution.
    ShortBallot { length: usize, min_depth: usize },

    /// `min_depth` was raised above the length of some already-observed ballot.
    ShortBallotsObserved { shortest: usize, min_depth: usize },
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::ShortBallot { length, min_depth } => write!(
                f,
                "observed a ballot ranking {length} candidate(s), fewer than min_depth ({min_depth}); \
                 the posterior can no longer reduce to a Dirichlet distribution"
            ),
            Warning::ShortBallotsObserved { shortest, min_depth } => write!(
                f,
                "ballots ranking as few as {shortest} candidate(s) have been observed, fewer than \
                 min_depth ({min_depth}); the posterior can no longer reduce to a Dirichlet distribution"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("set size {set_size} is smaller than the {observed} observed ballots")]
pub struct SetSizeTooSmall {
    pub set_size: u64,
    pub observed: u64,
}

pub struct Tree<O = Ballot> {
    root: Node,
    params: Parameters,
    observed: Vec<BallotCount<O>>,
    n_observed: u64,
    observed_depths: FxHashSet<usize>,
    engine: Engine,
}

impl<O: Debug> Debug for Tree<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("params", &self.params)
            .field("n_nodes", &self.root.n_nodes())
            .field("n_observed", &self.n_observed)
            .field("observed", &self.observed)
            .finish_non_exhaustive()
    }
}

impl<O: Outcome> Tree<O> {
    pub fn new(params: Parameters, seed: impl AsRef<[u8]>) -> Result<Self, InvalidParameters> {
        params.validate()?;
        Ok(Self {
            root: Node::new(0, &params),
            params,
            observed: vec![],
            n_observed: 0,
            observed_depths: FxHashSet::default(),
            engine: engine::seeded(seed),
        })
    }

    #[inline]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The observed ballots, in order of observation.
    #[inline]
    pub fn observed(&self) -> &[BallotCount<O>] {
        &self.observed
    }

    /// Number of observed ballots, counting multiplicities.
    #[inline]
    pub fn n_observed(&self) -> u64 {
        self.n_observed
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Whether every non-empty observed ballot ranks at least `min_depth` candidates.
    pub fn is_reducible(&self) -> bool {
        self.shortest_below_min_depth().is_none()
    }

    fn shortest_below_min_depth(&self) -> Option<usize> {
        let min_depth = self.params.min_depth();
        self.observed_depths
            .iter()
            .copied()
            .filter(|&depth| depth > 0 && depth < min_depth)
            .min()
    }

    /// The flat path when `vd` is set and the posterior still reduces to a single Dirichlet;
    /// otherwise the per-level Pólya path. Both sample the same law.
    pub fn sampling_path(&self) -> SamplingPath {
        if self.params.vd() && self.is_reducible() {
            SamplingPath::Flat
        } else {
            SamplingPath::Polya
        }
    }

    /// Re-seeds the tree's stream from an arbitrary-length seed and warms it up.
    pub fn set_seed(&mut self, seed: impl AsRef<[u8]>) {
        self.engine = engine::seeded(seed);
    }

    /// Returns the tree to its prior, discarding every node and observation. The parameters and
    /// the stream are retained.
    pub fn reset(&mut self) {
        debug!(
            "resetting tree of {} nodes after {} observed ballots",
            self.root.n_nodes(),
            self.n_observed
        );
        self.root = Node::new(0, &self.params);
        self.observed.clear();
        self.n_observed = 0;
        self.observed_depths.clear();
    }

    pub fn update(&mut self, ballot_count: BallotCount<O>) -> Result<Vec<Warning>, InvalidBallot> {
        self.update_all([ballot_count])
    }

    /// Observes a batch of ballots. Every ballot is validated before the first one is applied, so
    /// an invalid ballot leaves the tree untouched.
    pub fn update_all(
        &mut self,
        ballot_counts: impl IntoIterator<Item = BallotCount<O>>,
    ) -> Result<Vec<Warning>, InvalidBallot> {
        let ballot_counts: Vec<_> = ballot_counts.into_iter().collect();
        for ballot_count in &ballot_counts {
            ballot_count.validate(self.params.n_candidates())?;
        }

        let mut warnings = vec![];
        let min_depth = self.params.min_depth();
        for ballot_count in ballot_counts {
            let length = ballot_count.ballot.len();
            if length > 0 && length < min_depth {
                let warning = Warning::ShortBallot { length, min_depth };
                warn!("{warning}");
                warnings.push(warning);
            }
            trace!("observing {:?} × {}", ballot_count.ballot.preferences(), ballot_count.count);
            self.root.update(ballot_count.ballot.preferences(), ballot_count.count, &self.params);
            self.n_observed += ballot_count.count;
            self.observed_depths.insert(length);
            self.observed.push(ballot_count);
        }
        Ok(warnings)
    }

    /// Samples `n` outcomes from the posterior predictive using the tree's stream.
    pub fn sample(&mut self, n: u64) -> Vec<BallotCount<O>> {
        self.with_engine(|tree, rand| tree.sample_with(n, rand))
    }

    pub fn sample_with(&self, n: u64, rand: &mut impl Rand) -> Vec<BallotCount<O>> {
        let mut out = vec![];
        self.root.sample(
            n,
            &mut self.params.default_path(),
            &self.params,
            self.sampling_path(),
            rand,
            &mut out,
        );
        out
    }

    /// One Monte Carlo realisation of the posterior probability of observing `outcome`.
    pub fn marginal_probability(&mut self, outcome: &O) -> Result<f64, InvalidBallot> {
        self.with_engine(|tree, rand| tree.marginal_probability_with(outcome, rand))
    }

    pub fn marginal_probability_with(&self, outcome: &O, rand: &mut impl Rand) -> Result<f64, InvalidBallot> {
        validate_preferences(outcome.preferences(), self.params.n_candidates())?;
        Ok(self.root.marginal_probability(
            outcome.preferences(),
            &mut self.params.default_path(),
            &self.params,
            rand,
        ))
    }

    /// Draws `n_sets` completions of a population of `set_size` ballots. Each set holds every
    /// observed ballot plus `set_size - n_observed` ballots sampled from the posterior.
    pub fn posterior_sets(
        &mut self,
        n_sets: usize,
        set_size: u64,
    ) -> Result<Vec<Vec<BallotCount<O>>>, SetSizeTooSmall> {
        self.with_engine(|tree, rand| tree.posterior_sets_with(n_sets, set_size, rand))
    }

    pub fn posterior_sets_with(
        &self,
        n_sets: usize,
        set_size: u64,
        rand: &mut impl Rand,
    ) -> Result<Vec<Vec<BallotCount<O>>>, SetSizeTooSmall> {
        if set_size < self.n_observed {
            return Err(SetSizeTooSmall {
                set_size,
                observed: self.n_observed,
            });
        }
        let unobserved = set_size - self.n_observed;
        Ok((0..n_sets)
            .map(|_| {
                let mut set = self.observed.clone();
                set.extend(self.sample_with(unobserved, rand));
                set
            })
            .collect())
    }

    /// Re-seeds the stream, then samples `n` individual ballots from the posterior predictive.
    pub fn sample_predictive(&mut self, n: u64, seed: impl AsRef<[u8]>) -> Vec<O> {
        self.set_seed(seed);
        crate::ballot::flatten(&self.sample(n))
    }

    /// Re-seeds the stream, then draws `n_samples` realisations of the marginal probability of
    /// `outcome`.
    pub fn sample_marginal_probability(
        &mut self,
        n_samples: usize,
        outcome: &O,
        seed: impl AsRef<[u8]>,
    ) -> Result<Vec<f64>, InvalidBallot> {
        validate_preferences(outcome.preferences(), self.params.n_candidates())?;
        self.set_seed(seed);
        (0..n_samples)
            .map(|_| self.marginal_probability(outcome))
            .collect()
    }

    /// Sets `min_depth`, warning if ballots shorter than the new value have already been observed.
    pub fn set_min_depth(&mut self, min_depth: usize) -> Result<Vec<Warning>, InvalidParameters> {
        self.params.set_min_depth(min_depth)?;
        Ok(self
            .shortest_below_min_depth()
            .map(|shortest| {
                let warning = Warning::ShortBallotsObserved { shortest, min_depth };
                warn!("{warning}");
                vec![warning]
            })
            .unwrap_or_default())
    }

    pub fn set_max_depth(&mut self, max_depth: usize) -> Result<(), InvalidParameters> {
        self.params.set_max_depth(max_depth)
    }

    pub fn set_a0(&mut self, a0: f64) -> Result<(), InvalidParameters> {
        self.params.set_a0(a0)
    }

    pub fn set_vd(&mut self, vd: bool) {
        self.params.set_vd(vd);
    }

    pub fn set_stop_weight(&mut self, stop_weight: f64) -> Result<(), InvalidParameters> {
        self.params.set_stop_weight(stop_weight)
    }

    /// Lends the tree's own stream to an operation that otherwise takes `&self`.
    fn with_engine<R>(&mut self, f: impl FnOnce(&Self, &mut Engine) -> R) -> R {
        let mut engine = mem::take(&mut self.engine);
        let result = f(self, &mut engine);
        self.engine = engine;
        result
    }
}

#[cfg(test)]
mod tests;
