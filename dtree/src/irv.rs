//! The instant-runoff (IRV) social choice function.
//!
//! Candidates are eliminated one at a time, fewest first-preference votes first, until one
//! remains. Multi-winner contests are modelled as the last `n_winners` candidates of the
//! elimination order, a simplification of proportional STV.

use crate::ballot::{BallotCount, InvalidBallot, Outcome};
use crate::engine;
use std::mem;
use thiserror::Error;
use tinyrand::Rand;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidElection {
    #[error("no valid ballots for the IRV social choice function")]
    NoValidBallots,

    #[error("{0}")]
    InvalidBallot(#[from] InvalidBallot),
}

/// Computes the IRV elimination order over `ballots`, first eliminated to last remaining.
///
/// Ballots exhausted of active preferences no longer count. Ties for the fewest votes are broken
/// uniformly at random; `rand` is consulted only when such a tie occurs.
pub fn social_choice_irv<O: Outcome>(
    ballots: &[BallotCount<O>],
    n_candidates: usize,
    rand: &mut impl Rand,
) -> Result<Vec<usize>, InvalidElection> {
    let mut tallies = vec![0u64; n_candidates];
    // the ballots presently counting towards each candidate, with the position of that preference
    let mut piles: Vec<Vec<(usize, usize)>> = vec![vec![]; n_candidates];
    for (index, bc) in ballots.iter().enumerate() {
        let preferences = bc.ballot.preferences();
        if let Some(&candidate) = preferences.iter().find(|&&candidate| candidate >= n_candidates) {
            return Err(InvalidBallot::UnknownCandidate {
                candidate,
                n_candidates,
            }
            .into());
        }
        if let Some(&first) = preferences.first() {
            tallies[first] += bc.count;
            piles[first].push((index, 0));
        }
    }
    if tallies.iter().all(|&tally| tally == 0) {
        return Err(InvalidElection::NoValidBallots);
    }

    let mut active = vec![true; n_candidates];
    let mut elimination = Vec::with_capacity(n_candidates);
    let mut lowest = Vec::with_capacity(n_candidates);
    for _ in 1..n_candidates {
        let fewest = (0..n_candidates)
            .filter(|&candidate| active[candidate])
            .map(|candidate| tallies[candidate])
            .min()
            .unwrap_or_default();
        lowest.clear();
        lowest.extend((0..n_candidates).filter(|&candidate| active[candidate] && tallies[candidate] == fewest));
        let eliminated = match lowest.len() {
            1 => lowest[0],
            ties => lowest[engine::random_index(ties, rand)],
        };

        active[eliminated] = false;
        tallies[eliminated] = 0;
        elimination.push(eliminated);
        for (index, position) in mem::take(&mut piles[eliminated]) {
            let bc = &ballots[index];
            let transfer = bc
                .ballot
                .preferences()
                .iter()
                .enumerate()
                .skip(position + 1)
                .find(|&(_, &candidate)| active[candidate]);
            if let Some((next_position, &next)) = transfer {
                tallies[next] += bc.count;
                piles[next].push((index, next_position));
            }
        }
    }
    elimination.extend((0..n_candidates).filter(|&candidate| active[candidate]));
    Ok(elimination)
}

/// Splits an elimination order into the eliminated candidates and the last `n_winners`, who are
/// declared the winners.
pub fn split_winners(elimination: &[usize], n_winners: usize) -> (&[usize], &[usize]) {
    elimination.split_at(elimination.len().saturating_sub(n_winners))
}
