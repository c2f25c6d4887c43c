//! Ranked ballots and the capabilities a tree requires of its outcomes.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// An outcome of the stochastic process modelled by a Dirichlet-tree: an ordered sequence of
/// distinct candidate indices.
pub trait Outcome: Clone + Send + Sync {
    fn from_preferences(preferences: Vec<usize>) -> Self;

    fn preferences(&self) -> &[usize];

    #[inline]
    fn len(&self) -> usize {
        self.preferences().len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn truncated(&self, depth: usize) -> Self {
        let prefs = self.preferences();
        Self::from_preferences(prefs[..usize::min(depth, prefs.len())].to_vec())
    }
}

/// A (possibly partial) ranking of candidates, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Ballot(Vec<usize>);

impl Ballot {
    pub fn new(preferences: Vec<usize>) -> Self {
        Self(preferences)
    }
}

impl Outcome for Ballot {
    fn from_preferences(preferences: Vec<usize>) -> Self {
        Self(preferences)
    }

    #[inline]
    fn preferences(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Ballot {
    fn from(preferences: Vec<usize>) -> Self {
        Self(preferences)
    }
}

impl<const N: usize> From<[usize; N]> for Ballot {
    fn from(preferences: [usize; N]) -> Self {
        Self(preferences.to_vec())
    }
}

impl Display for Ballot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (index, candidate) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{candidate}")?;
        }
        write!(f, "]")
    }
}

/// An outcome together with the number of times it occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCount<O = Ballot> {
    pub ballot: O,
    pub count: u64,
}

impl<O> BallotCount<O> {
    pub fn new(ballot: O, count: u64) -> Self {
        Self { ballot, count }
    }
}

impl<O: Outcome> BallotCount<O> {
    pub fn validate(&self, n_candidates: usize) -> Result<(), InvalidBallot> {
        if self.count == 0 {
            return Err(InvalidBallot::ZeroCount);
        }
        validate_preferences(self.ballot.preferences(), n_candidates)
    }
}

impl<O: Outcome> From<O> for BallotCount<O> {
    fn from(ballot: O) -> Self {
        Self { ballot, count: 1 }
    }
}

/// Total number of ballots in a multiset, counting multiplicities.
pub fn total<O>(ballots: &[BallotCount<O>]) -> u64 {
    ballots.iter().map(|bc| bc.count).sum()
}

/// Expands a multiset into individual ballots.
pub fn flatten<O: Clone>(ballots: &[BallotCount<O>]) -> Vec<O> {
    ballots
        .iter()
        .flat_map(|bc| std::iter::repeat(bc.ballot.clone()).take(bc.count as usize))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidBallot {
    #[error("unknown candidate {candidate} (expected an index below {n_candidates})")]
    UnknownCandidate { candidate: usize, n_candidates: usize },

    #[error("candidate {0} ranked more than once")]
    DuplicateCandidate(usize),

    #[error("ballot count must be at least 1")]
    ZeroCount,
}

pub fn validate_preferences(preferences: &[usize], n_candidates: usize) -> Result<(), InvalidBallot> {
    let mut seen = vec![false; n_candidates];
    for &candidate in preferences {
        if candidate >= n_candidates {
            return Err(InvalidBallot::UnknownCandidate {
                candidate,
                n_candidates,
            });
        }
        if seen[candidate] {
            return Err(InvalidBallot::DuplicateCandidate(candidate));
        }
        seen[candidate] = true;
    }
    Ok(())
}
