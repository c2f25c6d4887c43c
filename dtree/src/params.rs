//! Shape and prior-strength configuration of a Dirichlet-tree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A traversal state: the candidates chosen so far on the way down from the root.
pub type Path = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidParameters {
    #[error("at least 2 candidates are required, got {0}")]
    TooFewCandidates(usize),

    #[error("min_depth ({min_depth}) cannot exceed max_depth ({max_depth})")]
    MinDepthExceedsMaxDepth { min_depth: usize, max_depth: usize },

    #[error("max_depth ({max_depth}) cannot exceed the number of candidates ({n_candidates})")]
    MaxDepthExceedsCandidates { max_depth: usize, n_candidates: usize },

    #[error("a0 must be positive, got {0}")]
    NonPositiveA0(f64),

    #[error("stop_weight must be positive, got {0}")]
    NonPositiveStopWeight(f64),
}

/// Parameters of a ranked-ballot Dirichlet-tree.
///
/// `min_depth` and `max_depth` bound the length of ballots the tree generates; `a0` is the prior
/// concentration at each interior node. Every node whose depth lies in `min_depth..max_depth`
/// carries an extra _stop_ branch, so that generated ballots may end before `max_depth`. The prior
/// share of the stop branch is `stop_weight` times that of a single candidate branch.
///
/// `vd` selects the flat sampling path whenever the posterior still reduces to a single Dirichlet
/// (see [SamplingPath](crate::node::SamplingPath)). It never changes the distribution sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    n_candidates: usize,
    min_depth: usize,
    max_depth: usize,
    a0: f64,
    vd: bool,
    #[serde(default = "default_stop_weight")]
    stop_weight: f64,
}

fn default_stop_weight() -> f64 {
    1.0
}

impl Parameters {
    pub fn new(
        n_candidates: usize,
        min_depth: usize,
        max_depth: usize,
        a0: f64,
        vd: bool,
    ) -> Result<Self, InvalidParameters> {
        let params = Self {
            n_candidates,
            min_depth,
            max_depth,
            a0,
            vd,
            stop_weight: default_stop_weight(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_stop_weight(mut self, stop_weight: f64) -> Result<Self, InvalidParameters> {
        self.set_stop_weight(stop_weight)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), InvalidParameters> {
        if self.n_candidates < 2 {
            return Err(InvalidParameters::TooFewCandidates(self.n_candidates));
        }
        if self.min_depth > self.max_depth {
            return Err(InvalidParameters::MinDepthExceedsMaxDepth {
                min_depth: self.min_depth,
                max_depth: self.max_depth,
            });
        }
        if self.max_depth > self.n_candidates {
            return Err(InvalidParameters::MaxDepthExceedsCandidates {
                max_depth: self.max_depth,
                n_candidates: self.n_candidates,
            });
        }
        // negated comparisons also reject NaN
        if !(self.a0 > 0.0) {
            return Err(InvalidParameters::NonPositiveA0(self.a0));
        }
        if !(self.stop_weight > 0.0) {
            return Err(InvalidParameters::NonPositiveStopWeight(self.stop_weight));
        }
        Ok(())
    }

    #[inline]
    pub fn n_candidates(&self) -> usize {
        self.n_candidates
    }

    #[inline]
    pub fn min_depth(&self) -> usize {
        self.min_depth
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline]
    pub fn a0(&self) -> f64 {
        self.a0
    }

    #[inline]
    pub fn vd(&self) -> bool {
        self.vd
    }

    #[inline]
    pub fn stop_weight(&self) -> f64 {
        self.stop_weight
    }

    pub fn set_min_depth(&mut self, min_depth: usize) -> Result<(), InvalidParameters> {
        self.apply(|params| params.min_depth = min_depth)
    }

    pub fn set_max_depth(&mut self, max_depth: usize) -> Result<(), InvalidParameters> {
        self.apply(|params| params.max_depth = max_depth)
    }

    pub fn set_a0(&mut self, a0: f64) -> Result<(), InvalidParameters> {
        self.apply(|params| params.a0 = a0)
    }

    pub fn set_vd(&mut self, vd: bool) {
        self.vd = vd;
    }

    pub fn set_stop_weight(&mut self, stop_weight: f64) -> Result<(), InvalidParameters> {
        self.apply(|params| params.stop_weight = stop_weight)
    }

    /// Applies `change` to a copy and commits only if the result validates.
    fn apply(&mut self, change: impl FnOnce(&mut Self)) -> Result<(), InvalidParameters> {
        let mut candidate = self.clone();
        change(&mut candidate);
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// The empty path from which every descent starts.
    pub fn default_path(&self) -> Path {
        Vec::with_capacity(self.max_depth)
    }

    /// Whether a node at `depth` carries a stop branch.
    #[inline]
    pub fn stop_allowed(&self, depth: usize) -> bool {
        depth >= self.min_depth && depth < self.max_depth
    }

    /// Prior pseudo-count of each candidate branch at a node with `remaining` unused candidates.
    #[inline]
    pub fn branch_prior(&self, remaining: usize) -> f64 {
        self.a0 / remaining as f64
    }

    /// Prior pseudo-count of the stop branch at a node with `remaining` unused candidates.
    #[inline]
    pub fn stop_prior(&self, remaining: usize) -> f64 {
        self.stop_weight * self.branch_prior(remaining)
    }
}
