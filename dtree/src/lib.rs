//! Bayesian inference over ranked-choice ballots with a Dirichlet-tree prior.
//! Estimates the posterior probability of each candidate winning an instant-runoff election,
//! given a partial observation of the ballots, by simulating complete elections in parallel.

#![allow(clippy::too_many_arguments)]

pub mod ballot;
pub mod engine;
pub mod file;
pub mod irv;
pub mod node;
pub mod params;
pub mod posterior;
pub mod print;
pub mod probs;
pub mod timed;
pub mod tree;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
