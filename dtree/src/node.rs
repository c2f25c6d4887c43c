//! Interior nodes of a ranked-ballot Dirichlet-tree.
//!
//! A node at depth `d` stands for one ranking prefix of length `d`. It holds a Dirichlet
//! pseudo-count for each candidate not yet on that prefix, plus a stop branch that is only
//! consulted when ballots may end at depth `d`, i.e. `min_depth <= d < max_depth`. Counts record observations
//! only; prior shares are added at query time so that parameter changes apply to the whole tree
//! at once.
//!
//! Children are materialised lazily by [Node::update]. Sampling and marginal queries take `&self`
//! and stand in a transient prior node for any child that does not exist yet, so they may run
//! concurrently over a shared tree.

use crate::ballot::{BallotCount, Outcome};
use crate::engine;
use crate::params::{Parameters, Path};
use tinyrand::Rand;

/// How the draws routed through a node are split among its branches. Both paths sample the same
/// Dirichlet-tree-multinomial law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingPath {
    /// A sequential Pólya urn over the posterior concentrations of every visited node.
    Polya,

    /// One realisation of every visited node's posterior Dirichlet, after which the draws are
    /// split multinomially: the outcomes are independent draws from a single categorical
    /// distribution over complete rankings.
    Flat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    depth: usize,
    counts: Vec<f64>,
    children: Vec<Option<Box<Node>>>,
}

impl Node {
    pub fn new(depth: usize, params: &Parameters) -> Self {
        debug_assert!(depth < params.n_candidates(), "no branches below depth {depth}");
        let remaining = params.n_candidates() - depth;
        Self {
            depth,
            counts: vec![0.0; remaining + 1],
            children: (0..remaining).map(|_| None).collect(),
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of candidates not yet ranked on the path to this node.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.children.len()
    }

    #[inline]
    fn stop_branch(&self) -> usize {
        self.children.len()
    }

    /// Observed counts per branch, the stop branch last.
    #[inline]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn child(&self, branch: usize) -> Option<&Node> {
        self.children.get(branch).and_then(Option::as_deref)
    }

    /// Number of materialised nodes in this subtree, including this one.
    pub fn n_nodes(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|child| child.n_nodes())
            .sum::<usize>()
    }

    /// Posterior Dirichlet concentrations per branch: observed counts plus prior shares. The stop
    /// branch is zero where ballots may not end.
    pub fn alphas(&self, params: &Parameters) -> Vec<f64> {
        let remaining = self.remaining();
        let prior = params.branch_prior(remaining);
        let mut alphas = Vec::with_capacity(remaining + 1);
        alphas.extend(self.counts[..remaining].iter().map(|count| count + prior));
        alphas.push(if params.stop_allowed(self.depth) {
            self.counts[remaining] + params.stop_prior(remaining)
        } else {
            0.0
        });
        alphas
    }

    /// Adds `count` observations of `preferences` to every node along its path, truncating at
    /// `max_depth`. A ballot that ends early increments the stop branch where it ends, if there
    /// is one.
    pub fn update(&mut self, preferences: &[usize], count: u64, params: &Parameters) {
        let depth = self.depth;
        if depth >= params.max_depth() {
            return;
        }
        let Some(&candidate) = preferences.get(depth) else {
            if params.stop_allowed(depth) {
                let stop = self.stop_branch();
                self.counts[stop] += count as f64;
            }
            return;
        };

        let branch = branch_index(candidate, &preferences[..depth]);
        self.counts[branch] += count as f64;
        if depth + 1 < params.max_depth() {
            self.children[branch]
                .get_or_insert_with(|| Box::new(Node::new(depth + 1, params)))
                .update(preferences, count, params);
        }
    }

    /// Samples `n` outcomes below the prefix `path`, appending them to `out` with multiplicities.
    ///
    /// Under [SamplingPath::Polya] each draw adds to a scratch copy of the concentrations, so the
    /// batch is exchangeable rather than independent. Either way, the draws routed to each branch
    /// are then split recursively by the child.
    pub fn sample<O: Outcome>(
        &self,
        n: u64,
        path: &mut Path,
        params: &Parameters,
        sampling: SamplingPath,
        rand: &mut impl Rand,
        out: &mut Vec<BallotCount<O>>,
    ) {
        debug_assert_eq!(self.depth, path.len());
        if n == 0 {
            return;
        }
        let depth = self.depth;
        if depth >= params.max_depth() {
            out.push(BallotCount::new(O::from_preferences(path.clone()), n));
            return;
        }

        let mut alphas = self.alphas(params);
        let tallies = match sampling {
            SamplingPath::Polya => polya_split(n, &mut alphas, rand),
            SamplingPath::Flat => {
                let mut probs = vec![0.0; alphas.len()];
                engine::dirichlet(&alphas, &mut probs, rand);
                multinomial_split(n, &probs, rand)
            }
        };
        for (branch, &tally) in tallies.iter().enumerate() {
            if tally == 0 {
                continue;
            }
            if branch == self.stop_branch() {
                out.push(BallotCount::new(O::from_preferences(path.clone()), tally));
                continue;
            }

            let candidate = candidate_at(branch, path);
            path.push(candidate);
            if depth + 1 >= params.max_depth() {
                out.push(BallotCount::new(O::from_preferences(path.clone()), tally));
            } else {
                match &self.children[branch] {
                    Some(child) => child.sample(tally, path, params, sampling, rand, out),
                    None => Node::new(depth + 1, params).sample(tally, path, params, sampling, rand, out),
                }
            }
            path.pop();
        }
    }

    /// One Monte Carlo realisation of the probability of observing `preferences`: a probability
    /// vector is drawn from each visited node's posterior Dirichlet and the transition
    /// probabilities along the path are multiplied. Average repeated calls to estimate the
    /// posterior marginal.
    ///
    /// A ballot ending where no stop branch exists (shorter than `min_depth`) can never be
    /// generated, and has probability zero.
    pub fn marginal_probability(
        &self,
        preferences: &[usize],
        path: &mut Path,
        params: &Parameters,
        rand: &mut impl Rand,
    ) -> f64 {
        debug_assert_eq!(self.depth, path.len());
        let depth = self.depth;
        if depth >= params.max_depth() {
            return 1.0;
        }
        let branch = match preferences.get(depth) {
            Some(&candidate) => branch_index(candidate, path),
            None if params.stop_allowed(depth) => self.stop_branch(),
            None => return 0.0,
        };

        let alphas = self.alphas(params);
        let mut probs = vec![0.0; alphas.len()];
        engine::dirichlet(&alphas, &mut probs, rand);
        let prob = probs[branch];
        if branch == self.stop_branch() || depth + 1 >= params.max_depth() {
            return prob;
        }

        path.push(preferences[depth]);
        let onward = match &self.children[branch] {
            Some(child) => child.marginal_probability(preferences, path, params, rand),
            None => Node::new(depth + 1, params).marginal_probability(preferences, path, params, rand),
        };
        path.pop();
        prob * onward
    }
}

/// Splits `n` draws among branches by a sequential Pólya urn over `alphas`, which is consumed as
/// the running urn state.
fn polya_split(n: u64, alphas: &mut [f64], rand: &mut impl Rand) -> Vec<u64> {
    let mut tallies = vec![0; alphas.len()];
    for _ in 0..n {
        let branch = engine::categorical(alphas, rand);
        alphas[branch] += 1.0;
        tallies[branch] += 1;
    }
    tallies
}

/// Position of `candidate` among the candidates absent from `path`, in index order.
#[inline]
fn branch_index(candidate: usize, path: &[usize]) -> usize {
    candidate - path.iter().filter(|&&used| used < candidate).count()
}

/// Splits `n` independent draws among branches with fixed probabilities `probs`.
fn multinomial_split(n: u64, probs: &[f64], rand: &mut impl Rand) -> Vec<u64> {
    let mut cumulative = Vec::with_capacity(probs.len());
    let mut sum = 0.0;
    for &prob in probs {
        sum += prob;
        cumulative.push(sum);
    }
    let last_nonzero = probs.iter().rposition(|&prob| prob > 0.0).unwrap_or_default();
    let mut tallies = vec![0; probs.len()];
    for _ in 0..n {
        let target = engine::random_f64(rand) * sum;
        let branch = cumulative.partition_point(|&bound| bound <= target);
        tallies[usize::min(branch, last_nonzero)] += 1;
    }
    tallies
}

/// The candidate at position `branch` among those absent from `path`, in index order: the least
/// fixed point of `c = branch + |{used <= c}|`.
fn candidate_at(branch: usize, path: &[usize]) -> usize {
    let mut candidate = branch;
    loop {
        let shifted = branch + path.iter().filter(|&&used| used <= candidate).count();
        if shifted == candidate {
            return candidate;
        }
        candidate = shifted;
    }
}
