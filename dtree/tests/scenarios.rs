use assert_float_eq::*;
use dtree::ballot::{total, Ballot, BallotCount, InvalidBallot, Outcome};
use dtree::engine;
use dtree::irv::{social_choice_irv, split_winners};
use dtree::params::{InvalidParameters, Parameters};
use dtree::posterior::{Interrupt, PosteriorConfig, SimulationError};
use dtree::tree::Tree;
use dtree_testing::assert_probs_sum;

const A: usize = 0;
const B: usize = 1;
const C: usize = 2;

fn three_candidates(vd: bool) -> Parameters {
    Parameters::new(3, 0, 3, 1.0, vd).unwrap()
}

fn observed() -> Vec<BallotCount> {
    [vec![A, B], vec![B, A], vec![C]]
        .into_iter()
        .map(|preferences| BallotCount::from(Ballot::new(preferences)))
        .collect()
}

#[test]
fn reset_restores_the_prior() {
    let mut fresh: Tree = Tree::new(three_candidates(false), "42").unwrap();
    let expected = fresh.sample(5);

    let mut tree = Tree::new(three_candidates(false), "42").unwrap();
    tree.update_all(observed()).unwrap();
    tree.reset();
    tree.set_seed("42");
    assert_eq!(expected, tree.sample(5));
}

#[test]
fn identical_call_sequences_reproduce() {
    fn run() -> (Vec<BallotCount>, Vec<Vec<f64>>) {
        let mut tree = Tree::new(Parameters::new(4, 1, 4, 0.5, true).unwrap(), "seq").unwrap();
        tree.update_all([
            BallotCount::new(Ballot::from([0, 1, 2, 3]), 3),
            BallotCount::new(Ballot::from([3, 2]), 2),
        ])
        .unwrap();
        let samples = tree.sample(30);
        tree.update(BallotCount::from(Ballot::from([1]))).unwrap();
        let probs = (0..3)
            .map(|_| {
                tree.sample_posterior(&PosteriorConfig::new(40, 20, 1, 3), "7", &Interrupt::default())
                    .unwrap()
            })
            .collect();
        (samples, probs)
    }
    assert_eq!(run(), run());
}

#[test]
fn posterior_sets_complete_the_observed() {
    let mut tree = Tree::new(three_candidates(true), "sets").unwrap();
    let observed = observed();
    tree.update_all(observed.clone()).unwrap();
    let sets = tree.posterior_sets(6, 25).unwrap();
    assert_eq!(6, sets.len());
    for set in sets {
        assert_eq!(25, total(&set));
        assert_eq!(&observed[..], &set[..observed.len()]);
        for bc in &set {
            assert!(bc.ballot.len() <= 3);
            bc.validate(3).unwrap();
        }
    }
}

#[test]
fn strict_majority_always_wins() {
    let ballots = vec![
        BallotCount::new(Ballot::from([C, A]), 51),
        BallotCount::new(Ballot::from([A, B]), 30),
        BallotCount::new(Ballot::from([B]), 19),
    ];
    for seed in 0..10 {
        let elimination = social_choice_irv(&ballots, 3, &mut engine::seeded(seed.to_string())).unwrap();
        assert_eq!(&[C], split_winners(&elimination, 1).1);
    }
}

#[test]
fn win_probabilities() {
    let mut tree = Tree::new(three_candidates(false), "42").unwrap();
    tree.update_all(observed()).unwrap();
    let probs = tree
        .sample_posterior(&PosteriorConfig::new(100, 10, 1, 4), "7", &Interrupt::default())
        .unwrap();
    assert_eq!(3, probs.len());
    assert!(probs.iter().all(|&prob| (0.0..=1.0).contains(&prob)));
    assert_probs_sum(1.0, &probs, 1e-9);
}

#[test]
fn marginal_probability_averages_towards_observed_share() {
    let mut tree = Tree::new(Parameters::new(2, 2, 2, 1.0, false).unwrap(), "marginal").unwrap();
    tree.update(BallotCount::new(Ballot::from([A, B]), 18)).unwrap();
    let draws = tree
        .sample_marginal_probability(4_000, &Ballot::from([A, B]), "marginal")
        .unwrap();
    let mean = draws.iter().sum::<f64>() / draws.len() as f64;
    // Beta(18.5, 0.5) posterior at the root; the only child branch is certain
    assert_float_absolute_eq!(18.5 / 19.0, mean, 0.01);
}

#[test]
fn sample_predictive_flattens() {
    let mut tree = Tree::new(Parameters::new(3, 3, 3, 1.0, false).unwrap(), "predictive").unwrap();
    tree.update_all(observed()).unwrap();
    let ballots = tree.sample_predictive(12, "predictive");
    assert_eq!(12, ballots.len());
    assert!(ballots.iter().all(|ballot| ballot.len() == 3));
    assert_eq!(ballots, tree.sample_predictive(12, "predictive"));
}

#[test]
fn variable_depth_keeps_the_ballot_length_law() {
    fn length_shares(vd: bool) -> [f64; 4] {
        let mut tree = Tree::new(three_candidates(vd), "42").unwrap();
        tree.update_all(observed()).unwrap();
        let mut lengths = [0.0; 4];
        let draws = 5_000;
        for _ in 0..draws {
            for bc in tree.sample(2) {
                lengths[bc.ballot.len()] += bc.count as f64 / (2 * draws) as f64;
            }
        }
        lengths
    }
    let polya = length_shares(false);
    let flat = length_shares(true);
    assert!(polya[0] > 0.0 && polya[1] > 0.0 && polya[2] > 0.0);
    for (polya, flat) in polya.iter().zip(&flat) {
        assert_float_absolute_eq!(*polya, *flat, 0.02);
    }
}

#[test]
fn min_depth_exceeding_max_depth() {
    assert_eq!(
        Err(InvalidParameters::MinDepthExceedsMaxDepth {
            min_depth: 3,
            max_depth: 2
        }),
        Parameters::new(3, 3, 2, 1.0, false)
    );
}

#[test]
fn too_few_ballots_for_posterior() {
    let mut tree = Tree::new(three_candidates(false), "42").unwrap();
    tree.update_all(observed()).unwrap();
    let result = tree.sample_posterior(&PosteriorConfig::new(10, 2, 1, 2), "7", &Interrupt::default());
    assert!(matches!(result, Err(SimulationError::TooFewBallots { .. })));
}

#[test]
fn out_of_range_candidate() {
    let mut tree = Tree::new(three_candidates(false), "42").unwrap();
    assert_eq!(
        Err(InvalidBallot::UnknownCandidate {
            candidate: 3,
            n_candidates: 3
        }),
        tree.update(BallotCount::from(Ballot::from([A, 3])))
    );
    assert_eq!(0, tree.n_observed());
}

#[test]
fn cancellation_discards_results() {
    let mut tree = Tree::new(three_candidates(false), "42").unwrap();
    tree.update_all(observed()).unwrap();
    let interrupt = Interrupt::default();
    let signal = interrupt.clone();
    signal.raise();
    let result = tree.sample_posterior(&PosteriorConfig::new(1_000, 10, 1, 4), "7", &interrupt);
    assert!(matches!(result, Err(SimulationError::Cancelled)));
}
