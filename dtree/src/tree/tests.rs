use super::*;
use crate::ballot::total;

const A: usize = 0;
const B: usize = 1;
const C: usize = 2;

fn tree(min_depth: usize, max_depth: usize, vd: bool) -> Tree {
    Tree::new(Parameters::new(3, min_depth, max_depth, 1.0, vd).unwrap(), "42").unwrap()
}

fn ballots(rankings: &[&[usize]]) -> Vec<BallotCount> {
    rankings
        .iter()
        .map(|ranking| BallotCount::from(Ballot::new(ranking.to_vec())))
        .collect()
}

#[test]
fn reset_matches_fresh_tree() {
    let mut fresh = tree(0, 3, false);
    let expected = fresh.sample_predictive(5, "42");

    let mut tree = tree(0, 3, false);
    tree.update_all(ballots(&[&[A, B], &[B, A], &[C]])).unwrap();
    tree.reset();
    assert_eq!(0, tree.n_observed());
    assert!(tree.observed().is_empty());
    assert_eq!(1, tree.root().n_nodes());
    assert_eq!(expected, tree.sample_predictive(5, "42"));
}

#[test]
fn reset_retains_params() {
    let mut tree = tree(1, 2, true);
    tree.set_a0(2.5).unwrap();
    tree.reset();
    assert_eq!(&Parameters::new(3, 1, 2, 2.5, true).unwrap(), tree.params());
}

#[test]
fn fixed_seed_reproducibility() {
    fn run() -> (Vec<BallotCount>, Vec<BallotCount>) {
        let mut tree = tree(1, 3, true);
        tree.update_all(ballots(&[&[A, B, C], &[B], &[C, A]])).unwrap();
        tree.set_seed("7");
        let first = tree.sample(20);
        let second = tree.sample(20);
        (first, second)
    }
    assert_eq!(run(), run());
}

#[test]
fn update_counts_multiplicities() {
    let mut tree = tree(0, 3, false);
    let warnings = tree
        .update_all([
            BallotCount::new(Ballot::from([A, B, C]), 4),
            BallotCount::new(Ballot::from([C]), 2),
        ])
        .unwrap();
    assert!(warnings.is_empty());
    assert_eq!(6, tree.n_observed());
    assert_eq!(2, tree.observed().len());
    assert_eq!(&[4.0, 0.0, 2.0, 0.0], tree.root().counts());
}

#[test]
fn update_rejects_out_of_range_without_mutation() {
    let mut tree = tree(0, 3, false);
    let result = tree.update_all(ballots(&[&[A, B], &[A, 3]]));
    assert_eq!(
        Err(InvalidBallot::UnknownCandidate {
            candidate: 3,
            n_candidates: 3
        }),
        result
    );
    assert_eq!(0, tree.n_observed());
    assert_eq!(&[0.0, 0.0, 0.0, 0.0], tree.root().counts());
}

#[test]
fn update_rejects_duplicates() {
    let mut tree = tree(0, 3, false);
    assert_eq!(
        Err(InvalidBallot::DuplicateCandidate(B)),
        tree.update(Ballot::from([B, C, B]).into())
    );
}

#[test]
fn update_warns_on_short_ballot() {
    let mut tree = tree(2, 3, true);
    assert!(tree.is_reducible());
    let warnings = tree.update_all(ballots(&[&[A], &[], &[B, C]])).unwrap();
    assert_eq!(
        vec![Warning::ShortBallot {
            length: 1,
            min_depth: 2
        }],
        warnings
    );
    assert_eq!(3, tree.n_observed());
    assert!(!tree.is_reducible());
}

#[test]
fn set_min_depth_warns_on_observed_short_ballots() {
    let mut tree = tree(0, 3, true);
    tree.update_all(ballots(&[&[A, B], &[C], &[]])).unwrap();
    assert!(tree.set_min_depth(1).unwrap().is_empty());
    assert_eq!(
        vec![Warning::ShortBallotsObserved {
            shortest: 1,
            min_depth: 2
        }],
        tree.set_min_depth(2).unwrap()
    );
    assert_eq!(2, tree.params().min_depth());
    assert!(tree.set_min_depth(4).is_err());
    assert_eq!(2, tree.params().min_depth());
}

#[test]
fn setters_validate() {
    let mut tree = tree(1, 2, false);
    assert!(tree.set_max_depth(0).is_err());
    assert!(tree.set_max_depth(4).is_err());
    assert!(tree.set_a0(0.0).is_err());
    assert!(tree.set_stop_weight(0.0).is_err());
    tree.set_max_depth(3).unwrap();
    tree.set_vd(true);
    assert_eq!(&Parameters::new(3, 1, 3, 1.0, true).unwrap(), tree.params());
}

#[test]
fn samples_are_well_formed() {
    for (min_depth, max_depth, vd) in [(0, 3, false), (0, 2, false), (1, 3, true), (0, 3, true)] {
        let mut tree = tree(min_depth, max_depth, vd);
        tree.update_all(ballots(&[&[A, B], &[B, A, C], &[C]])).unwrap();
        let samples = tree.sample(200);
        assert_eq!(200, total(&samples));
        for bc in &samples {
            assert!(bc.ballot.len() <= max_depth);
            assert!(bc.ballot.len() >= min_depth);
            bc.validate(3).unwrap();
        }
    }
}

#[test]
fn fixed_depth_samples_are_complete() {
    let mut tree = tree(2, 2, true);
    tree.update_all(ballots(&[&[A, B], &[C, A]])).unwrap();
    assert!(tree.sample(100).iter().all(|bc| bc.ballot.len() == 2));
}

#[test]
fn sampling_path_selection() {
    assert_eq!(SamplingPath::Polya, tree(0, 3, false).sampling_path());

    let mut tree = tree(2, 3, true);
    tree.update_all(ballots(&[&[A, B], &[C, A], &[]])).unwrap();
    assert_eq!(SamplingPath::Flat, tree.sampling_path());

    tree.update(Ballot::from([C]).into()).unwrap();
    assert_eq!(SamplingPath::Polya, tree.sampling_path());

    tree.reset();
    assert_eq!(SamplingPath::Flat, tree.sampling_path());
    tree.set_vd(false);
    assert_eq!(SamplingPath::Polya, tree.sampling_path());
}

#[test]
fn debug_format() {
    let mut tree = tree(0, 3, true);
    tree.update_all(ballots(&[&[A, B], &[C]])).unwrap();
    let formatted = format!("{tree:?}");
    assert!(formatted.starts_with("Tree {"), "{formatted}");
    assert!(formatted.contains("n_observed: 2"), "{formatted}");
    assert!(formatted.ends_with(".. }"), "{formatted}");
}

#[test]
fn posterior_sets_contain_observed() {
    let mut tree = tree(0, 3, true);
    let observed = ballots(&[&[A, B], &[B, A], &[C]]);
    tree.update_all(observed.clone()).unwrap();
    let sets = tree.posterior_sets(4, 10).unwrap();
    assert_eq!(4, sets.len());
    for set in &sets {
        assert_eq!(10, total(set));
        assert_eq!(&observed[..], &set[..observed.len()]);
    }
}

#[test]
fn posterior_sets_draw_independently() {
    let mut tree = tree(0, 3, false);
    tree.update(Ballot::from([A, B, C]).into()).unwrap();
    let sets = tree.posterior_sets(8, 50).unwrap();
    assert!(sets.windows(2).any(|pair| pair[0] != pair[1]));
}

#[test]
fn posterior_sets_of_exactly_observed() {
    let mut tree = tree(0, 3, false);
    let observed = ballots(&[&[A], &[B]]);
    tree.update_all(observed.clone()).unwrap();
    assert_eq!(vec![observed.clone(), observed], tree.posterior_sets(2, 2).unwrap());
}

#[test]
fn posterior_sets_too_small() {
    let mut tree = tree(0, 3, false);
    tree.update_all(ballots(&[&[A], &[B], &[C]])).unwrap();
    assert_eq!(
        Err(SetSizeTooSmall {
            set_size: 2,
            observed: 3
        }),
        tree.posterior_sets(1, 2)
    );
}

#[test]
fn sample_marginal_probability() {
    let mut tree = tree(0, 3, false);
    tree.update(BallotCount::new(Ballot::from([A, B, C]), 5)).unwrap();
    let draws = tree
        .sample_marginal_probability(100, &Ballot::from([A, B, C]), "m")
        .unwrap();
    assert_eq!(100, draws.len());
    assert!(draws.iter().all(|&draw| draw > 0.0 && draw <= 1.0));
    assert_eq!(
        draws,
        tree.sample_marginal_probability(100, &Ballot::from([A, B, C]), "m")
            .unwrap()
    );
    assert!(tree
        .sample_marginal_probability(1, &Ballot::from([A, 5]), "m")
        .is_err());
}

#[test]
fn tree_is_shareable_across_threads() {
    fn assert_sync<T: Sync + Send>() {}
    assert_sync::<Tree>();
}
