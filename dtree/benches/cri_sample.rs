use criterion::{criterion_group, criterion_main, Criterion};
use dtree::ballot::{total, Ballot, BallotCount};
use dtree::params::Parameters;
use dtree::tree::Tree;
use tinyrand::Wyrand;

fn observed_tree(vd: bool) -> Tree {
    let mut tree = Tree::new(Parameters::new(8, 0, 8, 1.0, vd).unwrap(), "bench").unwrap();
    tree.update_all([
        BallotCount::new(Ballot::from([0, 1, 2, 3]), 40),
        BallotCount::new(Ballot::from([1, 0, 4]), 25),
        BallotCount::new(Ballot::from([2, 5, 6, 7, 1]), 15),
        BallotCount::new(Ballot::from([7]), 10),
    ])
    .unwrap();
    tree
}

fn criterion_benchmark(c: &mut Criterion) {
    let fixed = observed_tree(false);
    let variable = observed_tree(true);

    // sanity check
    assert_eq!(100, total(&fixed.sample_with(100, &mut Wyrand::default())));

    c.bench_function("cri_sample_fixed_depth_1k", |b| {
        let mut rand = Wyrand::default();
        b.iter(|| fixed.sample_with(1_000, &mut rand));
    });

    c.bench_function("cri_sample_variable_depth_1k", |b| {
        let mut rand = Wyrand::default();
        b.iter(|| variable.sample_with(1_000, &mut rand));
    });

    c.bench_function("cri_marginal_probability", |b| {
        let mut rand = Wyrand::default();
        let ballot = Ballot::from([0, 1, 2, 3, 4, 5, 6, 7]);
        b.iter(|| fixed.marginal_probability_with(&ballot, &mut rand));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
