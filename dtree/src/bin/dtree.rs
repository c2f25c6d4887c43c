use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use dtree::ballot::{Ballot, BallotCount};
use dtree::file::read_json;
use dtree::params::Parameters;
use dtree::posterior::{Interrupt, PosteriorConfig};
use dtree::print::{tabulate_ballots, tabulate_posterior};
use dtree::timed::Timed;
use dtree::tree::Tree;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// JSON file of observed ballots, each a list of candidate names or a {"ballot", "count"} object
    #[clap(short = 'f', long)]
    file: PathBuf,

    /// comma-separated candidate names; defaults to the order of first appearance in the file
    #[clap(short = 'c', long, value_delimiter = ',')]
    candidates: Option<Vec<String>>,

    /// minimum ballot length generated by the tree
    #[clap(long, default_value = "0")]
    min_depth: usize,

    /// maximum ballot length generated by the tree; defaults to the number of candidates
    #[clap(long)]
    max_depth: Option<usize>,

    /// prior concentration at each node
    #[clap(long, default_value = "1.0")]
    a0: f64,

    /// sample through one Dirichlet realisation per node while the posterior allows it
    #[clap(long)]
    vd: bool,

    /// prior weight of the stop branch relative to a candidate branch
    #[clap(long, default_value = "1.0")]
    stop_weight: f64,

    /// seed of the pseudo-random stream
    #[clap(short = 's', long, default_value = "1")]
    seed: String,

    /// total number of ballots cast in the election, observed ones included
    #[clap(short = 'n', long)]
    ballots: Option<u64>,

    /// number of elections to simulate
    #[clap(short = 'e', long, default_value = "10000")]
    elections: usize,

    /// number of winners
    #[clap(short = 'w', long, default_value = "1")]
    winners: usize,

    /// number of batches to split the elections into; defaults to the number of threads
    #[clap(short = 'b', long)]
    batches: Option<usize>,

    /// size of the worker pool; defaults to the available parallelism
    #[clap(short = 't', long)]
    threads: Option<usize>,

    /// print this many ballots sampled from the posterior predictive instead of win probabilities
    #[clap(short = 'p', long)]
    predictive: Option<u64>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.predictive.is_none() && self.ballots.is_none() {
            bail!("the total number of ballots (-n) is required to simulate elections");
        }
        if self.threads == Some(0) {
            bail!("at least one thread is required");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BallotEntry {
    Ranking(Vec<String>),
    Counted { ballot: Vec<String>, count: u64 },
}
impl BallotEntry {
    fn names(&self) -> &[String] {
        match self {
            BallotEntry::Ranking(names) => names,
            BallotEntry::Counted { ballot, .. } => ballot,
        }
    }

    fn count(&self) -> u64 {
        match self {
            BallotEntry::Ranking(_) => 1,
            BallotEntry::Counted { count, .. } => *count,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let entries: Vec<BallotEntry> = read_json(&args.file)
        .with_context(|| format!("reading ballots from {}", args.file.display()))?;
    let candidates = args
        .candidates
        .clone()
        .unwrap_or_else(|| candidates_by_appearance(&entries));
    let ballot_counts = resolve(&entries, &candidates)?;
    info!(
        "read {} distinct ballots over {} candidates",
        ballot_counts.len(),
        candidates.len()
    );

    let params = Parameters::new(
        candidates.len(),
        args.min_depth,
        args.max_depth.unwrap_or(candidates.len()),
        args.a0,
        args.vd,
    )?
    .with_stop_weight(args.stop_weight)?;
    let mut tree = Tree::new(params, &args.seed)?;
    tree.update_all(ballot_counts)?;
    info!("observed {} ballots", tree.n_observed());

    if let Some(n) = args.predictive {
        let sampled = Timed::run(|| tree.sample_predictive(n, &args.seed));
        debug!("sampled {n} ballots in {:.3}s", sampled.elapsed_secs());
        let mut tallies = FxHashMap::<Ballot, u64>::default();
        for ballot in sampled.value {
            *tallies.entry(ballot).or_default() += 1;
        }
        let samples: Vec<_> = tallies
            .into_iter()
            .map(|(ballot, count)| BallotCount::new(ballot, count))
            .collect();
        info!("\n{}", Console::default().render(&tabulate_ballots(&candidates, &samples)));
        return Ok(());
    }

    let n_ballots = args
        .ballots
        .ok_or_else(|| anyhow!("the total number of ballots is required"))?;
    let mut config = PosteriorConfig::new(args.elections, n_ballots, args.winners, 1);
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    config.n_batches = args
        .batches
        .or(args.threads)
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from));

    let timed = Timed::result(|| tree.sample_posterior(&config, &args.seed, &Interrupt::default()))?;
    info!("simulated {} elections in {:.3}s", config.n_elections, timed.elapsed_secs());
    info!("\n{}", Console::default().render(&tabulate_posterior(&candidates, &timed.value)));
    Ok(())
}

fn candidates_by_appearance(entries: &[BallotEntry]) -> Vec<String> {
    let mut candidates: Vec<String> = vec![];
    for name in entries.iter().flat_map(BallotEntry::names) {
        if !candidates.contains(name) {
            candidates.push(name.clone());
        }
    }
    candidates
}

fn resolve(entries: &[BallotEntry], candidates: &[String]) -> anyhow::Result<Vec<BallotCount>> {
    let indexes: FxHashMap<&str, usize> = candidates
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_str(), index))
        .collect();
    entries
        .iter()
        .map(|entry| {
            let preferences = entry
                .names()
                .iter()
                .map(|name| {
                    indexes
                        .get(name.as_str())
                        .copied()
                        .ok_or_else(|| anyhow!("unknown candidate '{name}'"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(BallotCount::new(Ballot::new(preferences), entry.count()))
        })
        .collect()
}
