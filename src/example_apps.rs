use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::{AcquisitionConfig, FirstRoundMode, QuotaPolicy};
use crate::constants::allocator::DEFAULT_CLUSTER_CAP;
use crate::engine::{AcquisitionEngine, RoundReport};
use crate::inference::SyntheticScoreProvider;
use crate::persistence::{PoolSnapshot, RoundLog};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Capped,
    Uniform,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FirstRoundArg {
    Shuffle,
    ClusterUniform,
}

impl From<FirstRoundArg> for FirstRoundMode {
    fn from(value: FirstRoundArg) -> Self {
        match value {
            FirstRoundArg::Shuffle => FirstRoundMode::Shuffle,
            FirstRoundArg::ClusterUniform => FirstRoundMode::ClusterUniform,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "simulate_rounds",
    disable_help_subcommand = true,
    about = "Simulate cluster-quota acquisition rounds",
    long_about = "Run acquisition rounds over a synthetic pool whose cluster codes and scores are derived deterministically from the seed.",
    after_help = "Use --config to start from a JSON configuration; explicit flags override its values."
)]
/// CLI for `simulate_rounds`.
///
/// Common usage:
/// - Default run: 10 rounds over 50,000 examples, budget 1,000
/// - Uniform quotas: `--policy uniform`
/// - Persist diagnostics: `--round-log /tmp/rounds.jsonl`
/// - Resume: `--snapshot /tmp/pool.json` (loaded when present, rewritten every round)
struct SimulateCli {
    #[arg(long = "config", value_name = "PATH", help = "Optional JSON configuration file")]
    config: Option<PathBuf>,
    #[arg(
        long = "pool-size",
        default_value_t = 50_000,
        value_parser = parse_positive_usize,
        help = "Number of examples in the synthetic pool"
    )]
    pool_size: usize,
    #[arg(long, value_parser = parse_positive_usize, help = "Examples labeled per incremental round")]
    budget: Option<usize>,
    #[arg(
        long = "initial-size",
        value_parser = parse_positive_usize,
        help = "Examples labeled in round zero"
    )]
    initial_size: Option<usize>,
    #[arg(
        long,
        default_value_t = 10,
        value_parser = parse_positive_usize,
        help = "Rounds to run (including round zero)"
    )]
    rounds: usize,
    #[arg(long, help = "Deterministic seed override")]
    seed: Option<u64>,
    #[arg(long, value_enum, help = "Quota policy for incremental rounds")]
    policy: Option<PolicyArg>,
    #[arg(
        long,
        value_parser = parse_positive_usize,
        help = "Top-ranked clusters considered by the capped policy"
    )]
    cap: Option<usize>,
    #[arg(long = "first-round", value_enum, help = "Round-zero strategy")]
    first_round: Option<FirstRoundArg>,
    #[arg(
        long,
        default_value_t = 512,
        value_parser = parse_positive_usize,
        help = "Distinct cluster codes emitted by the synthetic provider"
    )]
    clusters: usize,
    #[arg(long = "round-log", value_name = "PATH", help = "Append per-round diagnostics as JSON lines")]
    round_log: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Pool snapshot to resume from and rewrite")]
    snapshot: Option<PathBuf>,
    #[arg(short, long, help = "Log per-cluster statistics")]
    verbose: bool,
}

impl SimulateCli {
    fn resolve_config(&self) -> Result<AcquisitionConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => AcquisitionConfig::from_json_path(path)?,
            None => AcquisitionConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(budget) = self.budget {
            config.budget = budget;
        }
        if let Some(initial_size) = self.initial_size {
            config.initial_size = initial_size;
        }
        if let Some(first_round) = self.first_round {
            config.first_round = first_round.into();
        }
        match (self.policy, self.cap) {
            (Some(PolicyArg::Uniform), _) => {
                config.incremental_policy = QuotaPolicy::UniformAllClusters;
            }
            (Some(PolicyArg::Capped), cap) => {
                config.incremental_policy = QuotaPolicy::CappedTopK {
                    cap: cap.unwrap_or(DEFAULT_CLUSTER_CAP),
                };
            }
            (None, Some(cap)) => {
                config.incremental_policy = QuotaPolicy::CappedTopK { cap };
            }
            (None, None) => {}
        }
        Ok(config)
    }
}

/// Run the synthetic acquisition simulation with CLI-style arguments.
pub fn run_simulation<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<SimulateCli, _>(
        std::iter::once("simulate_rounds".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    init_tracing(cli.verbose)?;

    let config = cli.resolve_config()?;
    let snapshot = match &cli.snapshot {
        Some(path) if path.exists() => Some(PoolSnapshot::load(path)?),
        _ => None,
    };
    let mut engine = match &snapshot {
        Some(snapshot) => AcquisitionEngine::resume(config.clone(), snapshot)?,
        None => AcquisitionEngine::new(config.clone(), cli.pool_size)?,
    };
    if let Some(path) = &cli.round_log {
        engine = engine.with_round_log(RoundLog::new(path.clone()));
    }

    println!("=== cluster-quota acquisition ===");
    println!("pool size: {}", engine.partition().pool_size());
    println!("seed: {}", config.seed);
    println!(
        "budget: {} (initial {}), policy: {:?}, first round: {:?}",
        config.budget, config.initial_size, config.incremental_policy, config.first_round
    );
    println!();

    let mut provider = SyntheticScoreProvider::new(config.seed, cli.clusters);
    let start = engine.completed_rounds();
    for round in start..start + cli.rounds {
        let report = engine.sample(round, &mut provider)?;
        print_round(&report, engine.labeled_len(), engine.unlabeled_len());
        if let Some(path) = &cli.snapshot {
            engine.snapshot().save(path)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) -> Result<(), Box<dyn Error>> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn print_round(report: &RoundReport, labeled: usize, unlabeled: usize) {
    println!(
        "round {:>3}: selected {:>6} (quota {:>4}, from quota {:>6}, from remainder {:>6}) | labeled {:>7} | unlabeled {:>7}",
        report.round,
        report.selection.len(),
        report.quota,
        report.from_quota,
        report.from_remainder,
        labeled,
        unlabeled
    );
    if let Some(stats) = &report.stats
        && let Some(means) = stats.cluster_means
    {
        println!(
            "           clusters {:>5} | cluster means min {:.4} max {:.4} mean {:.4} std {:.4}",
            stats.cluster_count, means.min, means.max, means.mean, means.std
        );
    }
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
