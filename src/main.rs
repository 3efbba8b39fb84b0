use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use isoforest_io::{ExperimentName, MatrixReader, ResultWriter, load_options};
use isoforest_model::{DetectionType, IsolationForest, Options, rank_features};

#[derive(Parser)]
#[command(name = "isoforest")]
#[command(about = "Isolation Forest anomaly detection for numeric CSV data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility (overrides the options file; default 42)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Inputs and forest options shared by every subcommand.
///
/// Each option flag overrides the matching key of `--config`.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Path to the training CSV file (header row of feature names)
    #[arg(long)]
    train: PathBuf,

    /// Path to the CSV file to score (same columns as the training file)
    #[arg(long)]
    data: PathBuf,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// JSON options file; any key may be omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Decision policy: "threshold" or "proportion"
    #[arg(long)]
    detection_type: Option<String>,

    /// Score cutoff for the threshold policy (default 0.6)
    #[arg(long)]
    threshold: Option<f64>,

    /// Fraction of rows flagged by the proportion policy, in (0, 1)
    #[arg(long)]
    proportion: Option<f64>,

    /// Number of trees in the forest (default 100)
    #[arg(long)]
    num_trees: Option<usize>,

    /// Rows drawn with replacement for each tree (default 256)
    #[arg(long)]
    sample_size: Option<usize>,

    /// Maximum tree depth (default ceil(log2(sample_size)))
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Fit on the training file, then score and label every row of the data file
    Score {
        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Fit on the training file, then rank the features that isolate one data row
    Explain {
        #[command(flatten)]
        forest: ForestArgs,

        /// Zero-based index of the data row to explain
        #[arg(long)]
        row: usize,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ScoreOutput {
    experiment: String,
    n_rows: usize,
    n_anomalies: usize,
    anomaly_rows: Vec<usize>,
    threshold: Option<f64>,
    options: Options,
}

#[derive(Serialize)]
struct ExplainOutput {
    experiment: String,
    row: usize,
    score: f64,
    features: Vec<FeatureOutput>,
}

#[derive(Serialize)]
struct FeatureOutput {
    name: String,
    count: usize,
    share: f64,
    rank: usize,
}

fn parse_detection_type(s: &str) -> Result<DetectionType> {
    DetectionType::from_str(s)
        .with_context(|| format!("unknown detection type: {s} (expected threshold or proportion)"))
}

/// Layer the options file, the CLI overrides and the seed, in that order.
fn build_options(args: &ForestArgs, seed: Option<u64>) -> Result<Options> {
    let mut options = match &args.config {
        Some(path) => load_options(path).context("failed to load options file")?,
        None => Options::new(),
    };
    if let Some(s) = &args.detection_type {
        options = options.with_detection_type(parse_detection_type(s)?);
    }
    if let Some(threshold) = args.threshold {
        options = options.with_threshold(threshold);
    }
    if let Some(proportion) = args.proportion {
        options = options.with_proportion(proportion);
    }
    if let Some(num_trees) = args.num_trees {
        options = options.with_num_trees(num_trees);
    }
    if let Some(sample_size) = args.sample_size {
        options = options.with_sample_size(sample_size);
    }
    if let Some(max_depth) = args.max_depth {
        options = options.with_max_depth(max_depth);
    }
    if let Some(seed) = seed {
        options = options.with_seed(seed);
    }
    Ok(options.defaulted())
}

fn fit_forest(train: &Path, options: Options) -> Result<IsolationForest> {
    let dataset = MatrixReader::new(train)
        .read()
        .context("failed to read training CSV")?;
    let mut forest = IsolationForest::with_options(options);
    forest
        .fit(&dataset.rows)
        .context("isolation forest training failed")?;
    info!(
        n_trees = forest.n_trees(),
        n_features = forest.n_features(),
        "forest trained"
    );
    Ok(forest)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Score { forest: args } => {
            let experiment_name = ExperimentName::new(args.experiment.clone())?;
            let options = build_options(&args, cli.seed)?;
            let forest = fit_forest(&args.train, options)?;

            let dataset = MatrixReader::new(&args.data)
                .read()
                .context("failed to read data CSV")?;
            let detection = forest.detect(&dataset.rows).context("scoring failed")?;
            info!(
                n_rows = detection.len(),
                n_anomalies = detection.n_anomalies(),
                "detection complete"
            );

            // Write JSON artifact
            let writer = ResultWriter::new(&args.output_dir, experiment_name)?;
            writer.write_detection(&dataset, &detection)?;

            let output = ScoreOutput {
                experiment: args.experiment,
                n_rows: detection.len(),
                n_anomalies: detection.n_anomalies(),
                anomaly_rows: detection.anomaly_indices(),
                threshold: detection.threshold,
                options: forest.options().clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Explain { forest: args, row } => {
            let experiment_name = ExperimentName::new(args.experiment.clone())?;
            let options = build_options(&args, cli.seed)?;
            let forest = fit_forest(&args.train, options)?;

            let dataset = MatrixReader::new(&args.data)
                .read()
                .context("failed to read data CSV")?;
            let Some(sample) = dataset.rows.get(row) else {
                anyhow::bail!(
                    "row {row} out of range: data file has {} rows",
                    dataset.n_rows()
                );
            };

            let score = forest.score_sample(sample).context("scoring failed")?;
            let counts = forest
                .feature_importance(sample)
                .context("feature importance failed")?;
            let ranked = rank_features(&counts, &dataset.feature_names);

            // Write JSON artifact
            let writer = ResultWriter::new(&args.output_dir, experiment_name)?;
            writer.write_importance(row, &ranked)?;

            let output = ExplainOutput {
                experiment: args.experiment,
                row,
                score,
                features: ranked
                    .into_iter()
                    .map(|f| FeatureOutput {
                        name: f.name,
                        count: f.count,
                        share: f.share,
                        rank: f.rank,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
