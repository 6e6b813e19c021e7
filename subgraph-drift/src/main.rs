//! Subgraph-Drift - Main Entry Point
//!
//! Runs drift detection experiments over graph stream datasets.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use subgraph_drift::engine::OracleMode;
use subgraph_drift::logging::init_logging;
use subgraph_drift::{run_experiment, Config, Dataset, DatasetFormat};

use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "subgraph-drift", version, about = "Concept drift detection on graph streams")]
struct Cli {
    /// Directory for a daily rolling log file
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run repeated detection over a dataset and write a JSON report
    Run(RunArgs),
    /// Load a dataset and print its summary
    Inspect(DatasetArgs),
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Dataset file
    #[arg(long)]
    dataset: PathBuf,

    /// File layout; guessed from the extension when omitted
    #[arg(long, value_enum)]
    format: Option<DatasetFormat>,

    /// Known drift positions, overriding those stored in the dataset
    #[arg(long, value_delimiter = ',')]
    drift_points: Vec<usize>,
}

impl DatasetArgs {
    fn load(&self) -> Result<Dataset, BoxError> {
        let format = self
            .format
            .unwrap_or_else(|| DatasetFormat::from_path(&self.dataset));
        Ok(Dataset::load(&self.dataset, format, self.drift_points.clone())?)
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    dataset: DatasetArgs,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of independent runs
    #[arg(long)]
    iterations: Option<usize>,

    /// Base permutation seed
    #[arg(long)]
    seed: Option<u64>,

    /// Keep the dataset's item order
    #[arg(long)]
    no_shuffle: bool,

    /// Report every threshold crossing as drift
    #[arg(long)]
    unsupervised: bool,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    /// File configuration with command-line overrides applied
    fn config(&self, log_dir: Option<PathBuf>) -> Result<Config, BoxError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if log_dir.is_some() {
            config.log_dir = log_dir;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.no_shuffle {
            config.shuffle = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(args: &RunArgs, config: &Config) -> Result<(), BoxError> {
    let dataset = args.dataset.load()?;
    let mode = if args.unsupervised {
        OracleMode::Unsupervised
    } else {
        OracleMode::GroundTruth
    };

    let report = run_experiment(&dataset, config, mode)?;
    info!(
        "Experiment finished: FA/1000 {:.3} (std {:.3}), detection rate {:.3} (std {:.3}), delay {:.2} (std {:.2})",
        report.summary.false_alarms_per_1000.mean,
        report.summary.false_alarms_per_1000.std_dev,
        report.summary.detection_rate.mean,
        report.summary.detection_rate.std_dev,
        report.summary.detection_delay.mean,
        report.summary.detection_delay.std_dev
    );

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            write_report(path, &json)?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn write_report(path: &Path, json: &str) -> Result<(), BoxError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    Ok(())
}

fn inspect(args: &DatasetArgs) -> Result<(), BoxError> {
    let dataset = args.load()?;
    let stats = dataset.stats();
    info!(
        "Dataset {}: {} items, {} subgraph entries, {} subgraph instances, drift points {:?}",
        dataset.name(),
        stats.items,
        stats.subgraph_entries,
        stats.subgraph_instances,
        stats.drift_points
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn run_main(cli: Cli) -> Result<(), BoxError> {
    match &cli.command {
        Command::Run(args) => {
            // Load configuration
            let config = args.config(cli.log_dir.clone())?;
            let _guard = init_logging(config.log_dir.as_deref());
            info!("Subgraph-Drift starting...");
            run(args, &config)
        }
        Command::Inspect(args) => {
            let _guard = init_logging(cli.log_dir.as_deref());
            inspect(args)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run_main(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
