use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Builder;
use log::LevelFilter;
use serde::Serialize;

use pcd_filter::{CancellationToken, CleaningAlgorithm, FilterConfig, StoppingPolicy};
use pcd_store::LasStore;

mod analyze;
mod batch;
mod discover;
mod error;

use batch::{run_batch, BatchJob, FileStatus};
use error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "LiDAR Cleaner",
    about = "A tool for removing elevation outliers from LAS/LAZ point clouds",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
struct Cli {
    /// Log per-stage details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise point counts and extents of every input file
    Analyze(AnalyzeArgs),
    /// Filter outliers and downsample every input file
    Clean(CleanArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(short, long, required = true, value_name = "DIR")]
    input: PathBuf,

    /// Write the summary as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CleanArgs {
    #[arg(short, long, required = true, value_name = "DIR")]
    input: PathBuf,

    #[arg(short, long, required = true, value_name = "DIR")]
    output: PathBuf,

    /// Point budget per output file
    #[arg(long, default_value_t = 5_000_000)]
    points: usize,

    /// Grid nodes per axis of the local surface
    #[arg(long, default_value_t = 100)]
    grid: usize,

    /// Nearest points averaged per grid node
    #[arg(long, default_value_t = 10)]
    neighbors: usize,

    #[arg(long, default_value_t = 2.0)]
    residual_sigma: f64,

    #[arg(long, default_value_t = 3.0)]
    global_sigma: f64,

    #[arg(long, value_enum, default_value_t = Algorithm::SigmaClipping)]
    algorithm: Algorithm,

    /// Upper bound on sigma clipping passes
    #[arg(long, conflicts_with = "removed_ratio")]
    max_iterations: Option<usize>,

    /// Stop sigma clipping once a pass removes less than this fraction
    #[arg(long)]
    removed_ratio: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Only filter against the local surface, without global sigma
    /// clipping or downsampling
    #[arg(long)]
    local_only: bool,

    /// Files cleaned in parallel [default: number of CPUs]
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Write per-file results as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Algorithm {
    SigmaClipping,
    StatisticalOutlierRemoval,
    RadiusOutlierRemoval,
}

impl From<Algorithm> for CleaningAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::SigmaClipping => CleaningAlgorithm::SigmaClipping,
            Algorithm::StatisticalOutlierRemoval => CleaningAlgorithm::StatisticalOutlierRemoval,
            Algorithm::RadiusOutlierRemoval => CleaningAlgorithm::RadiusOutlierRemoval,
        }
    }
}

impl CleanArgs {
    fn filter_config(&self) -> FilterConfig {
        let stopping = match (self.max_iterations, self.removed_ratio) {
            (_, Some(ratio)) => StoppingPolicy::RemovedFractionBelow {
                ratio,
                max_iterations: StoppingPolicy::DEFAULT_MAX_ITERATIONS,
            },
            (Some(n), None) => StoppingPolicy::MaxIterations(n),
            (None, None) => StoppingPolicy::default(),
        };

        FilterConfig {
            grid_resolution: self.grid,
            neighbors: self.neighbors,
            residual_sigma: self.residual_sigma,
            global_sigma: self.global_sigma,
            target_points: self.points,
            algorithm: self.algorithm.into(),
            stopping,
            seed: self.seed,
            local_only: self.local_only,
        }
    }
}

fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("report written to {:?}", path);
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    log::info!("input: {:?}", args.input);

    let files = discover::find_point_cloud_files(&args.input)?;
    log::info!("found {} files", files.len());

    let report = analyze::analyze(&LasStore::new(), &files);
    analyze::log_table(&report, &args.input);

    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }
    Ok(())
}

fn run_clean(args: CleanArgs) -> Result<(), CliError> {
    let config = args.filter_config();
    config.validate()?;
    let jobs = args.jobs.unwrap_or_else(num_cpus::get).max(1);

    log::info!("input: {:?}", args.input);
    log::info!("output: {:?}", args.output);
    log::info!("config: {:?}", config);
    log::info!("jobs: {}", jobs);

    let files = discover::find_point_cloud_files(&args.input)?;
    log::info!("found {} files", files.len());
    fs::create_dir_all(&args.output).map_err(|source| CliError::Io {
        path: args.output.clone(),
        source,
    })?;

    let job = BatchJob {
        input_root: &args.input,
        output_root: &args.output,
        files: &files,
        config: &config,
        jobs,
    };
    let report = run_batch(&LasStore::new(), &job, &CancellationToken::new())?;

    for file in &report.files {
        if let FileStatus::Cleaned {
            input_points,
            output_points,
            ..
        } = file.status
        {
            log::info!(
                "{:?}: removed {} points",
                file.input,
                input_points - output_points
            );
        }
    }
    log::info!(
        "{} of {} files failed",
        report.failed(),
        report.files.len()
    );

    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }
    log::info!("Elapsed: {:?}", report.elapsed);
    Ok(())
}

fn main() {
    let args = Cli::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();

    let result = match args.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Clean(args) => run_clean(args),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
    log::info!("Finish processing");
}
