//!
//! Command-line front end: batch runs, record-list generation and
//! container inspection.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand, ValueEnum};

use dcstat_io::{
    discover_record_lists, process_all, read_container, ContainerFormat, RunOptions,
};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    DcstatIo(#[from] dcstat_io::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{failed} of {runs} runs failed")]
    FailedRuns { failed: usize, runs: usize },
}

/// Output container format.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Single JSON document
    Json,
    /// HDF5 file (requires the `hdf5` feature)
    Hdf5,
}

impl From<Format> for ContainerFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ContainerFormat::Json,
            Format::Hdf5 => ContainerFormat::Hdf5,
        }
    }
}

/// Drift-chamber wire occupancy histogramming.
#[derive(Parser)]
#[command(name = "dcstat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate every record list in a folder into one container per run
    Run {
        /// Folder holding the record lists
        input: PathBuf,

        /// Folder receiving the containers
        output: PathBuf,

        /// Output container format
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// JSON options file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Record-list file extension
        #[arg(long)]
        list_extension: Option<String>,

        /// Process runs in parallel
        #[arg(short, long)]
        parallel: bool,

        /// Worker threads for parallel runs (default: all cores)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Write one record list per directory of event files
    Lists {
        /// Root of the event file tree
        base: PathBuf,

        /// Folder receiving the record lists
        #[arg(short, long, default_value = "run_paths")]
        output: PathBuf,

        /// Record-list file extension
        #[arg(long, default_value = "txt")]
        list_extension: String,
    },

    /// Summarize a written container
    Inspect {
        /// Container file (.json or .h5)
        input: PathBuf,

        /// Include counters with no entries
        #[arg(short, long)]
        all: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            output,
            format,
            config,
            list_extension,
            parallel,
            jobs,
        } => {
            let mut options = match config {
                Some(path) => RunOptions::from_file(path)?,
                None => RunOptions::default(),
            };
            if let Some(format) = format {
                options.format = format.into();
            }
            if let Some(ext) = list_extension {
                options.list_extension = ext;
            }
            options.parallel |= parallel || jobs.is_some();

            if let Some(threads) = jobs {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()?;
            }

            let start = Instant::now();
            let report = match process_all(&input, &output, &options) {
                Ok(report) => report,
                Err(e) => {
                    log::error!("{e}");
                    return Err(e.into());
                }
            };
            let totals = report.totals();

            println!(
                "Runs: {} ok, {} failed ({:.2}s)",
                report.succeeded.len(),
                report.failed.len(),
                start.elapsed().as_secs_f64()
            );
            println!(
                "Events: {}  Hits: {}  Segments: {}  Rejected: {}",
                totals.events,
                totals.hits,
                totals.segments,
                totals.rejected()
            );
            for run in &report.succeeded {
                println!("  {} -> {}", run.list_file.display(), run.output.display());
            }
            for failure in &report.failed {
                println!("  {} FAILED: {}", failure.list_file.display(), failure.error);
            }

            if !report.is_success() {
                return Err(CliError::FailedRuns {
                    failed: report.failed.len(),
                    runs: report.runs(),
                });
            }
        }

        Commands::Lists {
            base,
            output,
            list_extension,
        } => {
            let lists = discover_record_lists(&base, &output, &list_extension)?;
            for list in &lists {
                println!("{} ({} files)", list.path.display(), list.entries);
            }
            println!("{} record lists written to {}", lists.len(), output.display());
        }

        Commands::Inspect { input, all, json } => {
            let format = ContainerFormat::from_path(&input)?;
            let data = read_container(&input, format)?;
            let counters = data.counters.iter().filter(|c| all || c.entries > 0);

            if json {
                let summary: Vec<serde_json::Value> = counters
                    .map(|c| {
                        serde_json::json!({
                            "name": c.name,
                            "shape": c.shape,
                            "entries": c.entries,
                            "integral": c.integral(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("File: {}", input.display());
            println!("Format: {} (layout {})", format, data.format_version);
            println!("Group: {} ({} counters)", data.group, data.len());
            println!("Total entries: {}", data.total_entries());
            println!("{:<32} | {:>8} | {:>12} | {:>12}", "Counter", "Shape", "Entries", "Integral");
            println!("{:-<73}", "");
            for counter in counters {
                let shape = counter
                    .shape
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("x");
                println!(
                    "{:<32} | {:>8} | {:>12} | {:>12}",
                    counter.name,
                    shape,
                    counter.entries,
                    counter.integral()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "dcstat", "run", "lists", "out", "--format", "json", "--jobs", "4", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Run {
            input,
            format,
            jobs,
            parallel,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(input, PathBuf::from("lists"));
        assert_eq!(
            ContainerFormat::from(format.unwrap()),
            ContainerFormat::Json
        );
        assert_eq!(jobs, Some(4));
        assert!(!parallel);
    }

    #[test]
    fn test_run_requires_both_folders() {
        assert!(Cli::try_parse_from(["dcstat", "run", "lists"]).is_err());
    }
}
