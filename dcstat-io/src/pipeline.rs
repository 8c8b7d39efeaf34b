//! Run driver: one record list in, one container out.
//!
//! A record list is a text file naming one event file per line. Each list
//! is aggregated into a fresh [`CounterRegistry`] and written to
//! `<output_folder>/<base_name>.<ext>`.

use std::fs;
use std::path::{Path, PathBuf};

use dcstat_core::{aggregate, AggregateStats, CounterRegistry};
use rayon::prelude::*;

use crate::container::write_container;
use crate::options::RunOptions;
use crate::source::EventFileSource;
use crate::{Error, Result};

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub list_file: PathBuf,
    pub output: PathBuf,
    /// Event files named by the list.
    pub files: usize,
    pub stats: AggregateStats,
}

/// A run that did not produce a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub list_file: PathBuf,
    pub error: String,
}

/// Outcome of a batch, in list-file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<RunReport>,
    pub failed: Vec<RunFailure>,
}

impl BatchReport {
    /// Returns true if every run produced its container.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of runs attempted.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Tallies summed over successful runs.
    #[must_use]
    pub fn totals(&self) -> AggregateStats {
        let mut totals = AggregateStats::default();
        for report in &self.succeeded {
            totals.merge(&report.stats);
        }
        totals
    }
}

/// Reads the event file paths named by a record list.
///
/// Lines are trimmed and blank lines skipped. Relative paths are resolved
/// against the directory holding the list.
///
/// # Errors
/// Returns an error if the list cannot be read.
pub fn read_record_list(list_file: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(list_file)?;
    let base = list_file.parent().unwrap_or_else(|| Path::new(""));
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let path = Path::new(line);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        })
        .collect())
}

/// Base name of the container for a run, without extension.
///
/// Taken from the first event file: its file name cut at the first
/// `marker` if present, otherwise its stem. Falls back to the stem of the
/// list file when the list is empty or the derived name is empty.
#[must_use]
pub fn output_base_name(list_file: &Path, event_files: &[PathBuf], marker: &str) -> String {
    let from_first = event_files.first().and_then(|first| {
        let name = first.file_name()?.to_string_lossy();
        let base = match name.find(marker) {
            Some(index) if !marker.is_empty() => name[..index].to_string(),
            _ => first.file_stem()?.to_string_lossy().into_owned(),
        };
        (!base.is_empty()).then_some(base)
    });
    from_first.unwrap_or_else(|| {
        list_file
            .file_stem()
            .map_or_else(|| "run".to_string(), |s| s.to_string_lossy().into_owned())
    })
}

/// Aggregates one record list into `output_folder`.
///
/// # Errors
/// Returns an error if the list cannot be read, an event file cannot be
/// opened or decoded, or the container cannot be written. No container is
/// left behind in that case.
pub fn process_run(
    list_file: &Path,
    output_folder: &Path,
    options: &RunOptions,
) -> Result<RunReport> {
    let event_files = read_record_list(list_file)?;
    let base_name = output_base_name(list_file, &event_files, &options.source_marker);
    let output = output_folder.join(format!("{base_name}.{}", options.format.extension()));
    fs::create_dir_all(output_folder)?;

    log::info!(
        "processing {} ({} event files) -> {}",
        list_file.display(),
        event_files.len(),
        output.display()
    );

    let files = event_files.len();
    let mut registry = CounterRegistry::allocate();
    let stats = aggregate(EventFileSource::new(event_files), &mut registry)?;
    if stats.rejected() > 0 {
        log::warn!(
            "{}: {} hits and {} segments outside the detector geometry",
            list_file.display(),
            stats.rejected_hits,
            stats.rejected_segments
        );
    }

    write_container(&registry, &output, options.format)?;
    log::info!(
        "wrote {} ({} events, {} hits, {} segments)",
        output.display(),
        stats.events,
        stats.hits,
        stats.segments
    );

    Ok(RunReport {
        list_file: list_file.to_path_buf(),
        output,
        files,
        stats,
    })
}

/// Record lists in `input_folder`, sorted by path. Not recursive.
///
/// # Errors
/// Returns [`Error::InvalidInputFolder`] if `input_folder` is not a
/// readable directory.
pub fn find_record_lists(input_folder: &Path, options: &RunOptions) -> Result<Vec<PathBuf>> {
    if !input_folder.is_dir() {
        return Err(Error::InvalidInputFolder(input_folder.to_path_buf()));
    }
    let entries = fs::read_dir(input_folder)
        .map_err(|_| Error::InvalidInputFolder(input_folder.to_path_buf()))?;

    let mut lists = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && options.is_record_list(&path) {
            lists.push(path);
        }
    }
    lists.sort();
    Ok(lists)
}

/// Processes every record list in `input_folder`.
///
/// Runs are independent: a failed run is logged and recorded in the
/// report, and the remaining runs still execute.
///
/// # Errors
/// Returns [`Error::InvalidInputFolder`] before any run is attempted if
/// `input_folder` is not a readable directory.
pub fn process_all(
    input_folder: &Path,
    output_folder: &Path,
    options: &RunOptions,
) -> Result<BatchReport> {
    let lists = find_record_lists(input_folder, options)?;
    if lists.is_empty() {
        log::warn!(
            "no *.{} record lists in {}",
            options.list_extension,
            input_folder.display()
        );
    }

    let run = |list_file: &PathBuf| {
        process_run(list_file, output_folder, options).map_err(|e| {
            log::error!("run {} failed: {e}", list_file.display());
            RunFailure {
                list_file: list_file.clone(),
                error: e.to_string(),
            }
        })
    };
    let outcomes: Vec<std::result::Result<RunReport, RunFailure>> = if options.parallel {
        lists.par_iter().map(run).collect()
    } else {
        lists.iter().map(run).collect()
    };

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(run) => report.succeeded.push(run),
            Err(failure) => report.failed.push(failure),
        }
    }
    log::info!(
        "{} of {} runs written to {}",
        report.succeeded.len(),
        report.runs(),
        output_folder.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_base_name_cut_at_marker() {
        let name = output_base_name(
            Path::new("lists/root.txt"),
            &paths(&["/data/clas_005038.evio.00040.jsonl", "/data/other.jsonl"]),
            ".evio",
        );
        assert_eq!(name, "clas_005038");
    }

    #[test]
    fn test_base_name_without_marker_strips_extension() {
        let name = output_base_name(
            Path::new("lists/root.txt"),
            &paths(&["/data/run_42.dcev"]),
            ".evio",
        );
        assert_eq!(name, "run_42");
    }

    #[test]
    fn test_base_name_of_empty_list() {
        let name = output_base_name(Path::new("lists/pass1_runs.txt"), &[], ".evio");
        assert_eq!(name, "pass1_runs");
    }

    #[test]
    fn test_base_name_marker_at_start_falls_back() {
        let name = output_base_name(
            Path::new("lists/a.txt"),
            &paths(&["/data/.evio.1.jsonl"]),
            ".evio",
        );
        assert_eq!(name, "a");
    }

    #[test]
    fn test_read_record_list() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("runs.txt");
        fs::write(&list, "/abs/a.jsonl\n\n  rel/b.dcev  \n").unwrap();

        let files = read_record_list(&list).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("/abs/a.jsonl"), dir.path().join("rel/b.dcev")]
        );
    }

    #[test]
    fn test_find_record_lists_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let lists = find_record_lists(dir.path(), &RunOptions::default()).unwrap();
        assert_eq!(
            lists,
            vec![dir.path().join("a.txt"), dir.path().join("b.txt")]
        );
    }

    #[test]
    fn test_batch_report_totals() {
        let stats = AggregateStats {
            events: 2,
            hits: 3,
            ..AggregateStats::default()
        };
        let report = BatchReport {
            succeeded: vec![
                RunReport {
                    list_file: PathBuf::from("a.txt"),
                    output: PathBuf::from("a.json"),
                    files: 1,
                    stats,
                };
                2
            ],
            failed: vec![RunFailure {
                list_file: PathBuf::from("b.txt"),
                error: "missing".to_string(),
            }],
        };
        assert_eq!(report.runs(), 3);
        assert!(!report.is_success());
        assert_eq!(report.totals().hits, 6);
    }
}
