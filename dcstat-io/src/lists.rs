//! Record-list generation from a tree of event files.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::source::EventFileFormat;
use crate::{Error, Result};

/// A record list written by [`discover_record_lists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordList {
    pub path: PathBuf,
    pub entries: usize,
}

/// Writes one record list per directory of `base` that holds event files.
///
/// The list for `base/a/b` is `out_dir/a_b.<list_extension>`; the list for
/// `base` itself is `out_dir/root.<list_extension>`. Each list holds the
/// absolute paths of the directory's event files, sorted. Directories
/// without event files produce nothing. Symbolic links to directories are
/// not followed.
///
/// # Errors
/// Returns [`Error::InvalidInputFolder`] if `base` is not a directory, or
/// an I/O error if a directory cannot be read or a list cannot be written.
pub fn discover_record_lists(
    base: &Path,
    out_dir: &Path,
    list_extension: &str,
) -> Result<Vec<RecordList>> {
    if !base.is_dir() {
        return Err(Error::InvalidInputFolder(base.to_path_buf()));
    }
    let base = fs::canonicalize(base)?;
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::new();
    let mut pending = vec![base.clone()];
    while let Some(dir) = pending.pop() {
        let mut event_files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            // Symlinked directories are not descended into.
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if !path.is_dir() && EventFileFormat::is_event_file(&path) {
                event_files.push(path);
            }
        }
        if event_files.is_empty() {
            continue;
        }
        event_files.sort();

        let list_path = out_dir.join(format!("{}.{list_extension}", list_name(&base, &dir)));
        let mut writer = BufWriter::new(fs::File::create(&list_path)?);
        for path in &event_files {
            writeln!(writer, "{}", path.display())?;
        }
        writer.flush()?;

        log::info!(
            "saved {} event file paths to {}",
            event_files.len(),
            list_path.display()
        );
        written.push(RecordList {
            path: list_path,
            entries: event_files.len(),
        });
    }
    written.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(written)
}

fn list_name(base: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(base).unwrap_or(dir);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        "root".to_string()
    } else {
        parts.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::read_record_list;
    use tempfile::tempdir;

    #[test]
    fn test_list_name() {
        assert_eq!(list_name(Path::new("/data"), Path::new("/data")), "root");
        assert_eq!(
            list_name(Path::new("/data"), Path::new("/data/pass1/run5")),
            "pass1_run5"
        );
    }

    #[test]
    fn test_discover_writes_one_list_per_directory() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(data.path().join("b.jsonl"), "").unwrap();
        fs::write(data.path().join("a.dcev"), "").unwrap();
        fs::write(data.path().join("readme.txt"), "").unwrap();
        fs::create_dir_all(data.path().join("pass1/run5")).unwrap();
        fs::write(data.path().join("pass1/run5/c.jsonl"), "").unwrap();
        fs::create_dir_all(data.path().join("empty")).unwrap();

        let lists = discover_record_lists(data.path(), out.path(), "txt").unwrap();
        let names: Vec<String> = lists
            .iter()
            .map(|l| l.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["pass1_run5.txt", "root.txt"]);

        let root = read_record_list(&out.path().join("root.txt")).unwrap();
        let base = fs::canonicalize(data.path()).unwrap();
        assert_eq!(root, vec![base.join("a.dcev"), base.join("b.jsonl")]);
        assert!(root.iter().all(|p| p.is_absolute()));
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_does_not_follow_directory_symlinks() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(data.path().join("a.jsonl"), "").unwrap();
        fs::create_dir(data.path().join("sub")).unwrap();
        std::os::unix::fs::symlink(data.path(), data.path().join("sub/loop")).unwrap();
        std::os::unix::fs::symlink(
            data.path().join("a.jsonl"),
            data.path().join("sub/linked.jsonl"),
        )
        .unwrap();

        let lists = discover_record_lists(data.path(), out.path(), "txt").unwrap();
        let names: Vec<String> = lists
            .iter()
            .map(|l| l.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["root.txt", "sub.txt"]);

        let base = fs::canonicalize(data.path()).unwrap();
        let sub = read_record_list(&out.path().join("sub.txt")).unwrap();
        assert_eq!(sub, vec![base.join("sub/linked.jsonl")]);
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_discover_rejects_missing_base() {
        let out = tempdir().unwrap();
        let missing = out.path().join("nope");
        assert!(matches!(
            discover_record_lists(&missing, out.path(), "txt"),
            Err(Error::InvalidInputFolder(_))
        ));
    }
}
