//! Batch run options.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::container::ContainerFormat;
use crate::Result;

/// Options shared by every run of a batch.
///
/// Loaded from a partial JSON document; absent keys keep their defaults:
///
/// ```json
/// { "format": "json", "parallel": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Extension of record-list files in the input folder.
    pub list_extension: String,
    /// Output container format.
    pub format: ContainerFormat,
    /// Marker at which an input file name is cut to form the output base name.
    pub source_marker: String,
    /// Process runs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            list_extension: "txt".to_string(),
            format: ContainerFormat::default(),
            source_marker: ".evio".to_string(),
            parallel: false,
        }
    }
}

impl RunOptions {
    /// Loads options from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Loads options from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid options document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns true if `path` looks like a record list for these options.
    #[must_use]
    pub fn is_record_list(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.list_extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let options = RunOptions::default();
        assert_eq!(options.list_extension, "txt");
        assert_eq!(options.source_marker, ".evio");
        assert!(!options.parallel);
        assert_eq!(options.format, ContainerFormat::default());
    }

    #[test]
    fn test_partial_json() {
        let options = RunOptions::from_json(r#"{"format": "json", "parallel": true}"#).unwrap();
        assert_eq!(options.format, ContainerFormat::Json);
        assert!(options.parallel);
        assert_eq!(options.list_extension, "txt");
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"list_extension": "lst", "format": "h5"}}"#).unwrap();
        file.flush().unwrap();

        let options = RunOptions::from_file(file.path()).unwrap();
        assert_eq!(options.list_extension, "lst");
        assert_eq!(options.format, ContainerFormat::Hdf5);
        assert!(options.is_record_list(Path::new("runs/a.LST")));
        assert!(!options.is_record_list(Path::new("runs/a.txt")));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(RunOptions::from_json(r#"{"format": "root"}"#).is_err());
    }
}
