//! JSON-lines event files: one event object per line.
//!
//! ```text
//! {"hits":[{"sector":1,"superlayer":1,"layer":1,"wire":10}],"segments":[{"sector":1,"superlayer":1,"avg_wire":12.3}]}
//! ```
//!
//! Missing `hits`/`segments` arrays are empty; blank lines are skipped.

use crate::{Error, Result};
use dcstat_core::Event;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// Line-by-line event reader.
pub struct JsonLinesReader<R = BufReader<File>> {
    lines: Lines<R>,
    line_number: usize,
    path: PathBuf,
    failed: bool,
}

impl JsonLinesReader {
    /// Opens a JSON-lines event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.as_ref().to_path_buf(),
        ))
    }
}

impl<R: BufRead> JsonLinesReader<R> {
    /// Wraps any buffered reader; `path` is only used in error messages.
    pub fn from_reader(reader: R, path: PathBuf) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            path,
            failed: false,
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(Error::Io(e)));
                }
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str::<Event>(&line).map_err(|e| {
                Error::InvalidFormat(format!(
                    "line {} of {}: {e}",
                    self.line_number,
                    self.path.display()
                ))
            });
            self.failed = event.is_err();
            return Some(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcstat_core::{HitRecord, SegmentRecord};
    use std::io::Cursor;

    fn reader(text: &str) -> JsonLinesReader<Cursor<Vec<u8>>> {
        JsonLinesReader::from_reader(
            Cursor::new(text.as_bytes().to_vec()),
            PathBuf::from("test.jsonl"),
        )
    }

    #[test]
    fn test_jsonl_events() {
        let text = r#"{"hits":[{"sector":1,"superlayer":1,"layer":1,"wire":10}],"segments":[{"sector":1,"superlayer":1,"avg_wire":12.3}]}

{"hits":[{"sector":2,"superlayer":3,"layer":4,"wire":5}]}
{}
"#;
        let events: Vec<Event> = reader(text).collect::<Result<_>>().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].hits, vec![HitRecord::new(1, 1, 1, 10)]);
        assert_eq!(events[0].segments, vec![SegmentRecord::new(1, 1, 12.3)]);
        assert!(events[1].segments.is_empty());
        assert!(events[2].is_empty());
    }

    #[test]
    fn test_jsonl_accepts_camel_case_avg_wire() {
        let text = r#"{"segments":[{"sector":4,"superlayer":2,"avgWire":77.5}]}"#;
        let events: Vec<Event> = reader(text).collect::<Result<_>>().unwrap();
        assert_eq!(events[0].segments[0].avg_wire, 77.5);
    }

    #[test]
    fn test_jsonl_malformed_line_reports_position() {
        let text = "{}\n{\"hits\": [oops]}\n{}\n";
        let mut events = reader(text);
        assert!(events.next().unwrap().is_ok());
        let err = events.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
        assert!(events.next().is_none());
    }
}
