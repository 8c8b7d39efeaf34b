//! Chained event source over the files of a record list.

use std::path::{Path, PathBuf};

use dcstat_core::Event;

use crate::jsonl::JsonLinesReader;
use crate::packed::{PackedEventReader, PackedEvents, SharedMmap};
use crate::{Error, Result};

/// Event file encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFileFormat {
    /// `.jsonl` / `.json`: one JSON event per line.
    JsonLines,
    /// `.dcev`: packed little-endian words.
    Packed,
}

impl EventFileFormat {
    /// Detects the format from the extension of `path` (case-insensitive).
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedEventFile`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jsonl" | "json") => Ok(Self::JsonLines),
            Some("dcev") => Ok(Self::Packed),
            _ => Err(Error::UnsupportedEventFile(path.to_path_buf())),
        }
    }

    /// Returns true if `path` carries a recognised event file extension.
    #[must_use]
    pub fn is_event_file(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

enum FileEvents {
    JsonLines(JsonLinesReader),
    Packed(PackedEvents<SharedMmap>),
}

impl FileEvents {
    fn open(path: &Path) -> Result<Self> {
        match EventFileFormat::from_path(path)? {
            EventFileFormat::JsonLines => Ok(Self::JsonLines(JsonLinesReader::open(path)?)),
            EventFileFormat::Packed => Ok(Self::Packed(PackedEventReader::open(path)?.into_events())),
        }
    }

    fn next_event(&mut self) -> Option<Result<Event>> {
        match self {
            Self::JsonLines(reader) => reader.next(),
            Self::Packed(events) => events.next(),
        }
    }
}

/// Streams the events of several files in order, one event at a time.
///
/// A file is opened only once the previous one is exhausted. Opening or
/// decoding errors are yielded once; the source is then finished.
pub struct EventFileSource {
    paths: std::vec::IntoIter<PathBuf>,
    current: Option<FileEvents>,
    files_opened: usize,
    failed: bool,
}

impl EventFileSource {
    /// Creates a source over `paths`; nothing is opened yet.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        Self {
            paths: paths.into_iter(),
            current: None,
            files_opened: 0,
            failed: false,
        }
    }

    /// Number of event files opened so far.
    #[must_use]
    pub fn files_opened(&self) -> usize {
        self.files_opened
    }
}

impl Iterator for EventFileSource {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next_event() {
                    Some(Ok(event)) => return Some(Ok(event)),
                    Some(Err(e)) => {
                        self.failed = true;
                        self.current = None;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }

            let path = self.paths.next()?;
            log::debug!("opening event file {}", path.display());
            match FileEvents::open(&path) {
                Ok(events) => {
                    self.files_opened += 1;
                    self.current = Some(events);
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packed::PackedEventWriter;
    use dcstat_core::{HitRecord, SegmentRecord};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            EventFileFormat::from_path(Path::new("a/run.jsonl")).unwrap(),
            EventFileFormat::JsonLines
        );
        assert_eq!(
            EventFileFormat::from_path(Path::new("run.JSON")).unwrap(),
            EventFileFormat::JsonLines
        );
        assert_eq!(
            EventFileFormat::from_path(Path::new("run.dcev")).unwrap(),
            EventFileFormat::Packed
        );
        assert!(matches!(
            EventFileFormat::from_path(Path::new("run.evio")),
            Err(Error::UnsupportedEventFile(_))
        ));
        assert!(!EventFileFormat::is_event_file(Path::new("notes")));
    }

    #[test]
    fn test_chains_files_in_order() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.jsonl");
        fs::write(
            &first,
            "{\"hits\":[{\"sector\":1,\"superlayer\":1,\"layer\":1,\"wire\":1}]}\n\
             {\"hits\":[{\"sector\":1,\"superlayer\":1,\"layer\":1,\"wire\":2}]}\n",
        )
        .unwrap();

        let second = dir.path().join("b.dcev");
        let mut writer = PackedEventWriter::create(&second).unwrap();
        writer
            .write_event(&Event {
                hits: vec![HitRecord::new(2, 2, 2, 3)],
                segments: vec![SegmentRecord::new(2, 2, 4.5)],
            })
            .unwrap();
        writer.flush().unwrap();

        let mut source = EventFileSource::new([first, second]);
        let events: Vec<Event> = source.by_ref().collect::<Result<_>>().unwrap();
        let wires: Vec<i32> = events.iter().flat_map(|e| &e.hits).map(|h| h.wire).collect();
        assert_eq!(wires, vec![1, 2, 3]);
        assert_eq!(events[2].segments.len(), 1);
        assert_eq!(source.files_opened(), 2);
    }

    #[test]
    fn test_missing_file_stops_source() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("a.jsonl");
        fs::write(&present, "{}\n").unwrap();

        let mut source = EventFileSource::new([
            present.clone(),
            dir.path().join("missing.jsonl"),
            present,
        ]);
        assert!(source.next().unwrap().is_ok());
        assert!(matches!(source.next(), Some(Err(Error::Io(_)))));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_unsupported_extension_is_reported_lazily() {
        let mut source = EventFileSource::new(["run.root"]);
        assert_eq!(source.files_opened(), 0);
        assert!(matches!(
            source.next(),
            Some(Err(Error::UnsupportedEventFile(_)))
        ));
    }

    #[test]
    fn test_empty_source() {
        let mut source = EventFileSource::new(Vec::<PathBuf>::new());
        assert!(source.next().is_none());
    }
}
