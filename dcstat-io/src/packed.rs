//! Packed binary event files (`.dcev`).
//!
//! Little-endian 8-byte words:
//!
//! | word | layout |
//! |---|---|
//! | file header | `b"DCEV"`, `u16` version, `u16` reserved |
//! | event header | `u32` hit count, `u32` segment count |
//! | hit | `u8` sector, `u8` superlayer, `u8` layer, `u8` reserved, `i32` wire |
//! | segment | `u8` sector, `u8` superlayer, `u16` reserved, `f32` average wire |
//!
//! Each event header is followed by its hit words, then its segment words.

use crate::{Error, Result};
use dcstat_core::{Event, HitRecord, SegmentRecord};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File magic.
pub const MAGIC: [u8; 4] = *b"DCEV";
/// Current format version.
pub const VERSION: u16 = 1;
/// Size of every word in bytes.
pub const WORD_SIZE: usize = 8;

/// A memory-mapped packed event file.
///
/// The file is mapped once; events are decoded lazily by [`PackedEventReader::events`].
pub struct PackedEventReader {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl PackedEventReader {
    /// Opens and validates a packed event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped, its size is not a
    /// multiple of 8, or the header is missing or unknown.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        let reader = Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        };
        reader.validate_header()?;
        Ok(reader)
    }

    fn validate_header(&self) -> Result<()> {
        if !self.mmap.len().is_multiple_of(WORD_SIZE) {
            return Err(Error::InvalidFormat(format!(
                "file size {} is not a multiple of 8 (file: {})",
                self.mmap.len(),
                self.path.display()
            )));
        }
        let header = self.mmap.get(..WORD_SIZE).ok_or_else(|| {
            Error::InvalidFormat(format!("missing header (file: {})", self.path.display()))
        })?;
        if header[..4] != MAGIC {
            return Err(Error::InvalidFormat(format!(
                "bad magic (file: {})",
                self.path.display()
            )));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(Error::InvalidFormat(format!(
                "unsupported version {version} (file: {})",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Path of the mapped file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }

    /// Iterator decoding one event at a time, borrowing the mapping.
    #[must_use]
    pub fn events(&self) -> PackedEvents<&[u8]> {
        PackedEvents::new(&self.mmap[..], self.path.clone())
    }

    /// Iterator decoding one event at a time that owns the mapping.
    #[must_use]
    pub fn into_events(self) -> PackedEvents<SharedMmap> {
        PackedEvents::new(SharedMmap(self.mmap), self.path)
    }
}

/// Shared handle to a mapped file.
#[derive(Clone)]
pub struct SharedMmap(Arc<Mmap>);

impl AsRef<[u8]> for SharedMmap {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

/// Iterator over the events of a packed file held in `D`.
pub struct PackedEvents<D> {
    data: D,
    offset: usize,
    path: PathBuf,
    failed: bool,
}

impl<D: AsRef<[u8]>> PackedEvents<D> {
    fn new(data: D, path: PathBuf) -> Self {
        Self {
            data,
            offset: WORD_SIZE,
            path,
            failed: false,
        }
    }

    fn word(&mut self) -> Option<[u8; WORD_SIZE]> {
        let bytes = self
            .data
            .as_ref()
            .get(self.offset..self.offset + WORD_SIZE)?;
        let word = bytes.try_into().ok()?;
        self.offset += WORD_SIZE;
        Some(word)
    }

    fn decode_event(&mut self) -> Result<Event> {
        let header = self.word().ok_or_else(|| self.truncated("event header"))?;
        let n_hits = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let n_segments = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let remaining = (self.data.as_ref().len() - self.offset) / WORD_SIZE;
        if n_hits.saturating_add(n_segments) > remaining {
            return Err(self.truncated("event body"));
        }

        let mut event = Event::with_capacity(n_hits, n_segments);
        for _ in 0..n_hits {
            let w = self.word().ok_or_else(|| self.truncated("hit"))?;
            event.hits.push(HitRecord::new(
                i32::from(w[0]),
                i32::from(w[1]),
                i32::from(w[2]),
                i32::from_le_bytes([w[4], w[5], w[6], w[7]]),
            ));
        }
        for _ in 0..n_segments {
            let w = self.word().ok_or_else(|| self.truncated("segment"))?;
            event.segments.push(SegmentRecord::new(
                i32::from(w[0]),
                i32::from(w[1]),
                f32::from_le_bytes([w[4], w[5], w[6], w[7]]),
            ));
        }
        Ok(event)
    }

    fn truncated(&self, what: &str) -> Error {
        Error::InvalidFormat(format!(
            "truncated {what} at byte {} (file: {})",
            self.offset,
            self.path.display()
        ))
    }
}

impl<D: AsRef<[u8]>> Iterator for PackedEvents<D> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.as_ref().len() {
            return None;
        }
        let event = self.decode_event();
        self.failed = event.is_err();
        Some(event)
    }
}

/// Writer for packed event files.
pub struct PackedEventWriter {
    writer: BufWriter<File>,
}

impl PackedEventWriter {
    /// Creates the file and writes its header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u16.to_le_bytes())?;
        Ok(Self { writer })
    }

    /// Appends one event.
    ///
    /// The event is encoded in full before anything is written, so a
    /// rejected event leaves the file unchanged.
    ///
    /// # Errors
    /// Returns an error if a field does not fit its packed width or the
    /// write fails.
    pub fn write_event(&mut self, event: &Event) -> Result<()> {
        let n_hits = u32::try_from(event.hits.len())
            .map_err(|_| Error::InvalidFormat("too many hits in event".to_string()))?;
        let n_segments = u32::try_from(event.segments.len())
            .map_err(|_| Error::InvalidFormat("too many segments in event".to_string()))?;

        let mut encoded =
            Vec::with_capacity(WORD_SIZE * (1 + event.hits.len() + event.segments.len()));
        encoded.extend_from_slice(&n_hits.to_le_bytes());
        encoded.extend_from_slice(&n_segments.to_le_bytes());
        for hit in &event.hits {
            encoded.extend_from_slice(&[
                packed_index(hit.sector, "sector")?,
                packed_index(hit.superlayer, "superlayer")?,
                packed_index(hit.layer, "layer")?,
                0,
            ]);
            encoded.extend_from_slice(&hit.wire.to_le_bytes());
        }
        for segment in &event.segments {
            encoded.extend_from_slice(&[
                packed_index(segment.sector, "sector")?,
                packed_index(segment.superlayer, "superlayer")?,
                0,
                0,
            ]);
            encoded.extend_from_slice(&segment.avg_wire.to_le_bytes());
        }

        self.writer.write_all(&encoded)?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn packed_index(value: i32, field: &str) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| Error::InvalidFormat(format!("{field} {value} does not fit in a byte")))
}
