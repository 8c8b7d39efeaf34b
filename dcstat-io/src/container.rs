//! Output containers: every counter of a run under the `overview` group.
//!
//! Both formats store, per counter, its stable name, axis metadata,
//! entries, out-of-range tallies and bin counts (`[nx]` for 1D counters,
//! `[ny, nx]` row-major for 2D counters).

use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use dcstat_core::{Axis, Counter, CounterRegistry, ViewKey};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Name of the group holding every counter.
pub const OVERVIEW_GROUP: &str = "overview";
/// Container layout version written into every file.
pub const FORMAT_VERSION: &str = "1.0";

/// On-disk container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// Single JSON document.
    Json,
    /// HDF5 file, one dataset per counter.
    #[serde(alias = "h5")]
    Hdf5,
}

impl ContainerFormat {
    /// File extension of containers in this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Hdf5 => "h5",
        }
    }

    /// Returns true if this build can write the format.
    #[must_use]
    pub fn is_available(self) -> bool {
        match self {
            Self::Json => true,
            Self::Hdf5 => cfg!(feature = "hdf5"),
        }
    }

    /// Detects the format of an existing container from its extension.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse().map_err(|_| {
            Error::InvalidFormat(format!("unknown container extension: {}", path.display()))
        })
    }
}

impl Default for ContainerFormat {
    fn default() -> Self {
        if cfg!(feature = "hdf5") {
            Self::Hdf5
        } else {
            Self::Json
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Hdf5 => f.write_str("hdf5"),
        }
    }
}

impl FromStr for ContainerFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "hdf5" | "h5" => Ok(Self::Hdf5),
            other => Err(Error::InvalidFormat(format!(
                "unknown container format: {other}"
            ))),
        }
    }
}

/// Axis metadata as stored in a container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisData {
    pub bins: usize,
    pub min: f64,
    pub max: f64,
}

impl TryFrom<AxisData> for Axis {
    type Error = Error;

    fn try_from(data: AxisData) -> Result<Self> {
        Ok(Axis::try_new(data.bins, data.min, data.max)?)
    }
}

impl From<&Axis> for AxisData {
    fn from(axis: &Axis) -> Self {
        Self {
            bins: axis.bins(),
            min: axis.min(),
            max: axis.max(),
        }
    }
}

/// One stored counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterData {
    pub name: String,
    pub shape: Vec<usize>,
    pub x_axis: AxisData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisData>,
    pub entries: u64,
    /// 1D only.
    #[serde(default)]
    pub underflow: u64,
    /// 1D only.
    #[serde(default)]
    pub overflow: u64,
    /// 2D only: fills outside either axis.
    #[serde(default)]
    pub outside: u64,
    pub counts: Vec<u64>,
}

impl CounterData {
    /// Captures a registry counter under its view name.
    #[must_use]
    pub fn from_counter(key: &ViewKey, counter: &Counter) -> Self {
        match counter {
            Counter::OneD(h) => Self {
                name: key.name(),
                shape: vec![h.axis().bins()],
                x_axis: h.axis().into(),
                y_axis: None,
                entries: h.entries(),
                underflow: h.underflow(),
                overflow: h.overflow(),
                outside: 0,
                counts: h.counts().to_vec(),
            },
            Counter::TwoD(h) => Self {
                name: key.name(),
                shape: vec![h.y_axis().bins(), h.x_axis().bins()],
                x_axis: h.x_axis().into(),
                y_axis: Some(h.y_axis().into()),
                entries: h.entries(),
                underflow: 0,
                overflow: 0,
                outside: h.outside(),
                counts: h.counts().to_vec(),
            },
        }
    }

    /// Sum over the stored bins.
    #[must_use]
    pub fn integral(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of dimensions (1 or 2).
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    fn validate(&self) -> Result<()> {
        let x_axis = Axis::try_from(self.x_axis)?;
        let expected = match self.y_axis {
            Some(y_axis) => vec![Axis::try_from(y_axis)?.bins(), x_axis.bins()],
            None => vec![x_axis.bins()],
        };
        if self.shape != expected || self.counts.len() != expected.iter().product::<usize>() {
            return Err(Error::InvalidFormat(format!(
                "counter {} has shape {:?} and {} counts, axes give {:?}",
                self.name,
                self.shape,
                self.counts.len(),
                expected
            )));
        }
        Ok(())
    }
}

/// Contents of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerData {
    pub format_version: String,
    pub group: String,
    pub counters: Vec<CounterData>,
}

impl ContainerData {
    /// Captures every counter of `registry` in key order.
    #[must_use]
    pub fn from_registry(registry: &CounterRegistry) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            group: OVERVIEW_GROUP.to_string(),
            counters: registry
                .iter()
                .map(|(key, counter)| CounterData::from_counter(key, counter))
                .collect(),
        }
    }

    /// Looks up a counter by its stored name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CounterData> {
        self.counters.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Sum of `entries` over all counters.
    #[must_use]
    pub fn total_entries(&self) -> u64 {
        self.counters.iter().map(|c| c.entries).sum()
    }

    fn validate(&self) -> Result<()> {
        if self.group != OVERVIEW_GROUP {
            return Err(Error::InvalidFormat(format!(
                "expected group '{OVERVIEW_GROUP}', found '{}'",
                self.group
            )));
        }
        self.counters.iter().try_for_each(CounterData::validate)
    }
}

/// Creates the file a container is staged in before it is moved to `path`.
///
/// The file lives in the same directory as `path`, so the final move is a
/// rename. Each call gets a distinct name; the file is removed when the
/// handle is dropped without being persisted.
///
/// # Errors
/// Returns an error if the staging file cannot be created.
pub fn staging_file(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut prefix = path
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    prefix.push(".");
    Ok(tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".partial")
        .tempfile_in(dir)?)
}

/// Writes every counter of `registry` to `path`.
///
/// The file is staged next to `path` and renamed into place once complete;
/// on failure the staged file is removed and `path` is left untouched.
/// Concurrent writers to the same `path` never share a staging file.
///
/// # Errors
/// Returns an error if the format is unavailable or any write fails.
pub fn write_container(
    registry: &CounterRegistry,
    path: &Path,
    format: ContainerFormat,
) -> Result<()> {
    if !format.is_available() {
        return Err(Error::FormatUnavailable("hdf5"));
    }
    let staged = staging_file(path)?;
    let data = ContainerData::from_registry(registry);
    write_data(&data, staged.path(), format)?;
    staged.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn write_data(data: &ContainerData, path: &Path, format: ContainerFormat) -> Result<()> {
    match format {
        ContainerFormat::Json => write_json(data, path),
        #[cfg(feature = "hdf5")]
        ContainerFormat::Hdf5 => crate::hdf5::write_container_hdf5(data, path),
        #[cfg(not(feature = "hdf5"))]
        ContainerFormat::Hdf5 => Err(Error::FormatUnavailable("hdf5")),
    }
}

fn write_json(data: &ContainerData, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, data)?;
    writer.flush()?;
    Ok(())
}

/// Reads a container written by [`write_container`].
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid container.
pub fn read_container(path: &Path, format: ContainerFormat) -> Result<ContainerData> {
    let data: ContainerData = match format {
        ContainerFormat::Json => {
            let reader = BufReader::new(File::open(path)?);
            serde_json::from_reader(reader)?
        }
        #[cfg(feature = "hdf5")]
        ContainerFormat::Hdf5 => crate::hdf5::read_container_hdf5(path)?,
        #[cfg(not(feature = "hdf5"))]
        ContainerFormat::Hdf5 => return Err(Error::FormatUnavailable("hdf5")),
    };
    data.validate()?;
    Ok(data)
}
