//! HDF5 containers: one dataset per counter under `/overview`.
//!
//! Each dataset holds the bin counts (`u64`, shape `[nx]` or `[ny, nx]`)
//! and carries the axis metadata and tallies as attributes.

use crate::container::{AxisData, ContainerData, CounterData, FORMAT_VERSION, OVERVIEW_GROUP};
use crate::{Error, Result};
use hdf5::types::VarLenUnicode;
use hdf5::{Dataset, File, Group, H5Type, Location};
use ndarray::ArrayView;
use std::path::Path;
use std::str::FromStr;

/// Writes `data` to a new HDF5 file at `path`.
///
/// # Errors
/// Returns an error if HDF5 I/O fails or a counter's shape is inconsistent.
pub fn write_container_hdf5(data: &ContainerData, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    set_attr_str(&file, "dcstat_format_version", FORMAT_VERSION)?;

    let overview = file.create_group(OVERVIEW_GROUP)?;
    set_attr_str(&overview, "description", "drift-chamber wire occupancy")?;
    for counter in &data.counters {
        write_counter(&overview, counter)?;
    }
    Ok(())
}

fn write_counter(group: &Group, counter: &CounterData) -> Result<()> {
    let dataset = match counter.shape.as_slice() {
        &[nx] => {
            let ds = create_counts_dataset(group, &counter.name, (nx,))?;
            let view = ArrayView::from_shape((nx,), counter.counts.as_slice())
                .map_err(|e| shape_error(counter, &e))?;
            ds.write(view)?;
            ds
        }
        &[ny, nx] => {
            let ds = create_counts_dataset(group, &counter.name, (ny, nx))?;
            let view = ArrayView::from_shape((ny, nx), counter.counts.as_slice())
                .map_err(|e| shape_error(counter, &e))?;
            ds.write(view)?;
            ds
        }
        _ => {
            return Err(Error::InvalidFormat(format!(
                "counter {} has unsupported shape {:?}",
                counter.name, counter.shape
            )))
        }
    };

    set_axis_attrs(&dataset, "x", &counter.x_axis)?;
    if let Some(y_axis) = &counter.y_axis {
        set_axis_attrs(&dataset, "y", y_axis)?;
    }
    set_attr(&dataset, "entries", counter.entries)?;
    if counter.y_axis.is_some() {
        set_attr(&dataset, "outside", counter.outside)?;
    } else {
        set_attr(&dataset, "underflow", counter.underflow)?;
        set_attr(&dataset, "overflow", counter.overflow)?;
    }
    Ok(())
}

/// Reads a container written by [`write_container_hdf5`].
///
/// # Errors
/// Returns an error if HDF5 I/O fails or required attributes are missing.
pub fn read_container_hdf5(path: &Path) -> Result<ContainerData> {
    let file = File::open(path)?;
    let format_version = read_attr_str(&file, "dcstat_format_version")?;
    let overview = file.group(OVERVIEW_GROUP)?;

    let mut counters = Vec::new();
    for name in overview.member_names()? {
        let dataset = overview.dataset(&name)?;
        let shape = dataset.shape();
        let counts = dataset.read_raw::<u64>()?;
        let x_axis = read_axis_attrs(&dataset, "x")?;
        let y_axis = if shape.len() == 2 {
            Some(read_axis_attrs(&dataset, "y")?)
        } else {
            None
        };
        counters.push(CounterData {
            name,
            shape,
            x_axis,
            y_axis,
            entries: read_attr(&dataset, "entries")?,
            underflow: read_attr_opt(&dataset, "underflow")?.unwrap_or(0),
            overflow: read_attr_opt(&dataset, "overflow")?.unwrap_or(0),
            outside: read_attr_opt(&dataset, "outside")?.unwrap_or(0),
            counts,
        });
    }

    Ok(ContainerData {
        format_version,
        group: OVERVIEW_GROUP.to_string(),
        counters,
    })
}

fn create_counts_dataset<S>(group: &Group, name: &str, shape: S) -> Result<Dataset>
where
    S: Into<hdf5::Extents>,
{
    let dataset = group.new_dataset::<u64>().shape(shape).create(name)?;
    set_attr_str(&dataset, "units", "count")?;
    Ok(dataset)
}

fn shape_error(counter: &CounterData, e: &ndarray::ShapeError) -> Error {
    Error::InvalidFormat(format!("counter {} shape mismatch: {e}", counter.name))
}

fn set_axis_attrs(location: &Location, axis: &str, data: &AxisData) -> Result<()> {
    let bins = u64::try_from(data.bins)
        .map_err(|_| Error::InvalidFormat(format!("{axis} axis has too many bins")))?;
    set_attr(location, &format!("{axis}_bins"), bins)?;
    set_attr(location, &format!("{axis}_min"), data.min)?;
    set_attr(location, &format!("{axis}_max"), data.max)?;
    Ok(())
}

fn read_axis_attrs(location: &Location, axis: &str) -> Result<AxisData> {
    let bins: u64 = read_attr(location, &format!("{axis}_bins"))?;
    Ok(AxisData {
        bins: usize::try_from(bins)
            .map_err(|_| Error::InvalidFormat(format!("{axis} axis has too many bins")))?,
        min: read_attr(location, &format!("{axis}_min"))?,
        max: read_attr(location, &format!("{axis}_max"))?,
    })
}

fn set_attr<T: H5Type>(location: &Location, name: &str, value: T) -> Result<()> {
    location.new_attr::<T>().create(name)?.write_scalar(&value)?;
    Ok(())
}

fn read_attr<T: H5Type>(location: &Location, name: &str) -> Result<T> {
    Ok(location.attr(name)?.read_scalar::<T>()?)
}

fn read_attr_opt<T: H5Type>(location: &Location, name: &str) -> Result<Option<T>> {
    match location.attr(name) {
        Ok(attr) => Ok(Some(attr.read_scalar::<T>()?)),
        Err(_) => Ok(None),
    }
}

fn set_attr_str(location: &Location, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    location
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn read_attr_str(location: &Location, name: &str) -> Result<String> {
    let value: VarLenUnicode = location.attr(name)?.read_scalar()?;
    Ok(value.to_string())
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{read_container, write_container, ContainerFormat};
    use dcstat_core::{CounterRegistry, HitRecord, SegmentRecord};
    use tempfile::tempdir;

    #[test]
    fn test_hdf5_container_write_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.h5");
        let mut registry = CounterRegistry::allocate();
        registry.record_hit(&HitRecord::new(1, 1, 1, 10));
        registry.record_hit(&HitRecord::new(2, 3, 4, -7));
        registry.record_segment(&SegmentRecord::new(1, 1, 12.3));

        write_container(&registry, &path, ContainerFormat::Hdf5).unwrap();
        let data = read_container(&path, ContainerFormat::Hdf5).unwrap();

        assert_eq!(data.format_version, FORMAT_VERSION);
        assert_eq!(data.len(), registry.len());
        for expected in &ContainerData::from_registry(&registry).counters {
            let stored = data.get(&expected.name).unwrap();
            assert_eq!(stored, expected);
        }

        let wires = data.get("wireINlayer_S1_SL2_L3").unwrap();
        assert_eq!(wires.underflow, 1);
        assert_eq!(wires.integral(), 0);
    }

    #[test]
    fn test_hdf5_rejects_bad_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.h5");
        let mut data = ContainerData::from_registry(&CounterRegistry::allocate());
        data.counters[0].counts.pop();
        assert!(matches!(
            write_container_hdf5(&data, &path),
            Err(Error::InvalidFormat(_))
        ));
    }
}
