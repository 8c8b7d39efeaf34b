//! dcstat-io: Event sources, output containers and the batch run driver.
//!
//! Event files are read one event at a time, either from JSON lines or
//! from memory-mapped packed files via memmap2. Containers are written as
//! JSON, or as HDF5 with the `hdf5` feature.
//!

pub mod container;
mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod jsonl;
pub mod lists;
pub mod options;
pub mod packed;
pub mod pipeline;
pub mod source;

pub use container::{
    read_container, write_container, AxisData, ContainerData, ContainerFormat, CounterData,
};
pub use error::{Error, Result};
pub use jsonl::JsonLinesReader;
pub use lists::{discover_record_lists, RecordList};
pub use options::RunOptions;
pub use packed::{PackedEventReader, PackedEventWriter, PackedEvents};
pub use pipeline::{
    find_record_lists, output_base_name, process_all, process_run, read_record_list,
    BatchReport, RunFailure, RunReport,
};
pub use source::{EventFileFormat, EventFileSource};
