//! dcstat-core: Wire occupancy counters for drift-chamber event data.
//!
//! This crate provides the detector addressing scheme, fixed-bin
//! histograms, the per-run counter registry and the streaming aggregation
//! pass that fills it.
//!

pub mod aggregate;
pub mod error;
pub mod geometry;
pub mod histogram;
pub mod record;
pub mod registry;
pub mod view;

pub use aggregate::{aggregate, aggregate_events, record_event, AggregateStats};
pub use error::{Error, Result};
pub use geometry::{global_layer, normalize_index, LayerAddress, SuperlayerAddress};
pub use histogram::{Axis, BinIndex, Histogram1D, Histogram2D};
pub use record::{Event, HitRecord, SegmentRecord};
pub use registry::{Counter, CounterRegistry, HIT_FAN_OUT, SEGMENT_FAN_OUT};
pub use view::{ViewFamily, ViewKey};
