//! Event records as delivered by an event source.
//!
//! Fields are kept exactly as the reconstruction wrote them: sector,
//! superlayer and layer are 1-based, wire is 0-based. Normalization happens
//! in the registry, once per record.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single drift-chamber hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitRecord {
    /// Sector (1-based).
    pub sector: i32,
    /// Superlayer (1-based).
    pub superlayer: i32,
    /// Layer within the superlayer (1-based).
    pub layer: i32,
    /// Wire channel (0-based).
    pub wire: i32,
}

impl HitRecord {
    #[inline]
    #[must_use]
    pub fn new(sector: i32, superlayer: i32, layer: i32, wire: i32) -> Self {
        Self {
            sector,
            superlayer,
            layer,
            wire,
        }
    }
}

/// A reconstructed track segment within one superlayer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentRecord {
    /// Sector (1-based).
    pub sector: i32,
    /// Superlayer (1-based).
    pub superlayer: i32,
    /// Mean wire position of the segment.
    #[cfg_attr(feature = "serde", serde(alias = "avgWire"))]
    pub avg_wire: f32,
}

impl SegmentRecord {
    #[inline]
    #[must_use]
    pub fn new(sector: i32, superlayer: i32, avg_wire: f32) -> Self {
        Self {
            sector,
            superlayer,
            avg_wire,
        }
    }
}

/// All records of one detector event.
///
/// Hit and segment counts are unrelated; either may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Event {
    pub hits: Vec<HitRecord>,
    pub segments: Vec<SegmentRecord>,
}

impl Event {
    /// Creates an event with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(hits: usize, segments: usize) -> Self {
        Self {
            hits: Vec::with_capacity(hits),
            segments: Vec::with_capacity(segments),
        }
    }

    /// Returns true if the event carries no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.segments.is_empty()
    }
}
