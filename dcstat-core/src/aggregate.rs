//! Streaming reduction of an event stream into a [`CounterRegistry`].

use std::convert::Infallible;

use crate::record::Event;
use crate::registry::CounterRegistry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Record tallies of one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregateStats {
    /// Events consumed.
    pub events: u64,
    /// Hits recorded in the hit views.
    pub hits: u64,
    /// Segments recorded in the segment views.
    pub segments: u64,
    /// Hits whose address named no view.
    pub rejected_hits: u64,
    /// Segments whose address named no view.
    pub rejected_segments: u64,
}

impl AggregateStats {
    /// Adds another pass's tallies to this one.
    pub fn merge(&mut self, other: &AggregateStats) {
        self.events += other.events;
        self.hits += other.hits;
        self.segments += other.segments;
        self.rejected_hits += other.rejected_hits;
        self.rejected_segments += other.rejected_segments;
    }

    /// Total rejected records.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected_hits + self.rejected_segments
    }
}

/// Records every hit of `event` (in order), then every segment.
pub fn record_event(registry: &mut CounterRegistry, event: &Event, stats: &mut AggregateStats) {
    stats.events += 1;
    for hit in &event.hits {
        if registry.record_hit(hit) {
            stats.hits += 1;
        } else {
            stats.rejected_hits += 1;
        }
    }
    for segment in &event.segments {
        if registry.record_segment(segment) {
            stats.segments += 1;
        } else {
            stats.rejected_segments += 1;
        }
    }
}

/// Consumes a fallible event stream into `registry`.
///
/// Only the event currently being recorded is held; the stream is pulled
/// one event at a time until it returns `None`. The first source error
/// stops the pass and is returned; counters already filled stay filled, so
/// callers should discard the registry on error.
///
/// # Errors
/// Returns the first error yielded by `events`.
pub fn aggregate<I, E>(events: I, registry: &mut CounterRegistry) -> Result<AggregateStats, E>
where
    I: IntoIterator<Item = Result<Event, E>>,
{
    let mut stats = AggregateStats::default();
    for event in events {
        record_event(registry, &event?, &mut stats);
    }
    Ok(stats)
}

/// Infallible variant of [`aggregate`] for in-memory events.
pub fn aggregate_events<I>(events: I, registry: &mut CounterRegistry) -> AggregateStats
where
    I: IntoIterator<Item = Event>,
{
    match aggregate(events.into_iter().map(Ok::<_, Infallible>), registry) {
        Ok(stats) => stats,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LayerAddress, SuperlayerAddress};
    use crate::record::{HitRecord, SegmentRecord};
    use crate::view::ViewKey;

    fn event(hits: &[(i32, i32, i32, i32)], segments: &[(i32, i32, f32)]) -> Event {
        Event {
            hits: hits
                .iter()
                .map(|&(s, sl, l, w)| HitRecord::new(s, sl, l, w))
                .collect(),
            segments: segments
                .iter()
                .map(|&(s, sl, w)| SegmentRecord::new(s, sl, w))
                .collect(),
        }
    }

    #[test]
    fn test_empty_stream() {
        let mut registry = CounterRegistry::allocate();
        let stats = aggregate_events(Vec::new(), &mut registry);
        assert_eq!(stats, AggregateStats::default());
        assert_eq!(registry.total_entries(), 0);
    }

    #[test]
    fn test_stats() {
        let mut registry = CounterRegistry::allocate();
        let events = vec![
            event(&[(1, 1, 1, 10), (2, 3, 4, 50)], &[(1, 1, 12.3)]),
            event(&[], &[]),
            event(&[(0, 1, 1, 10)], &[(1, 1, 40.0), (1, 9, 40.0)]),
        ];
        let stats = aggregate_events(events, &mut registry);

        assert_eq!(stats.events, 3);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.segments, 2);
        assert_eq!(stats.rejected_hits, 1);
        assert_eq!(stats.rejected_segments, 1);
        assert_eq!(stats.rejected(), 2);
        assert_eq!(registry.rejected_hits(), 1);
    }

    #[test]
    fn test_source_error_stops_pass() {
        let mut registry = CounterRegistry::allocate();
        let events: Vec<Result<Event, String>> = vec![
            Ok(event(&[(1, 1, 1, 10)], &[])),
            Err("truncated".to_string()),
            Ok(event(&[(1, 1, 1, 10)], &[])),
        ];
        let err = aggregate(events, &mut registry).unwrap_err();
        assert_eq!(err, "truncated");
    }

    #[test]
    fn test_event_records_hits_then_segments() {
        let mut registry = CounterRegistry::allocate();
        let stats = aggregate_events(
            vec![event(&[(1, 1, 1, 10)], &[(1, 1, 12.3)])],
            &mut registry,
        );
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.segments, 1);

        let wires = registry
            .histogram_1d(&ViewKey::WireInLayer(LayerAddress {
                sector: 0,
                superlayer: 0,
                layer: 0,
            }))
            .unwrap();
        assert_eq!(wires.count_at(10.0), Some(1));

        let avg = registry
            .histogram_1d(&ViewKey::AvgWire(SuperlayerAddress {
                sector: 0,
                superlayer: 0,
            }))
            .unwrap();
        assert_eq!(avg.count_at(12.3), Some(1));
    }
}
