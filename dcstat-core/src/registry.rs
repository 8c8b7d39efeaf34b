//! Counter registry: every view's counter, allocated up front.

use std::collections::BTreeMap;

use crate::geometry::{LayerAddress, SuperlayerAddress};
use crate::histogram::{Histogram1D, Histogram2D};
use crate::record::{HitRecord, SegmentRecord};
use crate::view::{ViewFamily, ViewKey};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counters updated by each hit.
pub const HIT_FAN_OUT: usize = 6;
/// Counters updated by each segment.
pub const SEGMENT_FAN_OUT: usize = 2;

/// A single counter of the registry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Counter {
    OneD(Histogram1D),
    TwoD(Histogram2D),
}

impl Counter {
    /// Number of fills, including out-of-range ones.
    #[must_use]
    pub fn entries(&self) -> u64 {
        match self {
            Counter::OneD(h) => h.entries(),
            Counter::TwoD(h) => h.entries(),
        }
    }

    /// Sum over finite bins.
    #[must_use]
    pub fn integral(&self) -> u64 {
        match self {
            Counter::OneD(h) => h.integral(),
            Counter::TwoD(h) => h.integral(),
        }
    }

    /// Bin counts; row-major for 2D counters.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        match self {
            Counter::OneD(h) => h.counts(),
            Counter::TwoD(h) => h.counts(),
        }
    }

    #[must_use]
    pub fn as_1d(&self) -> Option<&Histogram1D> {
        match self {
            Counter::OneD(h) => Some(h),
            Counter::TwoD(_) => None,
        }
    }

    #[must_use]
    pub fn as_2d(&self) -> Option<&Histogram2D> {
        match self {
            Counter::TwoD(h) => Some(h),
            Counter::OneD(_) => None,
        }
    }
}

/// All counters of one run, keyed by view.
///
/// Created once per run by [`CounterRegistry::allocate`]; no counter is ever
/// created lazily.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRegistry {
    counters: BTreeMap<ViewKey, Counter>,
    rejected_hits: u64,
    rejected_segments: u64,
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::allocate()
    }
}

impl CounterRegistry {
    /// Allocates every counter of every view family.
    #[must_use]
    pub fn allocate() -> Self {
        let counters = ViewKey::all()
            .into_iter()
            .map(|key| (key, key.allocate()))
            .collect();
        Self {
            counters,
            rejected_hits: 0,
            rejected_segments: 0,
        }
    }

    /// Records one hit in all six hit views.
    ///
    /// Returns `false` (and fills nothing) when the hit's sector, superlayer
    /// or layer does not address an allocated view. Out-of-range wires are
    /// filled and end up in the counters' overflow/underflow.
    pub fn record_hit(&mut self, hit: &HitRecord) -> bool {
        let Some(addr) = LayerAddress::from_one_based(hit.sector, hit.superlayer, hit.layer)
        else {
            self.rejected_hits += 1;
            return false;
        };

        let wire = f64::from(hit.wire);
        let layer = f64::from(addr.global_layer());
        let sl = addr.superlayer_address();

        self.fill_2d(ViewKey::LayerVsWireLeft { sector: addr.sector }, wire, layer);
        self.fill_2d(ViewKey::LayerVsWireRight { sector: addr.sector }, wire, layer);
        self.fill_2d(ViewKey::LayerVsWireLeftSuperlayer(sl), wire, layer);
        self.fill_2d(ViewKey::LayerVsWireRightSuperlayer(sl), wire, layer);
        self.fill_1d(ViewKey::WireInLayer(addr), wire);
        self.fill_2d(ViewKey::LayerVsWireOneSuperlayer(sl), wire, layer);
        true
    }

    /// Records one segment in its sector view and the all-sector sum.
    ///
    /// Returns `false` (and fills nothing) for an unaddressable segment.
    pub fn record_segment(&mut self, segment: &SegmentRecord) -> bool {
        let Some(sl) = SuperlayerAddress::from_one_based(segment.sector, segment.superlayer)
        else {
            self.rejected_segments += 1;
            return false;
        };

        let avg_wire = f64::from(segment.avg_wire);
        self.fill_1d(
            ViewKey::AvgWireSummed {
                superlayer: sl.superlayer,
            },
            avg_wire,
        );
        self.fill_1d(ViewKey::AvgWire(sl), avg_wire);
        true
    }

    /// Counter of one view.
    #[must_use]
    pub fn get(&self, key: &ViewKey) -> Option<&Counter> {
        self.counters.get(key)
    }

    /// 1D counter of one view, `None` for 2D views.
    #[must_use]
    pub fn histogram_1d(&self, key: &ViewKey) -> Option<&Histogram1D> {
        self.get(key).and_then(Counter::as_1d)
    }

    /// 2D counter of one view, `None` for 1D views.
    #[must_use]
    pub fn histogram_2d(&self, key: &ViewKey) -> Option<&Histogram2D> {
        self.get(key).and_then(Counter::as_2d)
    }

    /// All counters in stable key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ViewKey, &Counter)> {
        self.counters.iter()
    }

    /// Counters of one family in key order.
    pub fn family(&self, family: ViewFamily) -> impl Iterator<Item = (&ViewKey, &Counter)> {
        self.counters
            .iter()
            .filter(move |(key, _)| key.family() == family)
    }

    /// Number of allocated counters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Always false once allocated; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Sum of entries over every counter.
    #[must_use]
    pub fn total_entries(&self) -> u64 {
        self.counters.values().map(Counter::entries).sum()
    }

    /// Hits that did not address any view.
    #[must_use]
    pub fn rejected_hits(&self) -> u64 {
        self.rejected_hits
    }

    /// Segments that did not address any view.
    #[must_use]
    pub fn rejected_segments(&self) -> u64 {
        self.rejected_segments
    }

    // Every key handed to the fill helpers comes from a normalized address,
    // so the lookup always hits an allocated counter of the right kind.
    fn fill_1d(&mut self, key: ViewKey, x: f64) {
        if let Some(Counter::OneD(h)) = self.counters.get_mut(&key) {
            h.fill(x);
        }
    }

    fn fill_2d(&mut self, key: ViewKey, x: f64, y: f64) {
        if let Some(Counter::TwoD(h)) = self.counters.get_mut(&key) {
            h.fill(x, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_entries_delta(
        registry: &mut CounterRegistry,
        f: impl FnOnce(&mut CounterRegistry),
    ) -> u64 {
        let before = registry.total_entries();
        f(registry);
        registry.total_entries() - before
    }

    #[test]
    fn test_allocate_is_empty() {
        let registry = CounterRegistry::allocate();
        assert_eq!(registry.len(), 378);
        assert_eq!(registry.total_entries(), 0);
        assert!(registry.iter().all(|(_, c)| c.entries() == 0));
    }

    #[test]
    fn test_hit_fan_out() {
        let mut registry = CounterRegistry::allocate();
        let delta = total_entries_delta(&mut registry, |r| {
            assert!(r.record_hit(&HitRecord::new(3, 4, 2, 60)));
        });
        assert_eq!(delta, HIT_FAN_OUT as u64);
    }

    #[test]
    fn test_segment_fan_out() {
        let mut registry = CounterRegistry::allocate();
        let delta = total_entries_delta(&mut registry, |r| {
            assert!(r.record_segment(&SegmentRecord::new(6, 6, 57.25)));
        });
        assert_eq!(delta, SEGMENT_FAN_OUT as u64);
    }

    #[test]
    fn test_left_and_right_views_always_updated() {
        let mut registry = CounterRegistry::allocate();
        // Wire 5 only lies inside the left domain, but both views see the fill.
        registry.record_hit(&HitRecord::new(1, 1, 1, 5));

        let left = registry
            .histogram_2d(&ViewKey::LayerVsWireLeft { sector: 0 })
            .unwrap();
        let right = registry
            .histogram_2d(&ViewKey::LayerVsWireRight { sector: 0 })
            .unwrap();
        assert_eq!(left.entries(), 1);
        assert_eq!(left.count_at(5.0, 1.0), Some(1));
        assert_eq!(right.entries(), 1);
        assert_eq!(right.integral(), 0);
        assert_eq!(right.outside(), 1);
    }

    #[test]
    fn test_one_based_normalization() {
        let mut registry = CounterRegistry::allocate();
        registry.record_hit(&HitRecord::new(1, 2, 3, 40));

        let expected = LayerAddress {
            sector: 0,
            superlayer: 1,
            layer: 2,
        };
        let h = registry
            .histogram_1d(&ViewKey::WireInLayer(expected))
            .unwrap();
        assert_eq!(h.count_at(40.0), Some(1));

        let wrong = LayerAddress {
            sector: 1,
            superlayer: 2,
            layer: 3,
        };
        assert_eq!(
            registry
                .histogram_1d(&ViewKey::WireInLayer(wrong))
                .unwrap()
                .entries(),
            0
        );

        let per_sl = registry
            .histogram_2d(&ViewKey::LayerVsWireOneSuperlayer(expected.superlayer_address()))
            .unwrap();
        // Global layer = 1 * 6 + 2 + 1 = 9.
        assert_eq!(per_sl.count_at(40.0, 9.0), Some(1));
    }

    #[test]
    fn test_overflow_wire_is_not_binned() {
        let mut registry = CounterRegistry::allocate();
        assert!(registry.record_hit(&HitRecord::new(2, 2, 2, 1000)));

        for (_, counter) in registry.iter() {
            assert_eq!(counter.integral(), 0);
        }
        assert_eq!(registry.total_entries(), HIT_FAN_OUT as u64);
    }

    #[test]
    fn test_unaddressable_records_are_rejected() {
        let mut registry = CounterRegistry::allocate();
        assert!(!registry.record_hit(&HitRecord::new(0, 1, 1, 10)));
        assert!(!registry.record_hit(&HitRecord::new(1, 7, 1, 10)));
        assert!(!registry.record_hit(&HitRecord::new(1, 1, -1, 10)));
        assert!(!registry.record_segment(&SegmentRecord::new(9, 1, 10.0)));

        assert_eq!(registry.total_entries(), 0);
        assert_eq!(registry.rejected_hits(), 3);
        assert_eq!(registry.rejected_segments(), 1);
    }

    #[test]
    fn test_segment_summed_over_sectors() {
        let mut registry = CounterRegistry::allocate();
        for sector in 1..=6 {
            registry.record_segment(&SegmentRecord::new(sector, 2, 30.0));
        }

        let summed = registry
            .histogram_1d(&ViewKey::AvgWireSummed { superlayer: 1 })
            .unwrap();
        assert_eq!(summed.count_at(30.0), Some(6));

        for (_, counter) in registry.family(ViewFamily::AvgWire) {
            let expected = u64::from(counter.entries() > 0);
            assert_eq!(counter.integral(), expected);
        }
    }
}
