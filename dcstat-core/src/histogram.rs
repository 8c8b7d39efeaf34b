//! Fixed-bin frequency counters.
//!
//! Bins are half-open: a value `x` lands in bin `floor((x - min) / width)`
//! when `min <= x < max`. Values below `min` are counted as underflow,
//! values at or above `max` (and NaN) as overflow. Out-of-range fills are
//! never errors; they simply do not reach any finite bin.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of locating a value on an [`Axis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinIndex {
    Underflow,
    Bin(usize),
    Overflow,
}

/// Uniform binning of `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Axis {
    bins: usize,
    min: f64,
    max: f64,
}

impl Axis {
    /// Creates an axis from trusted constants.
    ///
    /// Use [`Axis::try_new`] for values that have not been validated.
    #[must_use]
    pub const fn new(bins: usize, min: f64, max: f64) -> Self {
        Self { bins, min, max }
    }

    /// Creates an axis, rejecting zero bins and empty or non-finite ranges.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAxis`] when the binning is degenerate.
    pub fn try_new(bins: usize, min: f64, max: f64) -> Result<Self> {
        if bins == 0 || !min.is_finite() || !max.is_finite() || max <= min {
            return Err(Error::InvalidAxis { bins, min, max });
        }
        Ok(Self::new(bins, min, max))
    }

    #[inline]
    #[must_use]
    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Width of every bin.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Centre of bin `index` (0-based).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_center(&self, index: usize) -> f64 {
        self.min + (index as f64 + 0.5) * self.bin_width()
    }

    /// Locates `value` on the axis.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn find_bin(&self, value: f64) -> BinIndex {
        if value.is_nan() || value >= self.max {
            return BinIndex::Overflow;
        }
        if value < self.min {
            return BinIndex::Underflow;
        }
        let index = ((value - self.min) / self.bin_width()) as usize;
        // Rounding can push values just below `max` onto `bins`.
        BinIndex::Bin(index.min(self.bins - 1))
    }
}

/// One-dimensional counter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram1D {
    axis: Axis,
    counts: Vec<u64>,
    underflow: u64,
    overflow: u64,
    entries: u64,
    sum_x: f64,
    sum_x2: f64,
}

impl Histogram1D {
    /// Creates an empty counter over `axis`.
    #[must_use]
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            counts: vec![0; axis.bins()],
            underflow: 0,
            overflow: 0,
            entries: 0,
            sum_x: 0.0,
            sum_x2: 0.0,
        }
    }

    /// Records one value.
    #[inline]
    pub fn fill(&mut self, x: f64) {
        self.entries += 1;
        match self.axis.find_bin(x) {
            BinIndex::Underflow => self.underflow += 1,
            BinIndex::Overflow => self.overflow += 1,
            BinIndex::Bin(i) => {
                self.counts[i] += 1;
                self.sum_x += x;
                self.sum_x2 += x * x;
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Per-bin counts, without underflow/overflow.
    #[inline]
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Count in bin `index`, or `None` past the last bin.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u64> {
        self.counts.get(index).copied()
    }

    /// Count of the bin containing `x`, or `None` if `x` is out of range.
    #[must_use]
    pub fn count_at(&self, x: f64) -> Option<u64> {
        match self.axis.find_bin(x) {
            BinIndex::Bin(i) => Some(self.counts[i]),
            BinIndex::Underflow | BinIndex::Overflow => None,
        }
    }

    /// Number of fills, including out-of-range ones.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    #[inline]
    #[must_use]
    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    #[inline]
    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Sum over finite bins.
    #[must_use]
    pub fn integral(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Mean of in-range fills, `None` when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        let n = self.integral();
        (n > 0).then(|| self.sum_x / n as f64)
    }

    /// Population standard deviation of in-range fills.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn std_dev(&self) -> Option<f64> {
        let n = self.integral();
        let mean = self.mean()?;
        let variance = (self.sum_x2 / n as f64 - mean * mean).max(0.0);
        Some(variance.sqrt())
    }
}

/// Two-dimensional counter, stored row-major as `counts[y * nx + x]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram2D {
    x_axis: Axis,
    y_axis: Axis,
    counts: Vec<u64>,
    outside: u64,
    entries: u64,
}

impl Histogram2D {
    /// Creates an empty counter over `x_axis` × `y_axis`.
    #[must_use]
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            x_axis,
            y_axis,
            counts: vec![0; x_axis.bins() * y_axis.bins()],
            outside: 0,
            entries: 0,
        }
    }

    /// Records one `(x, y)` pair. Pairs with either coordinate outside its
    /// axis are only counted in [`Histogram2D::outside`].
    #[inline]
    pub fn fill(&mut self, x: f64, y: f64) {
        self.entries += 1;
        match (self.x_axis.find_bin(x), self.y_axis.find_bin(y)) {
            (BinIndex::Bin(ix), BinIndex::Bin(iy)) => {
                self.counts[iy * self.x_axis.bins() + ix] += 1;
            }
            _ => self.outside += 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    #[inline]
    #[must_use]
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Row-major counts (`ny` rows of `nx` bins).
    #[inline]
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Count in bin `(ix, iy)`.
    #[inline]
    #[must_use]
    pub fn get(&self, ix: usize, iy: usize) -> Option<u64> {
        if ix < self.x_axis.bins() && iy < self.y_axis.bins() {
            Some(self.counts[iy * self.x_axis.bins() + ix])
        } else {
            None
        }
    }

    /// Count of the bin containing `(x, y)`, or `None` if out of range.
    #[must_use]
    pub fn count_at(&self, x: f64, y: f64) -> Option<u64> {
        match (self.x_axis.find_bin(x), self.y_axis.find_bin(y)) {
            (BinIndex::Bin(ix), BinIndex::Bin(iy)) => self.get(ix, iy),
            _ => None,
        }
    }

    /// Number of fills, including out-of-range ones.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Fills that missed every finite bin.
    #[inline]
    #[must_use]
    pub fn outside(&self) -> u64 {
        self.outside
    }

    /// Sum over finite bins.
    #[must_use]
    pub fn integral(&self) -> u64 {
        self.counts.iter().sum()
    }
}
