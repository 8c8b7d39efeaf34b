//! Drift-chamber addressing scheme.
//!
//! Every view in the counter registry is addressed by some prefix of
//! (sector, superlayer, layer). Input records carry these as 1-based
//! values; [`normalize_index`] is the single place they become 0-based.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of azimuthal sectors.
pub const N_SECTORS: usize = 6;
/// Number of superlayers per sector.
pub const N_SUPERLAYERS: usize = 6;
/// Number of layers per superlayer.
pub const N_LAYERS_PER_SUPERLAYER: usize = 6;
/// Number of sense wires per layer.
pub const N_WIRES: usize = 115;
/// Number of global-layer bins (36 layers plus one padding bin at each end).
pub const N_GLOBAL_LAYERS: usize = 39;

/// Full wire axis, one bin per wire.
pub const WIRE_RANGE: (f64, f64) = (-0.5, 114.5);
/// Low-wire half of the layer-vs-wire views.
pub const WIRE_RANGE_LEFT: (f64, f64) = (-0.5, 40.5);
/// High-wire half of the layer-vs-wire views.
pub const WIRE_RANGE_RIGHT: (f64, f64) = (37.5, 114.5);
/// Global layer axis.
pub const LAYER_RANGE: (f64, f64) = (-0.5, 38.5);

/// Bin counts of the left/right wire axes.
pub const N_WIRE_BINS_LEFT: usize = 41;
pub const N_WIRE_BINS_RIGHT: usize = 77;
/// Bin count of the per-superlayer global layer axis.
pub const N_LAYER_BINS_SUPERLAYER: usize = 8;

/// Converts a 1-based index to 0-based, returning `None` when the result
/// falls outside `[0, count)`.
#[inline]
#[must_use]
pub fn normalize_index(one_based: i32, count: usize) -> Option<u8> {
    let index = usize::try_from(one_based.checked_sub(1)?).ok()?;
    if index < count {
        u8::try_from(index).ok()
    } else {
        None
    }
}

/// Global layer number of a local layer: `superlayer * 6 + layer + 1`.
///
/// Both arguments are 0-based, so the result spans `1..=36`.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn global_layer(superlayer: u8, layer: u8) -> u32 {
    u32::from(superlayer) * N_LAYERS_PER_SUPERLAYER as u32 + u32::from(layer) + 1
}

/// Global layer axis restricted to one superlayer: 8 bins centred on
/// `superlayer*6 .. superlayer*6 + 7`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn superlayer_layer_range(superlayer: u8) -> (f64, f64) {
    let base = f64::from(superlayer) * N_LAYERS_PER_SUPERLAYER as f64;
    (base - 0.5, base + 6.5)
}

/// 0-based (sector, superlayer) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SuperlayerAddress {
    pub sector: u8,
    pub superlayer: u8,
}

impl SuperlayerAddress {
    /// Normalizes 1-based record fields.
    #[must_use]
    pub fn from_one_based(sector: i32, superlayer: i32) -> Option<Self> {
        Some(Self {
            sector: normalize_index(sector, N_SECTORS)?,
            superlayer: normalize_index(superlayer, N_SUPERLAYERS)?,
        })
    }
}

/// 0-based (sector, superlayer, layer) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerAddress {
    pub sector: u8,
    pub superlayer: u8,
    pub layer: u8,
}

impl LayerAddress {
    /// Normalizes 1-based record fields.
    #[must_use]
    pub fn from_one_based(sector: i32, superlayer: i32, layer: i32) -> Option<Self> {
        let SuperlayerAddress { sector, superlayer } =
            SuperlayerAddress::from_one_based(sector, superlayer)?;
        Some(Self {
            sector,
            superlayer,
            layer: normalize_index(layer, N_LAYERS_PER_SUPERLAYER)?,
        })
    }

    /// The enclosing superlayer.
    #[inline]
    #[must_use]
    pub fn superlayer_address(&self) -> SuperlayerAddress {
        SuperlayerAddress {
            sector: self.sector,
            superlayer: self.superlayer,
        }
    }

    /// See [`global_layer`].
    #[inline]
    #[must_use]
    pub fn global_layer(&self) -> u32 {
        global_layer(self.superlayer, self.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index(1, N_SECTORS), Some(0));
        assert_eq!(normalize_index(6, N_SECTORS), Some(5));
        assert_eq!(normalize_index(7, N_SECTORS), None);
        assert_eq!(normalize_index(0, N_SECTORS), None);
        assert_eq!(normalize_index(-3, N_SECTORS), None);
        assert_eq!(normalize_index(i32::MIN, N_SECTORS), None);
    }

    #[test]
    fn test_global_layer() {
        assert_eq!(global_layer(0, 0), 1);
        assert_eq!(global_layer(0, 5), 6);
        assert_eq!(global_layer(1, 0), 7);
        assert_eq!(global_layer(5, 5), 36);
    }

    #[test]
    fn test_layer_address_from_one_based() {
        let addr = LayerAddress::from_one_based(1, 2, 3).unwrap();
        assert_eq!(
            addr,
            LayerAddress {
                sector: 0,
                superlayer: 1,
                layer: 2
            }
        );
        assert_eq!(addr.global_layer(), 9);
        assert!(LayerAddress::from_one_based(1, 2, 7).is_none());
        assert!(LayerAddress::from_one_based(0, 2, 3).is_none());
    }

    #[test]
    fn test_superlayer_layer_range_covers_global_layers() {
        for sl in 0..N_SUPERLAYERS as u8 {
            let (lo, hi) = superlayer_layer_range(sl);
            for layer in 0..N_LAYERS_PER_SUPERLAYER as u8 {
                let y = f64::from(global_layer(sl, layer));
                assert!(y > lo && y < hi);
            }
        }
    }
}
