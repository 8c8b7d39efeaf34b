//! Typed keys for the fixed set of analysis views.
//!
//! Each key names exactly one counter. The key decides the counter's shape
//! and its stable output name, so no code outside this module builds or
//! parses counter names.

use std::fmt;

use crate::geometry::{
    superlayer_layer_range, LayerAddress, SuperlayerAddress, LAYER_RANGE, N_GLOBAL_LAYERS,
    N_LAYERS_PER_SUPERLAYER, N_LAYER_BINS_SUPERLAYER, N_SECTORS, N_SUPERLAYERS, N_WIRES,
    N_WIRE_BINS_LEFT, N_WIRE_BINS_RIGHT, WIRE_RANGE, WIRE_RANGE_LEFT, WIRE_RANGE_RIGHT,
};
use crate::histogram::{Axis, Histogram1D, Histogram2D};
use crate::registry::Counter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// View families; every [`ViewKey`] belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ViewFamily {
    /// Segment average wire per sector and superlayer.
    AvgWire,
    /// Segment average wire per superlayer, all sectors.
    AvgWireSummed,
    /// Hit wire per sector, superlayer and layer.
    WireInLayer,
    /// Global layer vs wire, low wires, per sector.
    LayerVsWireLeft,
    /// Global layer vs wire, high wires, per sector.
    LayerVsWireRight,
    /// Low-wire layer view restricted to one superlayer.
    LayerVsWireLeftSuperlayer,
    /// High-wire layer view restricted to one superlayer.
    LayerVsWireRightSuperlayer,
    /// Same domain as the high-wire superlayer view, kept under its own name.
    LayerVsWireOneSuperlayer,
}

impl ViewFamily {
    pub const ALL: [ViewFamily; 8] = [
        ViewFamily::AvgWire,
        ViewFamily::AvgWireSummed,
        ViewFamily::WireInLayer,
        ViewFamily::LayerVsWireLeft,
        ViewFamily::LayerVsWireRight,
        ViewFamily::LayerVsWireLeftSuperlayer,
        ViewFamily::LayerVsWireRightSuperlayer,
        ViewFamily::LayerVsWireOneSuperlayer,
    ];

    /// Name prefix used in output containers.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            ViewFamily::AvgWire => "avgWire",
            ViewFamily::AvgWireSummed => "avgWireSummed",
            ViewFamily::WireInLayer => "wireINlayer",
            ViewFamily::LayerVsWireLeft => "layVScomp_left",
            ViewFamily::LayerVsWireRight => "layVScomp_right",
            ViewFamily::LayerVsWireLeftSuperlayer => "layVScomp_leftSL",
            ViewFamily::LayerVsWireRightSuperlayer => "layVScomp_rightSL",
            ViewFamily::LayerVsWireOneSuperlayer => "layVScomp_oneSupLay",
        }
    }

    /// Number of counters in the family.
    #[must_use]
    pub fn counter_count(self) -> usize {
        match self {
            ViewFamily::AvgWireSummed => N_SUPERLAYERS,
            ViewFamily::LayerVsWireLeft | ViewFamily::LayerVsWireRight => N_SECTORS,
            ViewFamily::WireInLayer => N_SECTORS * N_SUPERLAYERS * N_LAYERS_PER_SUPERLAYER,
            ViewFamily::AvgWire
            | ViewFamily::LayerVsWireLeftSuperlayer
            | ViewFamily::LayerVsWireRightSuperlayer
            | ViewFamily::LayerVsWireOneSuperlayer => N_SECTORS * N_SUPERLAYERS,
        }
    }
}

/// Coordinate key of a single counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ViewKey {
    AvgWire(SuperlayerAddress),
    AvgWireSummed { superlayer: u8 },
    WireInLayer(LayerAddress),
    LayerVsWireLeft { sector: u8 },
    LayerVsWireRight { sector: u8 },
    LayerVsWireLeftSuperlayer(SuperlayerAddress),
    LayerVsWireRightSuperlayer(SuperlayerAddress),
    LayerVsWireOneSuperlayer(SuperlayerAddress),
}

impl ViewKey {
    /// Every key of the registry, family by family.
    #[must_use]
    pub fn all() -> Vec<ViewKey> {
        let capacity = ViewFamily::ALL.iter().map(|f| f.counter_count()).sum();
        let mut keys = Vec::with_capacity(capacity);
        for family in ViewFamily::ALL {
            keys.extend(Self::family_keys(family));
        }
        keys
    }

    /// Keys of one family in coordinate order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn family_keys(family: ViewFamily) -> impl Iterator<Item = ViewKey> {
        let sectors = 0..N_SECTORS as u8;
        let superlayers = 0..N_SUPERLAYERS as u8;
        let superlayer_addresses: Vec<SuperlayerAddress> = sectors
            .clone()
            .flat_map(|sector| {
                superlayers
                    .clone()
                    .map(move |superlayer| SuperlayerAddress { sector, superlayer })
            })
            .collect();

        let keys: Vec<ViewKey> = match family {
            ViewFamily::AvgWire => superlayer_addresses
                .into_iter()
                .map(ViewKey::AvgWire)
                .collect(),
            ViewFamily::AvgWireSummed => superlayers
                .map(|superlayer| ViewKey::AvgWireSummed { superlayer })
                .collect(),
            ViewFamily::WireInLayer => superlayer_addresses
                .into_iter()
                .flat_map(|sl| {
                    (0..N_LAYERS_PER_SUPERLAYER as u8).map(move |layer| {
                        ViewKey::WireInLayer(LayerAddress {
                            sector: sl.sector,
                            superlayer: sl.superlayer,
                            layer,
                        })
                    })
                })
                .collect(),
            ViewFamily::LayerVsWireLeft => sectors
                .map(|sector| ViewKey::LayerVsWireLeft { sector })
                .collect(),
            ViewFamily::LayerVsWireRight => sectors
                .map(|sector| ViewKey::LayerVsWireRight { sector })
                .collect(),
            ViewFamily::LayerVsWireLeftSuperlayer => superlayer_addresses
                .into_iter()
                .map(ViewKey::LayerVsWireLeftSuperlayer)
                .collect(),
            ViewFamily::LayerVsWireRightSuperlayer => superlayer_addresses
                .into_iter()
                .map(ViewKey::LayerVsWireRightSuperlayer)
                .collect(),
            ViewFamily::LayerVsWireOneSuperlayer => superlayer_addresses
                .into_iter()
                .map(ViewKey::LayerVsWireOneSuperlayer)
                .collect(),
        };
        keys.into_iter()
    }

    /// Family this key belongs to.
    #[must_use]
    pub fn family(&self) -> ViewFamily {
        match self {
            ViewKey::AvgWire(_) => ViewFamily::AvgWire,
            ViewKey::AvgWireSummed { .. } => ViewFamily::AvgWireSummed,
            ViewKey::WireInLayer(_) => ViewFamily::WireInLayer,
            ViewKey::LayerVsWireLeft { .. } => ViewFamily::LayerVsWireLeft,
            ViewKey::LayerVsWireRight { .. } => ViewFamily::LayerVsWireRight,
            ViewKey::LayerVsWireLeftSuperlayer(_) => ViewFamily::LayerVsWireLeftSuperlayer,
            ViewKey::LayerVsWireRightSuperlayer(_) => ViewFamily::LayerVsWireRightSuperlayer,
            ViewKey::LayerVsWireOneSuperlayer(_) => ViewFamily::LayerVsWireOneSuperlayer,
        }
    }

    /// Stable output name, e.g. `avgWire_S0_SL3`.
    #[must_use]
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Allocates an empty counter with this view's binning.
    #[must_use]
    pub fn allocate(&self) -> Counter {
        let wire = Axis::new(N_WIRES, WIRE_RANGE.0, WIRE_RANGE.1);
        let wire_left = Axis::new(N_WIRE_BINS_LEFT, WIRE_RANGE_LEFT.0, WIRE_RANGE_LEFT.1);
        let wire_right = Axis::new(N_WIRE_BINS_RIGHT, WIRE_RANGE_RIGHT.0, WIRE_RANGE_RIGHT.1);
        let layers = Axis::new(N_GLOBAL_LAYERS, LAYER_RANGE.0, LAYER_RANGE.1);
        let superlayer_layers = |superlayer: u8| {
            let (min, max) = superlayer_layer_range(superlayer);
            Axis::new(N_LAYER_BINS_SUPERLAYER, min, max)
        };

        match *self {
            ViewKey::AvgWire(_) | ViewKey::AvgWireSummed { .. } | ViewKey::WireInLayer(_) => {
                Counter::OneD(Histogram1D::new(wire))
            }
            ViewKey::LayerVsWireLeft { .. } => Counter::TwoD(Histogram2D::new(wire_left, layers)),
            ViewKey::LayerVsWireRight { .. } => {
                Counter::TwoD(Histogram2D::new(wire_right, layers))
            }
            ViewKey::LayerVsWireLeftSuperlayer(sl) => Counter::TwoD(Histogram2D::new(
                wire_left,
                superlayer_layers(sl.superlayer),
            )),
            ViewKey::LayerVsWireRightSuperlayer(sl) | ViewKey::LayerVsWireOneSuperlayer(sl) => {
                Counter::TwoD(Histogram2D::new(
                    wire_right,
                    superlayer_layers(sl.superlayer),
                ))
            }
        }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.family().prefix();
        match self {
            ViewKey::AvgWire(sl)
            | ViewKey::LayerVsWireLeftSuperlayer(sl)
            | ViewKey::LayerVsWireRightSuperlayer(sl)
            | ViewKey::LayerVsWireOneSuperlayer(sl) => {
                write!(f, "{prefix}_S{}_SL{}", sl.sector, sl.superlayer)
            }
            ViewKey::AvgWireSummed { superlayer } => write!(f, "{prefix}_SL{superlayer}"),
            ViewKey::WireInLayer(addr) => write!(
                f,
                "{prefix}_S{}_SL{}_L{}",
                addr.sector, addr.superlayer, addr.layer
            ),
            ViewKey::LayerVsWireLeft { sector } | ViewKey::LayerVsWireRight { sector } => {
                write!(f, "{prefix}_S{sector}")
            }
        }
    }
}
