//! Grammars built from other grammars.

mod multiplex;
mod overlay;

pub use multiplex::{ActiveRegion, Multiplex, MultiplexState, Region, RegionClose, RegionOpen};
pub use overlay::{Overlay, OverlayState};
