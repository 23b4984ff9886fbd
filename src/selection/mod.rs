//! Interactive selection engines.
//!
//! - **Magic wand**: budgeted flood fill by RGB tolerance
//! - **Transition**: cross-fade between successive hover masks
//! - **Lasso**: edge-snapping boundary tracing
//!
//! All engines read a borrowed [`PixelField`] and own their working buffers.

pub mod lasso;
pub mod magic_wand;
pub mod pixel_field;
pub mod transition;

pub use magic_wand::{
    magic_wand_select, magic_wand_select_detailed, Connectivity, ExpansionShape, MagicWandOptions,
    MagicWandResult, RegionGrowthEngine,
};
pub use pixel_field::PixelField;
pub use transition::MaskTransitionBlender;
