//! Filters feeding the selection engines.
//!
//! ## Architecture
//!
//! - **Single-channel float planes** - luminance is computed once and kept
//!   as `Array2<f32>` (height, width)
//! - **Thread-safe** - row-parallel passes with rayon; each output row is
//!   written by one task, so results do not depend on scheduling
//!
//! ## Modules
//!
//! - **core**: Gaussian kernels and separable blur
//! - **edge**: gradient operators and the edge field used by the lasso

pub mod core;
pub mod edge;

pub use edge::{build_edge_field, EdgeField, EdgeFieldBuilder, EdgeKernel, EdgeOptions};
