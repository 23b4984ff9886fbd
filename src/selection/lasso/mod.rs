//! Magnetic lasso: edge-snapping boundary tracing.
//!
//! - [`geometry`]: points and polyline helpers
//! - [`cost`]: per-move cost over an edge field
//! - [`search`]: Dijkstra/A* with straight-line fallback
//! - [`cursor`]: lazy cursor stabilization
//! - [`policy`]: automatic anchor placement
//! - [`session`]: the tracing state machine

pub mod cost;
pub mod cursor;
pub mod geometry;
pub mod policy;
pub mod search;
pub mod session;

pub use cost::{CostWeights, PathCostModel};
pub use cursor::CursorStabilizer;
pub use geometry::{bresenham_line, path_length, simplify_path, smooth_path, Point};
pub use policy::{AnchorPolicy, ElasticCurve, Variation};
pub use search::{GraphSearchEngine, SearchAlgorithm, SearchOptions, SearchOutcome};
pub use session::{Anchor, LassoMetrics, LassoOptions, LassoSession, LassoState};
