//! Per-move cost for magnetic lasso search.
//!
//! A move onto pixel `t` costs
//!
//! ```text
//! (step_length * distance_weight
//!     + edge_cost(t) / max_strength * edge_weight
//!     + turn_angle / π * direction_weight) * cursor_factor(t)
//! ```
//!
//! where `cursor_factor` drops linearly from `1 - cursor_influence` on the
//! pointer trail to 1 at [`CURSOR_FALLOFF`] pixels away.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use crate::error::{SelectionError, SelectionResult};
use crate::filters::edge::EdgeField;

/// Distance (px) at which the pointer trail stops discounting moves
pub const CURSOR_FALLOFF: f64 = 10.0;

/// Relative weights of the cost terms.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub edge_weight: f64,
    pub distance_weight: f64,
    pub direction_weight: f64,
    /// Maximum discount (0..1) for moves right on the pointer trail
    pub cursor_influence: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            edge_weight: 1.0,
            distance_weight: 0.1,
            direction_weight: 0.2,
            cursor_influence: 0.5,
        }
    }
}

impl CostWeights {
    pub fn validate(&self) -> SelectionResult<()> {
        let weights = [
            ("edge_weight", self.edge_weight),
            ("distance_weight", self.distance_weight),
            ("direction_weight", self.direction_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(SelectionError::InvalidParameters(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.cursor_influence) {
            return Err(SelectionError::InvalidParameters(format!(
                "cursor_influence must be in 0..=1, got {}",
                self.cursor_influence
            )));
        }
        Ok(())
    }

    /// Lower bound on the cost of covering `distance` pixels.
    ///
    /// Each move costs at least its length times `distance_weight`, scaled by
    /// the largest possible cursor discount.
    #[inline]
    pub fn heuristic_scale(&self) -> f64 {
        self.distance_weight * (1.0 - self.cursor_influence)
    }
}

/// Cost model bound to one edge field and one pointer trail.
///
/// Built fresh for every search; the trail lookup is memoized per node for
/// the lifetime of the model.
pub struct PathCostModel<'a> {
    edges: &'a EdgeField,
    weights: CostWeights,
    trail: &'a [Point],
    cursor_cache: HashMap<(i64, i64), f64>,
}

impl<'a> PathCostModel<'a> {
    pub fn new(edges: &'a EdgeField, weights: CostWeights, trail: &'a [Point]) -> Self {
        Self {
            edges,
            weights,
            trail,
            cursor_cache: HashMap::new(),
        }
    }

    pub fn weights(&self) -> &CostWeights {
        &self.weights
    }

    /// Cost of moving from `from` to the adjacent pixel `to`.
    ///
    /// # Arguments
    /// * `from` - Current pixel
    /// * `to` - Neighbor pixel (one step away)
    /// * `incoming` - Move (dx, dy) that reached `from`, if any
    pub fn step_cost(&mut self, from: (i64, i64), to: (i64, i64), incoming: Option<(i64, i64)>) -> f64 {
        let step = (to.0 - from.0, to.1 - from.1);
        let length = if step.0 != 0 && step.1 != 0 {
            std::f64::consts::SQRT_2
        } else {
            1.0
        };

        let edge_term = (self.edges.cost(to.0, to.1) / self.edges.max_strength()) as f64;
        let turn = incoming.map_or(0.0, |prev| turn_angle(prev, step) / PI);

        let raw = length * self.weights.distance_weight
            + edge_term * self.weights.edge_weight
            + turn * self.weights.direction_weight;
        raw * self.cursor_factor(to)
    }

    /// Multiplier in `[1 - cursor_influence, 1]` for pixels near the trail.
    pub fn cursor_factor(&mut self, p: (i64, i64)) -> f64 {
        if self.trail.is_empty() || self.weights.cursor_influence <= 0.0 {
            return 1.0;
        }
        if let Some(&cached) = self.cursor_cache.get(&p) {
            return cached;
        }
        let point = Point::new(p.0 as f64, p.1 as f64);
        let nearest = self
            .trail
            .iter()
            .map(|t| t.distance_to(&point))
            .fold(f64::INFINITY, f64::min);
        let factor = if nearest < CURSOR_FALLOFF {
            1.0 - self.weights.cursor_influence * (1.0 - nearest / CURSOR_FALLOFF)
        } else {
            1.0
        };
        self.cursor_cache.insert(p, factor);
        factor
    }
}

/// Absolute angle (0..=π) between two move vectors.
fn turn_angle(a: (i64, i64), b: (i64, i64)) -> f64 {
    let ta = (a.1 as f64).atan2(a.0 as f64);
    let tb = (b.1 as f64).atan2(b.0 as f64);
    let mut diff = (tb - ta).abs();
    if diff > PI {
        diff = 2.0 * PI - diff;
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn weights(edge: f64, distance: f64, direction: f64, cursor: f64) -> CostWeights {
        CostWeights {
            edge_weight: edge,
            distance_weight: distance,
            direction_weight: direction,
            cursor_influence: cursor,
        }
    }

    #[test]
    fn test_base_step_lengths() {
        let edges = EdgeField::flat(10, 10, 255.0);
        let mut model = PathCostModel::new(&edges, weights(0.0, 1.0, 0.0, 0.0), &[]);
        assert!((model.step_cost((1, 1), (2, 1), None) - 1.0).abs() < 1e-9);
        assert!((model.step_cost((1, 1), (2, 2), None) - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_strong_edges_are_cheap() {
        let mut magnitude = Array2::<f32>::zeros((5, 5));
        magnitude[[2, 3]] = 255.0;
        let edges = EdgeField::from_parts(magnitude, Array2::zeros((5, 5)), 255.0).unwrap();
        let mut model = PathCostModel::new(&edges, weights(1.0, 0.0, 0.0, 0.0), &[]);
        assert!(model.step_cost((2, 2), (3, 2), None).abs() < 1e-9);
        assert!((model.step_cost((2, 2), (1, 2), None) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_direction_penalty() {
        let edges = EdgeField::flat(10, 10, 255.0);
        let mut model = PathCostModel::new(&edges, weights(0.0, 0.0, 1.0, 0.0), &[]);
        assert!(model.step_cost((2, 2), (3, 2), Some((1, 0))).abs() < 1e-9);
        assert!((model.step_cost((2, 2), (2, 3), Some((1, 0))) - 0.5).abs() < 1e-9);
        assert!((model.step_cost((2, 2), (1, 2), Some((1, 0))) - 1.0).abs() < 1e-9);
        // Wrap-around: -135° to 135° is a 90° turn
        assert!((model.step_cost((2, 2), (1, 3), Some((-1, -1))) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cursor_factor_falloff() {
        let edges = EdgeField::flat(40, 40, 255.0);
        let trail = [Point::new(10.0, 10.0)];
        let mut model = PathCostModel::new(&edges, weights(1.0, 0.0, 0.0, 0.5), &trail);
        assert!((model.cursor_factor((10, 10)) - 0.5).abs() < 1e-9);
        assert!((model.cursor_factor((15, 10)) - 0.75).abs() < 1e-9);
        assert!((model.cursor_factor((20, 10)) - 1.0).abs() < 1e-9);
        assert!((model.cursor_factor((30, 30)) - 1.0).abs() < 1e-9);
        // Cached value is returned unchanged
        assert!((model.cursor_factor((15, 10)) - 0.75).abs() < 1e-9);
        assert!((model.step_cost((9, 10), (10, 10), None) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_validate() {
        assert!(CostWeights::default().validate().is_ok());
        assert!(weights(-1.0, 0.1, 0.2, 0.5).validate().is_err());
        assert!(weights(1.0, f64::NAN, 0.2, 0.5).validate().is_err());
        assert!(weights(1.0, 0.1, 0.2, 1.5).validate().is_err());
        assert!((CostWeights::default().heuristic_scale() - 0.05).abs() < 1e-12);
    }
}
