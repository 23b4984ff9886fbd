//! Automatic anchor placement for magnetic lasso tracing.
//!
//! Four behaviors, picked at runtime by [`Variation`]:
//! - **Classic**: anchors only come from explicit user action
//! - **Auto distance/time**: anchor after enough travel, or after a pause
//!   with some movement
//! - **Elastic**: distance anchors whose strength ramps up with age; the
//!   newest anchors stay soft until they pass the lock threshold
//! - **Predictive**: anchor when the pointer heading becomes erratic

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use super::session::Anchor;
use crate::error::{SelectionError, SelectionResult};
use crate::filters::edge::EdgeField;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variation {
    #[default]
    Classic,
    AutoDistance,
    Elastic,
    Predictive,
}

impl Variation {
    pub fn as_str(self) -> &'static str {
        match self {
            Variation::Classic => "classic",
            Variation::AutoDistance => "auto-distance",
            Variation::Elastic => "elastic",
            Variation::Predictive => "predictive",
        }
    }
}

impl FromStr for Variation {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "classic" => Ok(Variation::Classic),
            "auto-distance" | "auto-time" | "auto" => Ok(Variation::AutoDistance),
            "elastic" => Ok(Variation::Elastic),
            "predictive" => Ok(Variation::Predictive),
            _ => Err(SelectionError::UnknownVariation(s.to_string())),
        }
    }
}

/// Strength ramp across the elastic zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElasticCurve {
    Linear,
    Quadratic,
    #[default]
    EaseInOut,
}

impl ElasticCurve {
    /// Map `t` in 0..=1 to a strength in 0..=1.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            ElasticCurve::Linear => t,
            ElasticCurve::Quadratic => t * t,
            ElasticCurve::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - 2.0 * (1.0 - t) * (1.0 - t)
                }
            }
        }
    }
}

impl FromStr for ElasticCurve {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "linear" => Ok(ElasticCurve::Linear),
            "quadratic" => Ok(ElasticCurve::Quadratic),
            "ease-in-out" | "easeinout" => Ok(ElasticCurve::EaseInOut),
            _ => Err(SelectionError::UnknownCurve(s.to_string())),
        }
    }
}

// ============================================================================
// Policy parameters
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoDistancePolicy {
    pub distance_threshold: f64,
    pub time_threshold_ms: u64,
    /// Movement required before a time-triggered anchor
    pub min_movement: f64,
    /// Divides both thresholds; higher places anchors more often
    pub frequency_scale: f64,
}

impl Default for AutoDistancePolicy {
    fn default() -> Self {
        Self {
            distance_threshold: 40.0,
            time_threshold_ms: 600,
            min_movement: 8.0,
            frequency_scale: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticPolicy {
    pub distance_threshold: f64,
    /// Number of most recent anchors whose strength is recomputed
    pub zone_size: usize,
    pub curve: ElasticCurve,
    pub lock_threshold: f32,
}

impl Default for ElasticPolicy {
    fn default() -> Self {
        Self {
            distance_threshold: 40.0,
            zone_size: 4,
            curve: ElasticCurve::EaseInOut,
            lock_threshold: 0.8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictivePolicy {
    pub distance_threshold: f64,
    pub confidence_threshold: f64,
    /// Turn-angle variance (rad²) that maps to zero confidence
    pub max_variance: f64,
    /// Minimum distance from the last anchor for a low-confidence anchor
    pub min_spacing: f64,
    /// Number of recent cursor samples analyzed
    pub window: usize,
}

impl Default for PredictivePolicy {
    fn default() -> Self {
        Self {
            distance_threshold: 60.0,
            confidence_threshold: 0.55,
            max_variance: 0.5,
            min_spacing: 12.0,
            window: 8,
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Session state visible to a policy during one update.
pub struct PolicyContext<'a> {
    /// Candidate anchor position (end of the current preview path)
    pub point: Point,
    pub timestamp: u64,
    pub last_anchor: &'a Anchor,
    /// Recent stabilized cursor positions, oldest first
    pub history: &'a VecDeque<Point>,
    pub edges: &'a EdgeField,
    pub quality_radius: u32,
}

impl PolicyContext<'_> {
    fn travel(&self) -> f64 {
        self.point.distance_to(&self.last_anchor.point)
    }

    fn anchor(&self, strength: f32, locked: bool) -> Anchor {
        let (x, y) = self.point.rounded();
        let quality = self.edges.local_quality(x, y, self.quality_radius) / self.edges.max_strength();
        Anchor {
            point: self.point,
            strength,
            locked,
            edge_quality: quality.min(1.0),
            timestamp: self.timestamp,
        }
    }
}

/// Auto-anchor behavior with its parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variation", rename_all = "kebab-case")]
pub enum AnchorPolicy {
    #[default]
    Classic,
    AutoDistance(AutoDistancePolicy),
    Elastic(ElasticPolicy),
    Predictive(PredictivePolicy),
}

impl From<Variation> for AnchorPolicy {
    fn from(variation: Variation) -> Self {
        match variation {
            Variation::Classic => AnchorPolicy::Classic,
            Variation::AutoDistance => AnchorPolicy::AutoDistance(AutoDistancePolicy::default()),
            Variation::Elastic => AnchorPolicy::Elastic(ElasticPolicy::default()),
            Variation::Predictive => AnchorPolicy::Predictive(PredictivePolicy::default()),
        }
    }
}

impl AnchorPolicy {
    pub fn variation(&self) -> Variation {
        match self {
            AnchorPolicy::Classic => Variation::Classic,
            AnchorPolicy::AutoDistance(_) => Variation::AutoDistance,
            AnchorPolicy::Elastic(_) => Variation::Elastic,
            AnchorPolicy::Predictive(_) => Variation::Predictive,
        }
    }

    pub fn validate(&self) -> SelectionResult<()> {
        let invalid = |msg: String| -> SelectionResult<()> { Err(SelectionError::InvalidParameters(msg)) };
        match self {
            AnchorPolicy::Classic => Ok(()),
            AnchorPolicy::AutoDistance(p) => {
                if !(p.frequency_scale.is_finite() && p.frequency_scale > 0.0) {
                    return invalid(format!("frequency_scale must be positive, got {}", p.frequency_scale));
                }
                if !(p.distance_threshold > 0.0) || p.min_movement < 0.0 {
                    return invalid("auto-distance thresholds must be positive".to_string());
                }
                Ok(())
            }
            AnchorPolicy::Elastic(p) => {
                if !(p.distance_threshold > 0.0) || p.zone_size == 0 {
                    return invalid("elastic distance and zone size must be positive".to_string());
                }
                if !(0.0..=1.0).contains(&p.lock_threshold) {
                    return invalid(format!("lock_threshold must be in 0..=1, got {}", p.lock_threshold));
                }
                Ok(())
            }
            AnchorPolicy::Predictive(p) => {
                if !(p.distance_threshold > 0.0) || !(p.max_variance > 0.0) || p.window < 3 {
                    return invalid(
                        "predictive distance and variance must be positive, window at least 3".to_string(),
                    );
                }
                Ok(())
            }
        }
    }

    /// Decide whether to drop an anchor at `ctx.point`.
    pub fn evaluate(&self, ctx: &PolicyContext) -> Option<Anchor> {
        let travel = ctx.travel();
        match self {
            AnchorPolicy::Classic => None,
            AnchorPolicy::AutoDistance(p) => {
                let elapsed = ctx.timestamp.saturating_sub(ctx.last_anchor.timestamp) as f64;
                let by_distance = travel >= p.distance_threshold / p.frequency_scale;
                let by_time = elapsed >= p.time_threshold_ms as f64 / p.frequency_scale
                    && travel >= p.min_movement;
                (by_distance || by_time).then(|| ctx.anchor(1.0, true))
            }
            AnchorPolicy::Elastic(p) => {
                (travel >= p.distance_threshold).then(|| ctx.anchor(0.0, false))
            }
            AnchorPolicy::Predictive(p) => {
                let confidence = heading_confidence(ctx.history, p.window, p.max_variance);
                let erratic = confidence < p.confidence_threshold && travel >= p.min_spacing;
                (erratic || travel >= p.distance_threshold).then(|| ctx.anchor(1.0, true))
            }
        }
    }

    /// Heading confidence for policies that track it.
    pub fn confidence(&self, history: &VecDeque<Point>) -> Option<f64> {
        match self {
            AnchorPolicy::Predictive(p) => Some(heading_confidence(history, p.window, p.max_variance)),
            _ => None,
        }
    }

    /// Recompute strengths across the elastic zone after an anchor change.
    ///
    /// The newest anchor in the zone is the softest; anchors older than the
    /// zone are at full strength. A locked anchor never unlocks.
    pub fn rebalance(&self, anchors: &mut [Anchor]) {
        let AnchorPolicy::Elastic(p) = self else {
            return;
        };
        // The session's first anchor is fixed
        let Some((_, rest)) = anchors.split_first_mut() else {
            return;
        };
        let zone = p.zone_size as f64;
        for (age, anchor) in rest.iter_mut().rev().enumerate() {
            let t = (age as f64 + 1.0) / zone;
            let strength = p.curve.apply(t) as f32;
            anchor.strength = if anchor.locked {
                anchor.strength.max(strength)
            } else {
                strength
            };
            if anchor.strength >= p.lock_threshold {
                anchor.locked = true;
            }
        }
    }
}

/// Steadiness of the recent pointer heading.
///
/// Computes the variance of turn angles between consecutive moves over the
/// last `window` samples and maps it to `1 - variance / max_variance`,
/// clamped to 0..=1. Too few moves count as fully steady.
pub fn heading_confidence(history: &VecDeque<Point>, window: usize, max_variance: f64) -> f64 {
    let skip = history.len().saturating_sub(window);
    let recent: Vec<&Point> = history.iter().skip(skip).collect();

    let headings: Vec<f64> = recent
        .windows(2)
        .filter_map(|w| {
            let dx = w[1].x - w[0].x;
            let dy = w[1].y - w[0].y;
            (dx * dx + dy * dy > 1e-12).then(|| dy.atan2(dx))
        })
        .collect();
    let turns: Vec<f64> = headings
        .windows(2)
        .map(|w| {
            let mut d = w[1] - w[0];
            if d > PI {
                d -= 2.0 * PI;
            } else if d < -PI {
                d += 2.0 * PI;
            }
            d
        })
        .collect();
    if turns.len() < 2 || max_variance <= 0.0 {
        return 1.0;
    }

    let n = turns.len() as f64;
    let mean = turns.iter().sum::<f64>() / n;
    let variance = turns.iter().map(|t| (t - mean) * (t - mean)).sum::<f64>() / n;
    (1.0 - variance / max_variance).clamp(0.0, 1.0)
}
