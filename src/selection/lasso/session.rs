//! Magnetic lasso session.
//!
//! State machine driving one lasso trace:
//!
//! ```text
//! Idle --start--> Tracing --complete--> Completed
//!                    |
//!                    +----cancel-----> Cancelled
//! ```
//!
//! While tracing, every pointer update stabilizes the pointer, searches a
//! preview path from the last anchor to it, and lets the configured
//! [`AnchorPolicy`] decide whether to commit the preview behind a new anchor.

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use super::cursor::CursorStabilizer;
use super::geometry::{append_segment, simplify_path, smooth_path, Point};
use super::policy::{AnchorPolicy, PolicyContext, Variation};
use super::search::{GraphSearchEngine, SearchOptions, SearchOutcome};
use crate::error::{SelectionError, SelectionResult};
use crate::filters::edge::{EdgeField, EdgeFieldBuilder, EdgeOptions};
use crate::selection::pixel_field::PixelField;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LassoState {
    Idle,
    Tracing,
    Completed,
    Cancelled,
}

impl LassoState {
    pub fn as_str(self) -> &'static str {
        match self {
            LassoState::Idle => "idle",
            LassoState::Tracing => "tracing",
            LassoState::Completed => "completed",
            LassoState::Cancelled => "cancelled",
        }
    }
}

/// A committed point the lasso boundary passes through.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub point: Point,
    /// 0..=1; below 1 only for elastic anchors that are still settling
    pub strength: f32,
    pub locked: bool,
    /// Normalized average edge magnitude around the anchor
    pub edge_quality: f32,
    /// Caller-supplied event time in milliseconds
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LassoOptions {
    pub edge: EdgeOptions,
    pub search: SearchOptions,
    pub policy: AnchorPolicy,
    pub dead_zone_radius: f64,
    pub smoothing_factor: f64,
    /// Number of stabilized cursor positions kept as the search trail
    pub path_memory: usize,
    pub simplify_epsilon: f64,
    pub smooth_iterations: usize,
    pub smooth_factor: f64,
    /// A path ending this close to its start counts as already closed
    pub close_threshold: f64,
    /// Window radius for anchor edge quality
    pub quality_radius: u32,
}

impl Default for LassoOptions {
    fn default() -> Self {
        Self {
            edge: EdgeOptions::default(),
            search: SearchOptions::default(),
            policy: AnchorPolicy::Classic,
            dead_zone_radius: 6.0,
            smoothing_factor: 0.35,
            path_memory: 32,
            simplify_epsilon: 1.0,
            smooth_iterations: 2,
            smooth_factor: 0.5,
            close_threshold: 3.0,
            quality_radius: 2,
        }
    }
}

impl LassoOptions {
    pub fn with_variation(mut self, variation: Variation) -> Self {
        self.policy = AnchorPolicy::from(variation);
        self
    }

    pub fn with_policy(mut self, policy: AnchorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_edge(mut self, edge: EdgeOptions) -> Self {
        self.edge = edge;
        self
    }

    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    pub fn with_stabilizer(mut self, dead_zone_radius: f64, smoothing_factor: f64) -> Self {
        self.dead_zone_radius = dead_zone_radius;
        self.smoothing_factor = smoothing_factor;
        self
    }

    pub fn variation(&self) -> Variation {
        self.policy.variation()
    }

    pub fn validate(&self) -> SelectionResult<()> {
        self.edge.validate()?;
        self.search.validate()?;
        self.policy.validate()?;
        if !(self.dead_zone_radius.is_finite() && self.dead_zone_radius >= 0.0) {
            return Err(SelectionError::InvalidParameters(format!(
                "dead_zone_radius must be non-negative, got {}",
                self.dead_zone_radius
            )));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(SelectionError::InvalidParameters(format!(
                "smoothing_factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.smooth_factor) {
            return Err(SelectionError::InvalidParameters(format!(
                "smooth_factor must be in 0..=1, got {}",
                self.smooth_factor
            )));
        }
        if self.path_memory == 0 {
            return Err(SelectionError::InvalidParameters(
                "path_memory must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read-only telemetry for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LassoMetrics {
    pub anchor_count: usize,
    /// Duration of the last preview search
    pub path_compute_ms: f64,
    /// Smoothed update rate derived from event timestamps
    pub fps: f64,
    /// Heading confidence (predictive variation only)
    pub prediction_confidence: f64,
    pub last_edge_quality: f32,
    /// Committed segments that used the straight-line fallback
    pub fallback_segments: usize,
}

pub struct LassoSession {
    options: LassoOptions,
    edges: EdgeField,
    search: GraphSearchEngine,
    cursor: CursorStabilizer,
    state: LassoState,
    anchors: Vec<Anchor>,
    // committed path length right after each anchor
    segment_ends: Vec<usize>,
    committed: Vec<Point>,
    preview: Vec<Point>,
    preview_found: bool,
    history: VecDeque<Point>,
    last_timestamp: Option<u64>,
    metrics: LassoMetrics,
    final_path: Vec<Point>,
}

impl LassoSession {
    /// Build the edge field for `field` and create an idle session.
    pub fn new(field: &PixelField, options: LassoOptions) -> SelectionResult<Self> {
        options.validate()?;
        let edges = EdgeFieldBuilder::new(options.edge.clone())?.build(field);
        Self::with_edge_field(edges, options)
    }

    /// Create an idle session over a precomputed edge field.
    pub fn with_edge_field(edges: EdgeField, options: LassoOptions) -> SelectionResult<Self> {
        options.validate()?;
        let search = GraphSearchEngine::new(options.search)?;
        let cursor = CursorStabilizer::new(options.dead_zone_radius, options.smoothing_factor);
        let history = VecDeque::with_capacity(options.path_memory);
        Ok(Self {
            options,
            edges,
            search,
            cursor,
            state: LassoState::Idle,
            anchors: Vec::new(),
            segment_ends: Vec::new(),
            committed: Vec::new(),
            preview: Vec::new(),
            preview_found: true,
            history,
            last_timestamp: None,
            metrics: LassoMetrics::default(),
            final_path: Vec::new(),
        })
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Begin tracing at `point`.
    pub fn start(&mut self, point: Point, timestamp: u64) -> SelectionResult<()> {
        self.expect_state(LassoState::Idle, "start")?;
        let point = self.clamp_point(point);

        self.clear_trace();
        self.cursor.reset(point);
        self.history.push_back(point);
        self.last_timestamp = Some(timestamp);

        let anchor = Anchor {
            point,
            strength: 1.0,
            locked: true,
            edge_quality: self.edge_quality(point),
            timestamp,
        };
        self.metrics.last_edge_quality = anchor.edge_quality;
        self.anchors.push(anchor);
        self.committed.push(point);
        self.segment_ends.push(self.committed.len());
        self.preview.push(point);
        self.metrics.anchor_count = 1;
        self.state = LassoState::Tracing;

        debug!(
            "lasso: start at ({}, {}), variation {}",
            point.x,
            point.y,
            self.options.variation().as_str()
        );
        Ok(())
    }

    /// Feed a pointer event and return the refreshed preview path.
    pub fn update(&mut self, pointer: Point, timestamp: u64) -> SelectionResult<&[Point]> {
        self.expect_state(LassoState::Tracing, "update")?;
        let pointer = self.clamp_point(pointer);
        let target = self.cursor.update(pointer);

        self.history.push_back(target);
        while self.history.len() > self.options.path_memory {
            self.history.pop_front();
        }
        self.track_rate(timestamp);

        let from = self.last_anchor().point;
        let (outcome, elapsed_ms) = self.search_with_trail(from, target);
        self.metrics.path_compute_ms = elapsed_ms;
        self.preview_found = outcome.found;
        self.preview = outcome.points;

        self.metrics.prediction_confidence = self.options.policy.confidence(&self.history).unwrap_or(0.0);

        let candidate = self.preview.last().copied().unwrap_or(target);
        let placed = {
            let ctx = PolicyContext {
                point: candidate,
                timestamp,
                last_anchor: self.last_anchor(),
                history: &self.history,
                edges: &self.edges,
                quality_radius: self.options.quality_radius,
            };
            self.options.policy.evaluate(&ctx)
        };
        if let Some(anchor) = placed {
            self.commit_preview(anchor);
        }

        Ok(self.preview.as_slice())
    }

    /// Anchor explicitly at `point`, committing the path to it.
    pub fn add_anchor(&mut self, point: Point, timestamp: u64) -> SelectionResult<()> {
        self.expect_state(LassoState::Tracing, "add anchor")?;
        let point = self.clamp_point(point);
        let from = self.last_anchor().point;
        let (outcome, elapsed_ms) = self.search_with_trail(from, point);
        self.metrics.path_compute_ms = elapsed_ms;
        self.preview_found = outcome.found;
        self.preview = outcome.points;

        let end = self.preview.last().copied().unwrap_or(point);
        let anchor = Anchor {
            point: end,
            strength: 1.0,
            locked: true,
            edge_quality: self.edge_quality(end),
            timestamp,
        };
        self.commit_preview(anchor);
        Ok(())
    }

    /// Retract the newest anchor and the path committed behind it.
    ///
    /// The first anchor cannot be removed; returns false in that case.
    pub fn remove_last_anchor(&mut self) -> SelectionResult<bool> {
        self.expect_state(LassoState::Tracing, "remove anchor")?;
        if self.anchors.len() <= 1 {
            return Ok(false);
        }
        self.anchors.pop();
        self.segment_ends.pop();
        let keep = self.segment_ends.last().copied().unwrap_or(1);
        self.committed.truncate(keep);
        self.options.policy.rebalance(&mut self.anchors);
        self.metrics.anchor_count = self.anchors.len();

        let from = self.last_anchor().point;
        let target = self.cursor.inner();
        let (outcome, _) = self.search_with_trail(from, target);
        self.preview_found = outcome.found;
        self.preview = outcome.points;

        debug!("lasso: removed anchor, {} remain", self.anchors.len());
        Ok(true)
    }

    /// Finish the trace and return the simplified, smoothed boundary.
    ///
    /// With `close_path` the boundary is routed back to the first anchor
    /// unless it already ends within `close_threshold` of it.
    pub fn complete(&mut self, close_path: bool) -> SelectionResult<Vec<Point>> {
        self.expect_state(LassoState::Tracing, "complete")?;

        let preview = std::mem::take(&mut self.preview);
        if preview.len() > 1 && !self.preview_found {
            self.metrics.fallback_segments += 1;
        }
        append_segment(&mut self.committed, &preview);

        if close_path {
            let first = self.anchors[0].point;
            let last = self.committed.last().copied().unwrap_or(first);
            if last.distance_to(&first) > self.options.close_threshold {
                let (closing, _) = self.search_with_trail(last, first);
                if !closing.found {
                    self.metrics.fallback_segments += 1;
                }
                append_segment(&mut self.committed, &closing.points);
            }
        }

        let simplified = simplify_path(&self.committed, self.options.simplify_epsilon);
        self.final_path = smooth_path(
            &simplified,
            self.options.smooth_iterations,
            self.options.smooth_factor,
        );
        self.state = LassoState::Completed;

        debug!(
            "lasso: completed with {} anchors, {} -> {} points",
            self.anchors.len(),
            self.committed.len(),
            self.final_path.len()
        );
        Ok(self.final_path.clone())
    }

    /// Abandon the trace.
    pub fn cancel(&mut self) -> SelectionResult<()> {
        if self.state == LassoState::Completed {
            return Err(SelectionError::InvalidState {
                operation: "cancel",
                state: self.state.as_str(),
            });
        }
        self.clear_trace();
        self.state = LassoState::Cancelled;
        debug!("lasso: cancelled");
        Ok(())
    }

    /// Return to Idle keeping the edge field, so a new trace can start
    /// without rebuilding it.
    pub fn reset(&mut self) {
        self.clear_trace();
        self.state = LassoState::Idle;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> LassoState {
        self.state
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn committed_path(&self) -> &[Point] {
        &self.committed
    }

    pub fn preview_path(&self) -> &[Point] {
        &self.preview
    }

    /// Stabilized cursor position.
    pub fn cursor(&self) -> Point {
        self.cursor.inner()
    }

    /// Last raw pointer position.
    pub fn raw_cursor(&self) -> Point {
        self.cursor.outer()
    }

    pub fn cursor_history(&self) -> &VecDeque<Point> {
        &self.history
    }

    /// Final boundary, once completed.
    pub fn final_path(&self) -> Option<&[Point]> {
        (self.state == LassoState::Completed).then_some(self.final_path.as_slice())
    }

    pub fn metrics(&self) -> &LassoMetrics {
        &self.metrics
    }

    pub fn edges(&self) -> &EdgeField {
        &self.edges
    }

    pub fn options(&self) -> &LassoOptions {
        &self.options
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn expect_state(&self, expected: LassoState, operation: &'static str) -> SelectionResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SelectionError::InvalidState {
                operation,
                state: self.state.as_str(),
            })
        }
    }

    fn last_anchor(&self) -> &Anchor {
        // Tracing always holds the start anchor
        &self.anchors[self.anchors.len() - 1]
    }

    fn clamp_point(&self, point: Point) -> Point {
        let max_x = self.edges.width().saturating_sub(1) as f64;
        let max_y = self.edges.height().saturating_sub(1) as f64;
        Point::new(point.x.clamp(0.0, max_x), point.y.clamp(0.0, max_y))
    }

    fn edge_quality(&self, point: Point) -> f32 {
        let (x, y) = point.rounded();
        let quality = self.edges.local_quality(x, y, self.options.quality_radius);
        (quality / self.edges.max_strength()).min(1.0)
    }

    fn search_with_trail(&mut self, from: Point, to: Point) -> (SearchOutcome, f64) {
        let trail: &[Point] = self.history.make_contiguous();
        let search = &mut self.search;
        let edges = &self.edges;
        timed(|| search.search(edges, from, to, trail))
    }

    fn commit_preview(&mut self, anchor: Anchor) {
        if self.preview.len() > 1 && !self.preview_found {
            self.metrics.fallback_segments += 1;
        }
        append_segment(&mut self.committed, &self.preview);
        self.segment_ends.push(self.committed.len());
        self.anchors.push(anchor);
        self.options.policy.rebalance(&mut self.anchors);
        self.preview = vec![anchor.point];
        self.preview_found = true;
        self.metrics.anchor_count = self.anchors.len();
        self.metrics.last_edge_quality = anchor.edge_quality;

        debug!(
            "lasso: anchor {} at ({}, {}), strength {:.2}, quality {:.2}",
            self.anchors.len(),
            anchor.point.x,
            anchor.point.y,
            anchor.strength,
            anchor.edge_quality
        );
    }

    fn track_rate(&mut self, timestamp: u64) {
        if let Some(last) = self.last_timestamp {
            let dt = timestamp.saturating_sub(last);
            if dt > 0 {
                let instant = 1000.0 / dt as f64;
                self.metrics.fps = if self.metrics.fps == 0.0 {
                    instant
                } else {
                    0.9 * self.metrics.fps + 0.1 * instant
                };
            }
        }
        self.last_timestamp = Some(timestamp);
    }

    fn clear_trace(&mut self) {
        self.anchors.clear();
        self.segment_ends.clear();
        self.committed.clear();
        self.preview.clear();
        self.preview_found = true;
        self.history.clear();
        self.last_timestamp = None;
        self.metrics = LassoMetrics::default();
        self.final_path.clear();
    }
}

/// Run `f` and report its wall time in milliseconds.
#[cfg(not(target_arch = "wasm32"))]
fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let start = std::time::Instant::now();
    let value = f();
    (value, start.elapsed().as_secs_f64() * 1000.0)
}

// No monotonic clock on wasm32-unknown-unknown
#[cfg(target_arch = "wasm32")]
fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    (f(), 0.0)
}
