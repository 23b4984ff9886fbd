//! Polyline helpers for lasso paths.
//!
//! - **Bresenham**: straight pixel lines used when a search gives up
//! - **Douglas-Peucker**: polyline simplification
//! - **Laplacian smoothing**: iterative 3-point averaging

use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Perpendicular distance from this point to a line segment.
    pub fn distance_to_line(&self, line_start: &Point, line_end: &Point) -> f64 {
        let dx = line_end.x - line_start.x;
        let dy = line_end.y - line_start.y;
        let length_sq = dx * dx + dy * dy;

        if length_sq < 1e-12 {
            return self.distance_to(line_start);
        }

        let t = ((self.x - line_start.x) * dx + (self.y - line_start.y) * dy) / length_sq;
        let t = t.clamp(0.0, 1.0);

        let px = self.x - (line_start.x + t * dx);
        let py = self.y - (line_start.y + t * dy);
        (px * px + py * py).sqrt()
    }

    /// Nearest integer pixel coordinate.
    pub fn rounded(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Integer line from `start` to `end`, both endpoints included.
pub fn bresenham_line(start: (i64, i64), end: (i64, i64)) -> Vec<Point> {
    let (mut x, mut y) = start;
    let dx = (end.0 - x).abs();
    let dy = -(end.1 - y).abs();
    let sx = if x < end.0 { 1 } else { -1 };
    let sy = if y < end.1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut points = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        points.push(Point::new(x as f64, y as f64));
        if x == end.0 && y == end.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    points
}

/// Total polyline length.
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Simplify a polyline using the Douglas-Peucker algorithm.
///
/// # Arguments
/// * `points` - Input polyline points
/// * `epsilon` - Maximum allowed perpendicular distance
///
/// # Returns
/// Simplified polyline; the first and last points are always kept.
pub fn simplify_path(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0f64;
    let mut max_idx = 0;
    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = point.distance_to_line(&first, &last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let mut left = simplify_path(&points[..=max_idx], epsilon);
        let right = simplify_path(&points[max_idx..], epsilon);
        // junction point appears in both halves
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

/// Laplacian smoothing with fixed endpoints.
///
/// Each pass moves every interior point toward the midpoint of its two
/// neighbors by `factor` (0..1].
pub fn smooth_path(points: &[Point], iterations: usize, factor: f64) -> Vec<Point> {
    if iterations == 0 || points.len() < 3 || factor <= 0.0 {
        return points.to_vec();
    }
    let factor = factor.min(1.0);
    let mut pts = points.to_vec();
    let n = pts.len();
    for _ in 0..iterations {
        let prev = pts.clone();
        for i in 1..n - 1 {
            let mx = (prev[i - 1].x + prev[i + 1].x) * 0.5;
            let my = (prev[i - 1].y + prev[i + 1].y) * 0.5;
            pts[i].x = prev[i].x + factor * (mx - prev[i].x);
            pts[i].y = prev[i].y + factor * (my - prev[i].y);
        }
    }
    pts
}

/// Append `segment` to `path`, dropping its first point when it repeats the tail.
pub fn append_segment(path: &mut Vec<Point>, segment: &[Point]) {
    let skip = match (path.last(), segment.first()) {
        (Some(tail), Some(head)) if tail.distance_to(head) < 1e-9 => 1,
        _ => 0,
    };
    path.extend_from_slice(&segment[skip.min(segment.len())..]);
}
