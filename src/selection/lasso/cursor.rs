//! Lazy cursor for lasso tracing.
//!
//! The raw pointer (`outer`) drags a stabilized point (`inner`) behind it on
//! a rubber band of length `dead_zone_radius`. Path queries use `inner`, so
//! small pointer jitter never reaches the search.

use super::geometry::Point;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorStabilizer {
    inner: Point,
    outer: Point,
    dead_zone_radius: f64,
    smoothing_factor: f64,
}

impl CursorStabilizer {
    pub fn new(dead_zone_radius: f64, smoothing_factor: f64) -> Self {
        Self {
            inner: Point::default(),
            outer: Point::default(),
            dead_zone_radius: dead_zone_radius.max(0.0),
            smoothing_factor: smoothing_factor.clamp(0.0, 1.0),
        }
    }

    /// Snap both points to `point`.
    pub fn reset(&mut self, point: Point) {
        self.inner = point;
        self.outer = point;
    }

    /// Feed a raw pointer position and return the stabilized one.
    ///
    /// Outside the dead zone `inner` moves toward `outer` by
    /// `(distance - radius) * smoothing_factor`.
    pub fn update(&mut self, pointer: Point) -> Point {
        self.outer = pointer;
        let distance = self.inner.distance_to(&self.outer);
        if distance > self.dead_zone_radius {
            let travel = (distance - self.dead_zone_radius) * self.smoothing_factor;
            let t = travel / distance;
            self.inner.x += (self.outer.x - self.inner.x) * t;
            self.inner.y += (self.outer.y - self.inner.y) * t;
        }
        self.inner
    }

    pub fn inner(&self) -> Point {
        self.inner
    }

    pub fn outer(&self) -> Point {
        self.outer
    }

    pub fn dead_zone_radius(&self) -> f64 {
        self.dead_zone_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_zone_holds_inner() {
        let mut cursor = CursorStabilizer::new(6.0, 0.5);
        cursor.reset(Point::new(10.0, 10.0));
        assert_eq!(cursor.update(Point::new(14.0, 13.0)), Point::new(10.0, 10.0));
        assert_eq!(cursor.outer(), Point::new(14.0, 13.0));
    }

    #[test]
    fn test_pull_outside_dead_zone() {
        let mut cursor = CursorStabilizer::new(6.0, 0.5);
        cursor.reset(Point::new(0.0, 0.0));
        let inner = cursor.update(Point::new(16.0, 0.0));
        assert!((inner.x - 5.0).abs() < 1e-9);
        assert!(inner.y.abs() < 1e-9);

        // Repeated updates converge to the edge of the dead zone
        for _ in 0..60 {
            cursor.update(Point::new(16.0, 0.0));
        }
        assert!((cursor.inner().x - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_full_smoothing_follows_at_radius() {
        let mut cursor = CursorStabilizer::new(2.0, 1.0);
        cursor.reset(Point::new(0.0, 0.0));
        let inner = cursor.update(Point::new(6.0, 8.0));
        assert!((inner.distance_to(&Point::new(6.0, 8.0)) - 2.0).abs() < 1e-9);
        cursor.reset(Point::new(1.0, 1.0));
        assert_eq!(cursor.inner(), cursor.outer());
    }
}
