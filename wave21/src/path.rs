//!
//! # QuickPath
//!
//! Progressive polyline construction with a notion of current heading.
//! The router and hand-drawn waveguide centerlines are both built from
//! these: a mutable, append-only point sequence plus relative-movement
//! primitives (`forward`, `left`, `right`, cardinal moves).
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::geom::{degrees, radians, Grid, Vector};

/// # QuickPath
///
/// An ordered point sequence with directional awareness. The current
/// heading derives from the last two points, or from the explicit
/// initial direction while fewer than two points exist. All mutation is
/// append/remove on the owned sequence; paths never alias one another
/// except through explicit [QuickPath::extend].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickPath {
    points: Vec<Vector>,
    /// Fallback heading (radians) used before two points exist
    initial_direction: f64,
    grid: Grid,
}
impl QuickPath {
    /// Start a path at `start`, heading `direction` degrees
    pub fn new(start: Vector, direction: f64, grid: Grid) -> Self {
        Self {
            points: vec![grid.snap_vector(start)],
            initial_direction: radians(direction),
            grid,
        }
    }
    /// Start an empty path with heading `direction` degrees
    pub fn empty(direction: f64, grid: Grid) -> Self {
        Self {
            points: Vec::new(),
            initial_direction: radians(direction),
            grid,
        }
    }
    /// Number of points
    pub fn size(&self) -> usize {
        self.points.len()
    }
    /// Borrow the point sequence
    pub fn points(&self) -> &[Vector] {
        &self.points
    }
    /// Consume into the point sequence
    pub fn into_points(self) -> Vec<Vector> {
        self.points
    }
    /// First point, if any
    pub fn start(&self) -> Option<Vector> {
        self.points.first().copied()
    }
    /// Last point, if any
    pub fn end(&self) -> Option<Vector> {
        self.points.last().copied()
    }
    /// Heading of the first segment, in degrees.
    /// Falls back to the initial direction for short paths.
    pub fn start_direction(&self) -> f64 {
        if self.points.len() < 2 {
            return degrees(self.initial_direction);
        }
        (self.points[1] - self.points[0]).angle_degrees()
    }
    /// Heading of the last segment, in degrees.
    /// Falls back to the initial direction for short paths.
    pub fn end_direction(&self) -> f64 {
        if self.points.len() < 2 {
            return degrees(self.initial_direction);
        }
        let n = self.points.len();
        (self.points[n - 1] - self.points[n - 2]).angle_degrees()
    }
    /// Length traveled along the path (sum of segment lengths)
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1] - w[0]).length())
            .sum()
    }
    /// Straight-line distance from start to end
    pub fn distance(&self) -> f64 {
        match (self.start(), self.end()) {
            (Some(s), Some(e)) => (e - s).length(),
            _ => 0.0,
        }
    }
    /// Append a single absolute point
    pub fn to(&mut self, p: Vector) -> &mut Self {
        self.points.push(self.grid.snap_vector(p));
        self
    }
    /// Append a point displaced `d` from the last position
    pub fn by(&mut self, d: Vector) -> &mut Self {
        let last = self.end().unwrap_or(Vector::zero());
        self.to(last + d)
    }
    /// Move north relative to the last position
    pub fn north(&mut self, d: f64) -> &mut Self {
        self.by(Vector::new(0.0, d))
    }
    /// Move south relative to the last position
    pub fn south(&mut self, d: f64) -> &mut Self {
        self.by(Vector::new(0.0, -d))
    }
    /// Move east relative to the last position
    pub fn east(&mut self, d: f64) -> &mut Self {
        self.by(Vector::new(d, 0.0))
    }
    /// Move west relative to the last position
    pub fn west(&mut self, d: f64) -> &mut Self {
        self.by(Vector::new(-d, 0.0))
    }
    /// Move distance `d` at heading `angle` degrees
    pub fn to_angle(&mut self, d: f64, angle: f64) -> &mut Self {
        let a = radians(angle);
        self.by(Vector::from_angle(a) * d)
    }
    /// Move distance `d` along the current heading
    pub fn forward(&mut self, d: f64) -> &mut Self {
        self.to_angle(d, self.end_direction())
    }
    /// Move distance `d` perpendicular-left of the current heading
    pub fn left(&mut self, d: f64) -> &mut Self {
        self.to_angle(d, self.end_direction() + 90.0)
    }
    /// Move distance `d` perpendicular-right of the current heading
    pub fn right(&mut self, d: f64) -> &mut Self {
        self.to_angle(d, self.end_direction() - 90.0)
    }
    /// Append every point of `points`
    pub fn extend(&mut self, points: &[Vector]) -> &mut Self {
        for p in points {
            self.to(*p);
        }
        self
    }
    /// Remove the point at `index`
    pub fn remove(&mut self, index: usize) -> &mut Self {
        self.points.remove(index);
        self
    }
    /// Reverse the path direction in place
    pub fn reverse(&mut self) -> &mut Self {
        self.points.reverse();
        self
    }
    /// Collapse consecutive points closer than `tolerance`
    /// (grid quantum when `None`). Builds a fresh sequence rather than
    /// deleting from the one being scanned, so iteration order is
    /// index-stable.
    pub fn clean(&mut self, tolerance: Option<f64>) -> &mut Self {
        let tol = tolerance.unwrap_or_else(|| self.grid.quantum());
        let mut cleaned: Vec<Vector> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            match cleaned.last() {
                Some(last) if p.near(*last, tol) => continue,
                _ => cleaned.push(*p),
            }
        }
        self.points = cleaned;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::default()
    }

    #[test]
    fn cardinal_moves() {
        let mut p = QuickPath::new(Vector::zero(), 0.0, grid());
        p.east(2.0).north(3.0).west(1.0).south(0.5);
        assert_eq!(p.size(), 5);
        assert_eq!(p.end(), Some(Vector::new(1.0, 2.5)));
        assert!((p.length() - 6.5).abs() < 1e-9);
        assert!((p.distance() - (1.0f64 + 2.5 * 2.5).sqrt()).abs() < 1e-9);
    }
    #[test]
    fn heading_relative_moves() {
        let mut p = QuickPath::new(Vector::zero(), 90.0, grid());
        // Fewer than two points: heading falls back to the initial direction
        assert!((p.end_direction() - 90.0).abs() < 1e-9);
        p.forward(2.0);
        assert!(p.end().unwrap().near(Vector::new(0.0, 2.0), 1e-9));
        p.left(1.0);
        assert!(p.end().unwrap().near(Vector::new(-1.0, 2.0), 1e-9));
        p.right(3.0);
        assert!(p.end().unwrap().near(Vector::new(-1.0, 5.0), 1e-9));
        assert!((p.end_direction() - 90.0).abs() < 1e-9);
        assert!((p.start_direction() - 90.0).abs() < 1e-9);
    }
    #[test]
    fn clean_and_reverse() {
        let mut p = QuickPath::new(Vector::zero(), 0.0, grid());
        p.east(1.0);
        p.by(Vector::new(1e-5, 0.0)); // degenerate stub
        p.north(1.0);
        p.clean(Some(1e-3));
        assert_eq!(p.size(), 3);
        p.reverse();
        assert_eq!(p.start(), Some(Vector::new(1.0, 1.0)));
        assert_eq!(p.end(), Some(Vector::zero()));
        assert!((p.end_direction() - 180.0).abs() < 1e-9);
    }
}
