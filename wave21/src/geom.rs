//!
//! # Geometry Module
//!
//! Defines the core planar-geometry types, [Vector], [Grid], and
//! [Transform], along with angle and direction helpers.
//!
//! All coordinates are `f64` in layout units (typically microns), and
//! every coordinate leaving a [Transform] is snapped to the grid quantum,
//! so downstream geometry is deterministic and grid-aligned regardless of
//! floating-point drift along the way.
//!

// Crates.io
use serde::{Deserialize, Serialize};

/// Default tolerance for geometric comparisons, in layout units
pub const TOL: f64 = 1e-3;

/// Wrap an angle in radians to the domain `[0, 2π)`
pub fn wrap_radians(a: f64) -> f64 {
    let tau = 2.0 * std::f64::consts::PI;
    let mut r = a % tau;
    if r < 0.0 {
        r += tau;
    }
    r
}
/// Wrap an angle in degrees to the domain `[0, 360)`
pub fn wrap_degrees(a: f64) -> f64 {
    let mut r = a % 360.0;
    if r < 0.0 {
        r += 360.0;
    }
    r
}
/// Convert degrees to radians, wrapped to `[0, 2π)`
pub fn radians(deg: f64) -> f64 {
    wrap_radians(deg.to_radians())
}
/// Convert radians to degrees, wrapped to `[0, 360)`
pub fn degrees(rad: f64) -> f64 {
    wrap_degrees(rad.to_degrees())
}

/// # Compass Directions
///
/// The eight cardinal/intercardinal headings, accepted anywhere an
/// orientation parameter appears. East is zero degrees; angles increase
/// counter-clockwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Compass {
    East,
    NorthEast,
    North,
    NorthWest,
    West,
    SouthWest,
    South,
    SouthEast,
}
impl Compass {
    /// Heading angle in degrees
    pub fn degrees(self) -> f64 {
        use Compass::*;
        match self {
            East => 0.0,
            NorthEast => 45.0,
            North => 90.0,
            NorthWest => 135.0,
            West => 180.0,
            SouthWest => 225.0,
            South => 270.0,
            SouthEast => 315.0,
        }
    }
    /// Heading angle in radians
    pub fn radians(self) -> f64 {
        radians(self.degrees())
    }
}
impl From<Compass> for f64 {
    /// Convert to a heading angle in degrees
    fn from(c: Compass) -> f64 {
        c.degrees()
    }
}

/// # Vector in two-dimensional layout-space
///
/// Immutable value semantics: every operation returns a new [Vector].
/// Geometric decisions never use exact equality; use [Vector::near].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}
impl Vector {
    /// Create a new [Vector] from (x,y) coordinates
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
    /// The zero vector
    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
    /// Unit vector at `angle` radians from the x-axis
    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }
    /// Dot product
    pub fn dot(&self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y
    }
    /// Z-component of the cross product
    pub fn cross(&self, other: Vector) -> f64 {
        self.x * other.y - self.y * other.x
    }
    /// Squared length
    pub fn length2(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }
    /// Euclidean length
    pub fn length(&self) -> f64 {
        self.length2().sqrt()
    }
    /// Unit-length copy. Degenerate near-zero vectors normalize against
    /// a small floor rather than dividing by zero.
    pub fn normalize(&self) -> Vector {
        let h = self.length().max(1e-9);
        Vector::new(self.x / h, self.y / h)
    }
    /// Counter-clockwise rotation by `angle` radians
    pub fn rotated(&self, angle: f64) -> Vector {
        let (s, c) = angle.sin_cos();
        Vector::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }
    /// Left-hand perpendicular (counter-clockwise quarter turn)
    pub fn perp(&self) -> Vector {
        Vector::new(-self.y, self.x)
    }
    /// Heading angle in radians, in `[0, 2π)`
    pub fn angle(&self) -> f64 {
        wrap_radians(self.y.atan2(self.x))
    }
    /// Heading angle in degrees, in `[0, 360)`
    pub fn angle_degrees(&self) -> f64 {
        degrees(self.y.atan2(self.x))
    }
    /// Linear interpolation from `self` toward `other` by `t` in `[0, 1]`
    pub fn lerp(&self, other: Vector, t: f64) -> Vector {
        let t = t.clamp(0.0, 1.0);
        Vector::new(
            (1.0 - t) * self.x + t * other.x,
            (1.0 - t) * self.y + t * other.y,
        )
    }
    /// Tolerance-based comparison: both coordinates within `tol`
    pub fn near(&self, other: Vector, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol && (self.y - other.y).abs() <= tol
    }
}
impl std::ops::Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}
impl std::ops::Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}
impl std::ops::Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}
impl std::ops::Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs)
    }
}
impl std::ops::Div<f64> for Vector {
    type Output = Vector;
    fn div(self, rhs: f64) -> Vector {
        Vector::new(self.x / rhs, self.y / rhs)
    }
}
impl From<(f64, f64)> for Vector {
    fn from(t: (f64, f64)) -> Self {
        Self::new(t.0, t.1)
    }
}
impl From<Vector> for (f64, f64) {
    fn from(v: Vector) -> Self {
        (v.x, v.y)
    }
}

/// # Grid Quantum
///
/// The `unit`/`precision` pair every coordinate is snapped to.
/// With the defaults (micron units, nanometer precision) the quantum is
/// `1e-3` and snapping rounds to three decimal digits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Grid {
    /// Layout database unit, in meters
    pub unit: f64,
    /// Grid precision, in meters
    pub precision: f64,
}
impl Grid {
    pub fn new(unit: f64, precision: f64) -> Self {
        Self { unit, precision }
    }
    /// The grid quantum in layout units
    pub fn quantum(&self) -> f64 {
        self.precision / self.unit
    }
    /// Decimal digit count all coordinates are rounded to
    pub fn digits(&self) -> i32 {
        (-(self.precision / self.unit).log10()).trunc() as i32
    }
    /// Snap a scalar to the nearest grid coordinate
    pub fn snap(&self, x: f64) -> f64 {
        let scale = 10f64.powi(self.digits());
        (x * scale).round() / scale
    }
    /// Snap both coordinates of a [Vector]
    pub fn snap_vector(&self, v: Vector) -> Vector {
        Vector::new(self.snap(v.x), self.snap(v.y))
    }
}
impl Default for Grid {
    /// Micron units on a nanometer grid
    fn default() -> Self {
        Self {
            unit: 1e-6,
            precision: 1e-9,
        }
    }
}

/// # Planar Transform
///
/// Local-to-parent coordinate mapping: scale, then rotate, then
/// translate, in that fixed order. Rotation is stored in radians,
/// wrapped to `[0, 2π)`. Scale signs carry axis reflections
/// ([Transform::flip_h] / [Transform::flip_v]); scale magnitudes must
/// match between axes for composition to remain exact, which holds for
/// every placement this crate produces (magnification plus reflections).
///
/// Every applied coordinate is snapped to the transform's [Grid], making
/// placement chains deterministic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// Per-axis scale; negative signs encode reflections
    pub scale: Vector,
    /// Rotation angle in radians, wrapped to `[0, 2π)`
    rotation: f64,
    /// Translation applied last
    pub translation: Vector,
    /// Output snapping grid
    pub grid: Grid,
}
impl Transform {
    /// The identity transform on grid `grid`
    pub fn identity(grid: Grid) -> Self {
        Self {
            scale: Vector::new(1.0, 1.0),
            rotation: 0.0,
            translation: Vector::zero(),
            grid,
        }
    }
    /// Create a transform from a uniform scale factor, a rotation in
    /// radians, and a translation
    pub fn new(scale: f64, rotation: f64, translation: Vector, grid: Grid) -> Self {
        Self {
            scale: Vector::new(scale, scale),
            rotation: wrap_radians(rotation),
            translation,
            grid,
        }
    }
    /// Rotation angle in radians, in `[0, 2π)`
    pub fn rotation(&self) -> f64 {
        self.rotation
    }
    /// Set the rotation angle (radians; stored wrapped)
    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = wrap_radians(rotation);
    }
    /// Rotate by `angle` radians (mutates)
    pub fn rotate(&mut self, angle: f64) -> &mut Self {
        self.rotation = wrap_radians(self.rotation + angle);
        self
    }
    /// Translate by `d` (mutates)
    pub fn translate(&mut self, d: Vector) -> &mut Self {
        self.translation = self.translation + d;
        self
    }
    /// Scale by uniform factor `s` (mutates)
    pub fn scale_by(&mut self, s: f64) -> &mut Self {
        self.scale = Vector::new(self.scale.x * s, self.scale.y * s);
        self
    }
    /// Reflect the x-coordinate (mutates)
    pub fn flip_h(&mut self) -> &mut Self {
        self.scale.x = -self.scale.x;
        self
    }
    /// Reflect the y-coordinate (mutates)
    pub fn flip_v(&mut self) -> &mut Self {
        self.scale.y = -self.scale.y;
        self
    }
    /// Reflect both axes (mutates)
    pub fn reflect(&mut self) -> &mut Self {
        self.scale = -self.scale;
        self
    }
    /// Map a point from local to parent coordinates: scale, rotate,
    /// translate, then snap to the grid.
    pub fn apply(&self, p: Vector) -> Vector {
        let scaled = Vector::new(p.x * self.scale.x, p.y * self.scale.y);
        let rotated = scaled.rotated(self.rotation);
        self.grid.snap_vector(rotated + self.translation)
    }
    /// Map a list of points elementwise
    pub fn apply_all(&self, pts: &[Vector]) -> Vec<Vector> {
        pts.iter().map(|p| self.apply(*p)).collect()
    }
    /// The 2x2 linear part, row-major
    fn matrix(&self) -> [[f64; 2]; 2] {
        let (s, c) = self.rotation.sin_cos();
        [
            [self.scale.x * c, -self.scale.y * s],
            [self.scale.x * s, self.scale.y * c],
        ]
    }
    /// Create the transform equivalent to applying `self` in `other`'s
    /// frame, i.e. `other ∘ self`. A chain of placements composes
    /// associatively, so coordinates are identical regardless of
    /// grouping.
    pub fn compose(&self, other: &Transform) -> Transform {
        let a = matmul(&other.matrix(), &self.matrix());
        // Extract (rotation, scale) back out of the composed linear part.
        // Exact for any rotation combined with reflections and uniform
        // magnification.
        let rotation = wrap_radians(a[1][0].atan2(a[0][0]));
        let sx = (a[0][0] * a[0][0] + a[1][0] * a[1][0]).sqrt();
        let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
        let sy = if sx.abs() < f64::EPSILON { 0.0 } else { det / sx };
        let translation = other.apply(self.translation);
        Transform {
            scale: Vector::new(sx, sy),
            rotation,
            translation,
            grid: other.grid,
        }
    }
    /// Reduce to the canonical GDS-style placement descriptor:
    /// origin, counter-clockwise rotation in degrees, magnification, and
    /// reflection about the x-axis (applied before rotation). Axis
    /// reflections and sign pairs fold into the mirror/rotation pair.
    pub fn to_placement(&self) -> PlaceRecord {
        let mag = self.scale.x.abs();
        if (self.scale.x.abs() - self.scale.y.abs()).abs() > TOL {
            log::warn!(
                "anisotropic scale ({}, {}) reduced to magnification {}",
                self.scale.x,
                self.scale.y,
                mag
            );
        }
        let (extra, x_reflection) = match (self.scale.x < 0.0, self.scale.y < 0.0) {
            (false, false) => (0.0, false),
            (true, false) => (180.0, true),
            (false, true) => (0.0, true),
            (true, true) => (180.0, false),
        };
        PlaceRecord {
            origin: (self.translation.x, self.translation.y),
            rotation: wrap_degrees(degrees(self.rotation) + extra),
            magnification: mag,
            x_reflection,
        }
    }
}

/// Multiply 2x2 matrices, returning a new 2x2 matrix
fn matmul(a: &[[f64; 2]; 2], b: &[[f64; 2]; 2]) -> [[f64; 2]; 2] {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

/// # Placement Record
///
/// The canonical instance descriptor handed to the external GDS codec:
/// origin, rotation in degrees, magnification, and x-axis mirroring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceRecord {
    pub origin: (f64, f64),
    pub rotation: f64,
    pub magnification: f64,
    pub x_reflection: bool,
}
