//!
//! # Axis-Aligned Bounding Boxes
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::geom::Vector;

/// # Rectangular Bounding Box
///
/// `min` is always closest to negative-infinity in both axes, `max` to
/// positive-infinity. A freshly created box is empty (inverted bounds)
/// and grows by inclusion of points or other boxes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundBox {
    pub min: Vector,
    pub max: Vector,
}
impl BoundBox {
    /// Create an empty, inverted [BoundBox]
    pub fn empty() -> Self {
        Self {
            min: Vector::new(f64::INFINITY, f64::INFINITY),
            max: Vector::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }
    /// Create a zero-area [BoundBox] comprising a single point
    pub fn from_point(p: Vector) -> Self {
        Self { min: p, max: p }
    }
    /// Create a [BoundBox] from two arbitrary corner points
    pub fn from_corners(p0: Vector, p1: Vector) -> Self {
        Self {
            min: Vector::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            max: Vector::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }
    /// Boolean indication of whether the box is empty
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }
    /// Grow to include point `p` (mutates)
    pub fn grow(&mut self, p: Vector) {
        self.min = Vector::new(self.min.x.min(p.x), self.min.y.min(p.y));
        self.max = Vector::new(self.max.x.max(p.x), self.max.y.max(p.y));
    }
    /// The union with `other`, as a new box
    pub fn union(&self, other: &BoundBox) -> BoundBox {
        BoundBox {
            min: Vector::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vector::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
    /// The intersection with `other`; empty if the boxes are disjoint
    pub fn intersection(&self, other: &BoundBox) -> BoundBox {
        let min = Vector::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = Vector::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        if min.x > max.x || min.y > max.y {
            return BoundBox::empty();
        }
        BoundBox { min, max }
    }
    /// Inclusive containment of point `p`
    pub fn contains(&self, p: Vector) -> bool {
        self.min.x <= p.x && self.max.x >= p.x && self.min.y <= p.y && self.max.y >= p.y
    }
    /// Expand in all directions by `delta` (mutates)
    pub fn expand(&mut self, delta: f64) {
        self.min = self.min - Vector::new(delta, delta);
        self.max = self.max + Vector::new(delta, delta);
    }
    /// Center point
    pub fn center(&self) -> Vector {
        (self.min + self.max) / 2.0
    }
    /// Size as a (width, height) vector
    pub fn size(&self) -> Vector {
        self.max - self.min
    }
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
    /// The four corner points, counter-clockwise from the lower-left
    pub fn corners(&self) -> [Vector; 4] {
        [
            self.min,
            Vector::new(self.max.x, self.min.y),
            self.max,
            Vector::new(self.min.x, self.max.y),
        ]
    }
}
impl Default for BoundBox {
    fn default() -> Self {
        Self::empty()
    }
}

///
/// # Bounding Box Trait
///
/// Implemented for points, point-lists, and shapes, enabling uniform
/// bounding-box accumulation across heterogeneous geometry.
///
pub trait BoundBoxTrait {
    /// Compute a rectangular bounding box around the implementing type
    fn bbox(&self) -> BoundBox;
}
impl BoundBoxTrait for Vector {
    fn bbox(&self) -> BoundBox {
        BoundBox::from_point(*self)
    }
}
impl BoundBoxTrait for [Vector] {
    fn bbox(&self) -> BoundBox {
        let mut bbox = BoundBox::empty();
        for p in self {
            bbox.grow(*p);
        }
        bbox
    }
}
impl BoundBoxTrait for BoundBox {
    fn bbox(&self) -> BoundBox {
        *self
    }
}
