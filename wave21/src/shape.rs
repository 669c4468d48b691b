//!
//! # Shape Primitives
//!
//! The tagged [Shape] union attached to process layers inside components:
//! closed polygons, constant-width traces, and text annotations. Every
//! shape carries its own local [Transform]; vertex retrieval maps through
//! it and snaps to the grid. Shapes are always copied on insertion into a
//! component, so callers never hold a mutable alias to stored geometry.
//!

// Crates.io
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

// Local imports
use crate::bbox::{BoundBox, BoundBoxTrait};
use crate::geom::{Grid, Transform, Vector};

/// # Closed Polygon
///
/// N-sided polygon with arbitrary vertices. Closure from the last point
/// back to the first is implied; the initial point is not repeated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Polygon {
    pub points: Vec<Vector>,
    pub local: Transform,
}
impl Polygon {
    pub fn new(points: Vec<Vector>, grid: Grid) -> Self {
        Self {
            points,
            local: Transform::identity(grid),
        }
    }
    /// Axis-aligned rectangle helper
    pub fn rect(origin: Vector, size: Vector, grid: Grid) -> Self {
        Self::new(
            vec![
                origin,
                origin + Vector::new(size.x, 0.0),
                origin + size,
                origin + Vector::new(0.0, size.y),
            ],
            grid,
        )
    }
}

/// # Trace
///
/// An open centerline with non-zero width and a perpendicular offset
/// from the drawn spine, as fabricated on a single process layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trace {
    pub points: Vec<Vector>,
    pub width: f64,
    pub offset: f64,
    pub local: Transform,
}
impl Trace {
    pub fn new(points: Vec<Vector>, width: f64, offset: f64, grid: Grid) -> Self {
        Self {
            points,
            width,
            offset,
            local: Transform::identity(grid),
        }
    }
}

/// # Text Annotation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Text {
    pub string: String,
    pub position: Vector,
    pub size: f64,
    pub local: Transform,
}
impl Text {
    pub fn new(string: impl Into<String>, position: Vector, size: f64, grid: Grid) -> Self {
        Self {
            string: string.into(),
            position,
            size,
            local: Transform::identity(grid),
        }
    }
}

/// # Shape
///
/// The primary geometric primitive attached to layers within components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[enum_dispatch(ShapeTrait)]
pub enum Shape {
    Polygon(Polygon),
    Trace(Trace),
    Text(Text),
}

/// # ShapeTrait
///
/// Common shape operations, dispatched from the [Shape] enum to its
/// variants by [enum_dispatch].
#[enum_dispatch]
pub trait ShapeTrait {
    /// The shape's vertices mapped through its local transform,
    /// snapped to the grid quantum. For [Text] this is the single
    /// anchor position.
    fn get_points(&self) -> Vec<Vector>;
    /// Shared access to the local transform
    fn local(&self) -> &Transform;
    /// Mutable access to the local transform
    fn local_mut(&mut self) -> &mut Transform;
    /// Bounding box of the transformed vertices
    fn bbox(&self) -> BoundBox;
}
impl ShapeTrait for Polygon {
    fn get_points(&self) -> Vec<Vector> {
        self.local.apply_all(&self.points)
    }
    fn local(&self) -> &Transform {
        &self.local
    }
    fn local_mut(&mut self) -> &mut Transform {
        &mut self.local
    }
    fn bbox(&self) -> BoundBox {
        self.get_points().as_slice().bbox()
    }
}
impl ShapeTrait for Trace {
    fn get_points(&self) -> Vec<Vector> {
        self.local.apply_all(&self.points)
    }
    fn local(&self) -> &Transform {
        &self.local
    }
    fn local_mut(&mut self) -> &mut Transform {
        &mut self.local
    }
    fn bbox(&self) -> BoundBox {
        // Centerline bounds, expanded by the trace half-width
        let mut bbox = self.get_points().as_slice().bbox();
        if !bbox.is_empty() {
            bbox.expand(self.width / 2.0 + self.offset.abs());
        }
        bbox
    }
}
impl ShapeTrait for Text {
    fn get_points(&self) -> Vec<Vector> {
        vec![self.local.apply(self.position)]
    }
    fn local(&self) -> &Transform {
        &self.local
    }
    fn local_mut(&mut self) -> &mut Transform {
        &mut self.local
    }
    fn bbox(&self) -> BoundBox {
        BoundBox::from_point(self.local.apply(self.position))
    }
}
impl BoundBoxTrait for Shape {
    fn bbox(&self) -> BoundBox {
        ShapeTrait::bbox(self)
    }
}
