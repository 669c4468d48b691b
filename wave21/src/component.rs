//!
//! # Components, Ports, and References
//!
//! A [Component] is a named, immutable bundle of layered shapes and
//! routing ports, built once from parameters and shared read-only among
//! arbitrarily many placements via [Ptr]. Placements are expressed as
//! [ComponentRef]s (and [ComponentArray]s for grid instancing), which
//! project every port through their accumulated transform without ever
//! touching the shared definition.
//!

// Crates.io
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// Local imports
use crate::bbox::BoundBox;
use crate::error::{LayoutError, LayoutResult};
use crate::geom::{degrees, radians, Grid, Transform, Vector};
use crate::shape::{Shape, ShapeTrait};
use crate::tech::LayerKey;
use crate::utils::Ptr;

/// # Port
///
/// A named, directional attachment point used for routing. `direction`
/// is the outward normal in degrees: the heading a trace leaves the
/// component along. Immutable after creation and owned exclusively by
/// the component that defines it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Port {
    pub name: String,
    pub position: Vector,
    /// Outward-normal heading, degrees
    pub direction: f64,
    pub width: f64,
}
impl Port {
    pub fn new(
        name: impl Into<String>,
        position: Vector,
        direction: impl Into<f64>,
        width: f64,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            direction: crate::geom::wrap_degrees(direction.into()),
            width,
        }
    }
}

/// # Port Reference
///
/// A read-only projection of a [Port] through an accumulated placement
/// transform. Projections are computed lazily on access and never
/// mutate the referenced port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortRef {
    port: Port,
    local: Transform,
}
impl PortRef {
    pub fn new(port: Port, local: Transform) -> Self {
        Self { port, local }
    }
    /// The port's position in parent coordinates
    pub fn position(&self) -> Vector {
        self.local.apply(self.port.position)
    }
    /// The port's outward-normal heading in parent coordinates, degrees.
    /// Computed by mapping the heading vector through the transform's
    /// linear part, so reflections are handled exactly.
    pub fn direction(&self) -> f64 {
        let d = Vector::from_angle(radians(self.port.direction));
        let mapped = Vector::new(d.x * self.local.scale.x, d.y * self.local.scale.y)
            .rotated(self.local.rotation());
        degrees(mapped.y.atan2(mapped.x))
    }
    /// The port's trace width (transform-invariant)
    pub fn width(&self) -> f64 {
        self.port.width
    }
    /// The underlying port's name
    pub fn name(&self) -> &str {
        &self.port.name
    }
    /// Snapshot the projected port as a plain [Port] in parent
    /// coordinates
    pub fn resolve(&self) -> Port {
        Port {
            name: self.port.name.clone(),
            position: self.position(),
            direction: self.direction(),
            width: self.width(),
        }
    }
    /// Re-project through an additional outer transform
    pub fn compose(&self, outer: &Transform) -> PortRef {
        PortRef {
            port: self.port.clone(),
            local: self.local.compose(outer),
        }
    }
}

/// # Component
///
/// The reusable building block of circuit layouts: shape primitives
/// attached to process layers, a table of routing ports, and (for
/// hierarchical components realized from sub-layouts) child placements.
/// Built once by a deterministic, parameter-driven procedure, then
/// treated as immutable and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct Component {
    /// Component Name
    pub name: String,
    /// Geometry, paired with its process layer
    pub shapes: Vec<(LayerKey, Shape)>,
    /// Routing ports, by name, in definition order
    pub ports: IndexMap<String, Port>,
    /// Child placements (hierarchical components only)
    pub children: Vec<ComponentRef>,
}
impl Component {
    /// Create a new and empty [Component] named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    /// Insert a shape on `layer`. The shape is stored by value: callers
    /// retain no alias to the stored geometry.
    pub fn insert(&mut self, layer: LayerKey, shape: impl Into<Shape>) {
        self.shapes.push((layer, shape.into()));
    }
    /// Define a new port
    pub fn add_port(&mut self, port: Port) {
        self.ports.insert(port.name.clone(), port);
    }
    /// Define a new port by name/position/direction/width
    pub fn port(
        &mut self,
        name: impl Into<String>,
        position: Vector,
        direction: impl Into<f64>,
        width: f64,
    ) {
        self.add_port(Port::new(name, position, direction, width));
    }
    /// Get a port by name
    pub fn get_port(&self, name: &str) -> LayoutResult<&Port> {
        self.ports.get(name).ok_or_else(|| {
            LayoutError::NotFound(format!(
                "port '{}' on component '{}'",
                name, self.name
            ))
        })
    }
    /// Get a port by definition index
    pub fn get_port_at(&self, index: usize) -> LayoutResult<&Port> {
        self.ports.get_index(index).map(|(_, p)| p).ok_or_else(|| {
            LayoutError::NotFound(format!(
                "port index {} on component '{}'",
                index, self.name
            ))
        })
    }
    /// Bounding box over all shapes and children
    pub fn bbox(&self) -> BoundBox {
        let mut bbox = BoundBox::empty();
        for (_, shape) in &self.shapes {
            bbox = bbox.union(&ShapeTrait::bbox(shape));
        }
        for child in &self.children {
            bbox = bbox.union(&child.bbox());
        }
        bbox
    }
}

/// # Component Reference
///
/// A positioned instance of a shared [Component] inside a layout. Holds
/// the placement transform and the derived port projections; many
/// references may share one component.
#[derive(Debug, Clone)]
pub struct ComponentRef {
    /// Instance Name
    pub name: String,
    /// Shared component definition
    pub cell: Ptr<Component>,
    /// Placement transform
    pub local: Transform,
    /// Projected ports, by name
    pub ports: IndexMap<String, PortRef>,
}
impl ComponentRef {
    /// Create a reference to `cell` under transform `local`,
    /// projecting every port of the definition.
    pub fn new(name: impl Into<String>, cell: Ptr<Component>, local: Transform) -> LayoutResult<Self> {
        let ports = {
            let comp = cell.read()?;
            comp.ports
                .iter()
                .map(|(n, p)| (n.clone(), PortRef::new(p.clone(), local)))
                .collect()
        };
        Ok(Self {
            name: name.into(),
            cell,
            local,
            ports,
        })
    }
    /// Get a projected port by name
    pub fn get_port(&self, name: &str) -> LayoutResult<&PortRef> {
        self.ports.get(name).ok_or_else(|| {
            LayoutError::NotFound(format!("port '{}' on instance '{}'", name, self.name))
        })
    }
    /// Bounding box of the referenced component, in parent coordinates
    pub fn bbox(&self) -> BoundBox {
        let inner = match self.cell.read() {
            Ok(comp) => comp.bbox(),
            Err(_) => return BoundBox::empty(),
        };
        if inner.is_empty() {
            return inner;
        }
        let mut bbox = BoundBox::empty();
        for corner in inner.corners() {
            bbox.grow(self.local.apply(corner));
        }
        bbox
    }
}

/// # Component Array
///
/// `rows × cols` grid instancing of one shared [Component]: a per-cell
/// transform and port-projection matrix, with the geometry never
/// duplicated.
#[derive(Debug, Clone)]
pub struct ComponentArray {
    /// Array Name
    pub name: String,
    /// Shared component definition
    pub cell: Ptr<Component>,
    pub rows: usize,
    pub cols: usize,
    /// Cell-to-cell spacing, in local coordinates
    pub spacing: Vector,
    /// Base placement transform (cell `[0][0]`)
    pub local: Transform,
    /// Projected ports, indexed `[row][col]`
    pub ports: Vec<Vec<IndexMap<String, PortRef>>>,
}
impl ComponentArray {
    pub fn new(
        name: impl Into<String>,
        cell: Ptr<Component>,
        rows: usize,
        cols: usize,
        spacing: Vector,
        local: Transform,
    ) -> LayoutResult<Self> {
        if rows == 0 || cols == 0 {
            return LayoutError::invalid("array dimensions must be at least 1x1");
        }
        let mut ports = Vec::with_capacity(rows);
        {
            let comp = cell.read()?;
            for i in 0..rows {
                let mut row = Vec::with_capacity(cols);
                for j in 0..cols {
                    let t = Self::cell_transform(&local, spacing, i, j);
                    let cell_ports = comp
                        .ports
                        .iter()
                        .map(|(n, p)| (n.clone(), PortRef::new(p.clone(), t)))
                        .collect();
                    row.push(cell_ports);
                }
                ports.push(row);
            }
        }
        Ok(Self {
            name: name.into(),
            cell,
            rows,
            cols,
            spacing,
            local,
            ports,
        })
    }
    /// The placement transform of grid cell `[row][col]`: the base
    /// transform with its translation advanced to the transformed cell
    /// offset.
    pub fn cell_transform(local: &Transform, spacing: Vector, row: usize, col: usize) -> Transform {
        let offset = Vector::new(col as f64 * spacing.x, row as f64 * spacing.y);
        let mut t = *local;
        t.translation = local.apply(offset);
        t
    }
    /// Get a projected port by cell index and name
    pub fn get_port(&self, row: usize, col: usize, name: &str) -> LayoutResult<&PortRef> {
        if row >= self.rows || col >= self.cols {
            return LayoutError::not_found(format!(
                "cell [{}][{}] out of range for array '{}' of size [{}][{}]",
                row, col, self.name, self.rows, self.cols
            ));
        }
        self.ports[row][col].get(name).ok_or_else(|| {
            LayoutError::NotFound(format!("port '{}' on array '{}'", name, self.name))
        })
    }
}

/// # Component Builder
///
/// A parametric recipe for a [Component]: an immutable parameter struct
/// with a pure `build`. Changing a parameter means constructing a new
/// parameter value and building again; a shared, already-built component
/// is never mutated in place, so earlier placements keep their snapshot.
pub trait ComponentBuilder {
    /// Canonical representation of the builder's parameters. Two
    /// builders with equal keys must build identical components; the
    /// key doubles as the memoization key and the component name.
    fn key(&self) -> String;
    /// Build the component on grid `grid`. Deterministic in `self`.
    fn build(&self, grid: Grid) -> LayoutResult<Component>;
}

/// # Component Library
///
/// A name-keyed registry of shared component definitions, with memoized
/// building: placing the same parameterization twice reuses one
/// definition.
#[derive(Debug, Clone, Default)]
pub struct ComponentLibrary {
    pub grid: Grid,
    components: IndexMap<String, Ptr<Component>>,
}
impl ComponentLibrary {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            components: IndexMap::new(),
        }
    }
    /// Register a component under its own name, returning the shared
    /// pointer
    pub fn add(&mut self, component: Component) -> Ptr<Component> {
        let name = component.name.clone();
        let ptr = Ptr::new(component);
        self.components.insert(name, ptr.clone());
        ptr
    }
    /// Get a shared pointer by name
    pub fn get(&self, name: &str) -> Option<Ptr<Component>> {
        self.components.get(name).cloned()
    }
    /// Get a shared pointer by name, or a [LayoutError::NotFound]
    pub fn require(&self, name: &str) -> LayoutResult<Ptr<Component>> {
        self.get(name)
            .ok_or_else(|| LayoutError::NotFound(format!("component '{}' in library", name)))
    }
    /// Build `builder`'s component, memoized by its canonical key
    pub fn build_with(&mut self, builder: &dyn ComponentBuilder) -> LayoutResult<Ptr<Component>> {
        let key = builder.key();
        if let Some(existing) = self.components.get(&key) {
            return Ok(existing.clone());
        }
        let mut component = builder.build(self.grid)?;
        component.name = key.clone();
        let ptr = Ptr::new(component);
        self.components.insert(key, ptr.clone());
        Ok(ptr)
    }
    pub fn len(&self) -> usize {
        self.components.len()
    }
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
    /// Iterate `(name, component)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Ptr<Component>)> {
        self.components.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Polygon;
    use crate::tech::Layers;

    fn grid() -> Grid {
        Grid::default()
    }

    #[test]
    fn port_projection() {
        let port = Port::new("opt", Vector::new(5.0, 0.0), 0.0, 0.5);
        let mut local = Transform::new(1.0, radians(90.0), Vector::new(10.0, 10.0), grid());
        let pref = PortRef::new(port.clone(), local);
        assert!(pref.position().near(Vector::new(10.0, 15.0), 1e-9));
        assert!((pref.direction() - 90.0).abs() < 1e-9);
        assert!((pref.width() - 0.5).abs() < 1e-9);

        // Reflection flips a north-pointing heading before rotation:
        // north -> (flip) south -> (rotate 90) east
        local.flip_v();
        let north = Port::new("n", Vector::zero(), 90.0, 0.5);
        let pref = PortRef::new(north, local);
        assert!(pref.direction().abs() < 1e-6 || (pref.direction() - 360.0).abs() < 1e-6);
    }
    #[test]
    fn reference_shares_definition() {
        let mut layers = Layers::default();
        let core = layers.add_layer("core", 1, 0);

        let mut comp = Component::new("block");
        comp.insert(core, Polygon::rect(Vector::zero(), Vector::new(4.0, 2.0), grid()));
        comp.port("west", Vector::new(0.0, 1.0), 180.0, 0.5);
        comp.port("east", Vector::new(4.0, 1.0), 0.0, 0.5);

        let ptr = Ptr::new(comp);
        let r1 = ComponentRef::new(
            "b1",
            ptr.clone(),
            Transform::identity(grid()),
        )
        .unwrap();
        let r2 = ComponentRef::new(
            "b2",
            ptr.clone(),
            Transform::new(1.0, 0.0, Vector::new(20.0, 0.0), grid()),
        )
        .unwrap();
        // Both references share one definition
        assert_eq!(r1.cell, r2.cell);
        assert!(r1.get_port("east").unwrap().position().near(Vector::new(4.0, 1.0), 1e-9));
        assert!(r2.get_port("east").unwrap().position().near(Vector::new(24.0, 1.0), 1e-9));
        assert!(r2.get_port("unknown").is_err());
    }
    #[test]
    fn array_cell_ports() {
        let mut comp = Component::new("unit");
        comp.port("p", Vector::zero(), 90.0, 1.0);
        let arr = ComponentArray::new(
            "grid",
            Ptr::new(comp),
            2,
            3,
            Vector::new(10.0, 5.0),
            Transform::identity(grid()),
        )
        .unwrap();
        assert!(arr
            .get_port(0, 0, "p")
            .unwrap()
            .position()
            .near(Vector::zero(), 1e-9));
        assert!(arr
            .get_port(1, 2, "p")
            .unwrap()
            .position()
            .near(Vector::new(20.0, 5.0), 1e-9));
        assert!(arr.get_port(2, 0, "p").is_err());
    }
    #[test]
    fn zero_sized_array_rejected() {
        let comp = Ptr::new(Component::new("unit"));
        let res = ComponentArray::new(
            "bad",
            comp,
            0,
            3,
            Vector::zero(),
            Transform::identity(grid()),
        );
        assert!(matches!(res, Err(LayoutError::Validation(_))));
    }

    struct Square {
        side: f64,
        layer: LayerKey,
    }
    impl ComponentBuilder for Square {
        fn key(&self) -> String {
            format!("square(side={})", self.side)
        }
        fn build(&self, grid: Grid) -> LayoutResult<Component> {
            let mut comp = Component::new(self.key());
            comp.insert(
                self.layer,
                Polygon::rect(Vector::zero(), Vector::new(self.side, self.side), grid),
            );
            comp.port("p", Vector::new(self.side, self.side / 2.0), 0.0, 0.5);
            Ok(comp)
        }
    }

    #[test]
    fn library_memoizes_builders() {
        let mut layers = Layers::default();
        let core = layers.add_layer("core", 1, 0);
        let mut lib = ComponentLibrary::new(grid());

        let a = lib
            .build_with(&Square {
                side: 2.0,
                layer: core,
            })
            .unwrap();
        let b = lib
            .build_with(&Square {
                side: 2.0,
                layer: core,
            })
            .unwrap();
        let c = lib
            .build_with(&Square {
                side: 3.0,
                layer: core,
            })
            .unwrap();
        // Identical parameterizations share one definition
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(lib.len(), 2);
    }
}
