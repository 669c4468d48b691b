//!
//! # Layout Container
//!
//! The [Layout] is the circuit-level scene: named placements of shared
//! components, a table of exposed ports, and the connections routed
//! between ports. Layouts nest: a layout may be realized as a
//! hierarchical [Component] and placed inside another, with an explicit
//! cycle check rejecting any placement that would reintroduce an
//! ancestor.
//!

// Std-Lib
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

// Crates.io
use indexmap::IndexMap;

// Local imports
use crate::bbox::BoundBox;
use crate::component::{
    Component, ComponentArray, ComponentBuilder, ComponentLibrary, ComponentRef, PortRef,
};
use crate::error::{LayoutError, LayoutResult};
use crate::geom::{radians, Grid, Transform, Vector};
use crate::route::{route, Connection, RouteRule};
use crate::utils::{unique_name, Ptr};

/// Monotonic source of layout identities, used by the placement-graph
/// cycle check
static NEXT_LAYOUT_ID: AtomicU64 = AtomicU64::new(1);

/// # Placement
///
/// One named entry in a layout: either a single positioned instance or
/// a grid array of one component.
#[derive(Debug, Clone)]
pub enum Placement {
    Single(ComponentRef),
    Array(ComponentArray),
}
impl Placement {
    pub fn name(&self) -> &str {
        match self {
            Placement::Single(r) => &r.name,
            Placement::Array(a) => &a.name,
        }
    }
}

/// # Placement Parameters
///
/// Origin, orientation, magnification, reflection, and duplicate-name
/// policy for [Layout::place] and friends.
#[derive(Debug, Clone, Copy)]
pub struct PlaceParams {
    /// Placement origin in parent coordinates
    pub origin: Vector,
    /// Counter-clockwise rotation, degrees
    pub rotation: f64,
    /// Uniform scale factor
    pub magnification: f64,
    /// Reflect the y-axis before rotating
    pub flip_v: bool,
    /// Permit an already-taken name, deriving a suffixed unique one
    pub allow_duplicates: bool,
}
impl Default for PlaceParams {
    fn default() -> Self {
        Self {
            origin: Vector::zero(),
            rotation: 0.0,
            magnification: 1.0,
            flip_v: false,
            allow_duplicates: false,
        }
    }
}
impl PlaceParams {
    /// Place at `origin` with default orientation
    pub fn at(origin: Vector) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }
    /// Set the rotation, accepting degrees or a [crate::geom::Compass]
    pub fn facing(mut self, rotation: impl Into<f64>) -> Self {
        self.rotation = rotation.into();
        self
    }
    /// Reflect vertically
    pub fn flipped(mut self) -> Self {
        self.flip_v = true;
        self
    }
    /// Permit duplicate names
    pub fn allow_duplicates(mut self) -> Self {
        self.allow_duplicates = true;
        self
    }
}

/// # Placement Target
///
/// What [Layout::place] accepts: an already-shared component, the name
/// of a library component, or a parametric builder (memoized by its
/// canonical key).
pub enum PlaceTarget<'a> {
    Component(Ptr<Component>),
    Library(&'a str),
    Builder(&'a dyn ComponentBuilder),
}
impl<'a> From<Ptr<Component>> for PlaceTarget<'a> {
    fn from(p: Ptr<Component>) -> Self {
        PlaceTarget::Component(p)
    }
}
impl<'a> From<&'a str> for PlaceTarget<'a> {
    fn from(name: &'a str) -> Self {
        PlaceTarget::Library(name)
    }
}
impl<'a, B: ComponentBuilder> From<&'a B> for PlaceTarget<'a> {
    fn from(b: &'a B) -> Self {
        PlaceTarget::Builder(b)
    }
}

/// # Layout
///
/// Top-level container of placements, exposed ports, and routed
/// connections. A layout exclusively owns its placements and their
/// derived port projections; component definitions are shared read-only
/// through the attached [ComponentLibrary].
#[derive(Debug)]
pub struct Layout {
    /// Layout Name
    pub name: String,
    /// Grid quantum applied to all placed geometry
    pub grid: Grid,
    /// Shared component library
    pub lib: Ptr<ComponentLibrary>,
    /// Placements, by unique name, in insertion order
    placements: IndexMap<String, Placement>,
    /// Exposed ports, by name
    pub ports: IndexMap<String, PortRef>,
    /// Routed connections
    connections: Vec<Connection>,
    /// This layout's identity, for cycle checks
    id: u64,
    /// Identities of all transitively placed layouts
    placed_layouts: HashSet<u64>,
}
impl Layout {
    /// Create a new, empty layout with a fresh component library
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self::with_library(name, Ptr::new(ComponentLibrary::new(grid)), grid)
    }
    /// Create a layout sharing an existing component library
    pub fn with_library(name: impl Into<String>, lib: Ptr<ComponentLibrary>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
            lib,
            placements: IndexMap::new(),
            ports: IndexMap::new(),
            connections: Vec::new(),
            id: NEXT_LAYOUT_ID.fetch_add(1, Ordering::Relaxed),
            placed_layouts: HashSet::new(),
        }
    }
    /// The placement transform for `params`
    fn transform_of(&self, params: &PlaceParams) -> Transform {
        let mut t = Transform::new(
            params.magnification,
            radians(params.rotation),
            params.origin,
            self.grid,
        );
        if params.flip_v {
            t.flip_v();
        }
        t
    }
    /// Validate and, if permitted, uniquify a placement name
    fn claim_name(&self, name: &str, allow_duplicates: bool) -> LayoutResult<String> {
        if name == self.name {
            return LayoutError::invalid(format!(
                "cannot place under the layout's own name '{}'",
                name
            ));
        }
        if self.placements.contains_key(name) && !allow_duplicates {
            return LayoutError::invalid(format!(
                "a placement named '{}' already exists in layout '{}'",
                name, self.name
            ));
        }
        Ok(unique_name(name, |n| self.placements.contains_key(n)))
    }
    /// Resolve a [PlaceTarget] to a shared component definition
    fn resolve_target(&self, target: PlaceTarget) -> LayoutResult<Ptr<Component>> {
        match target {
            PlaceTarget::Component(ptr) => Ok(ptr),
            PlaceTarget::Library(name) => self.lib.read()?.require(name),
            PlaceTarget::Builder(b) => self.lib.write()?.build_with(b),
        }
    }
    /// Place a component (or build-and-place a parametric builder) at
    /// the given position. Returns the registered reference; its `name`
    /// field carries any duplicate-suffix applied.
    pub fn place<'a>(
        &mut self,
        name: &str,
        target: impl Into<PlaceTarget<'a>>,
        params: PlaceParams,
    ) -> LayoutResult<&ComponentRef> {
        let name = self.claim_name(name, params.allow_duplicates)?;
        let cell = self.resolve_target(target.into())?;
        let local = self.transform_of(&params);
        let reference = ComponentRef::new(name.clone(), cell, local)?;
        self.placements
            .insert(name.clone(), Placement::Single(reference));
        match &self.placements[&name] {
            Placement::Single(r) => Ok(r),
            _ => unreachable!(),
        }
    }
    /// Place a `rows × cols` array of one component, with `spacing`
    /// between cell origins.
    pub fn array<'a>(
        &mut self,
        name: &str,
        target: impl Into<PlaceTarget<'a>>,
        rows: usize,
        cols: usize,
        spacing: Vector,
        params: PlaceParams,
    ) -> LayoutResult<&ComponentArray> {
        let name = self.claim_name(name, params.allow_duplicates)?;
        let cell = self.resolve_target(target.into())?;
        let local = self.transform_of(&params);
        let array = ComponentArray::new(name.clone(), cell, rows, cols, spacing, local)?;
        self.placements.insert(name.clone(), Placement::Array(array));
        match &self.placements[&name] {
            Placement::Array(a) => Ok(a),
            _ => unreachable!(),
        }
    }
    /// Realize this layout as a hierarchical [Component]: children are
    /// its placements (arrays expanded per cell, geometry still shared),
    /// ports are its exposed ports resolved to parent coordinates.
    /// Connections are route records, not geometry; they become shapes
    /// once handed to a waveguide builder.
    pub fn realize(&self) -> LayoutResult<Component> {
        let mut comp = Component::new(&self.name);
        for placement in self.placements.values() {
            match placement {
                Placement::Single(r) => comp.children.push(r.clone()),
                Placement::Array(a) => {
                    for i in 0..a.rows {
                        for j in 0..a.cols {
                            let t = ComponentArray::cell_transform(&a.local, a.spacing, i, j);
                            comp.children.push(ComponentRef::new(
                                format!("{}_{}_{}", a.name, i, j),
                                a.cell.clone(),
                                t,
                            )?);
                        }
                    }
                }
            }
        }
        for (name, pref) in &self.ports {
            let mut port = pref.resolve();
            port.name = name.clone();
            comp.add_port(port);
        }
        Ok(comp)
    }
    /// Place another layout inside this one. The sub-layout is realized
    /// as a hierarchical component; the placement-graph walk rejects any
    /// arrangement that would reintroduce an ancestor.
    pub fn place_layout(&mut self, sub: &Layout, params: PlaceParams) -> LayoutResult<&ComponentRef> {
        if sub.id == self.id || sub.placed_layouts.contains(&self.id) {
            return LayoutError::invalid(format!(
                "placing layout '{}' into '{}' would create a placement cycle",
                sub.name, self.name
            ));
        }
        let name = self.claim_name(&sub.name, params.allow_duplicates)?;
        let cell = Ptr::new(sub.realize()?);
        let local = self.transform_of(&params);
        let reference = ComponentRef::new(name.clone(), cell, local)?;
        self.placed_layouts.insert(sub.id);
        self.placed_layouts.extend(&sub.placed_layouts);
        self.placements
            .insert(name.clone(), Placement::Single(reference));
        match &self.placements[&name] {
            Placement::Single(r) => Ok(r),
            _ => unreachable!(),
        }
    }
    /// Expose an internal port under `name`, resolving `spec` as in
    /// [Layout::connect]
    pub fn expose(&mut self, name: impl Into<String>, spec: &str) -> LayoutResult<()> {
        let pref = self.resolve_port(spec)?;
        self.ports.insert(name.into(), pref);
        Ok(())
    }
    /// Get a placement by name
    pub fn get_component(&self, name: &str) -> LayoutResult<&Placement> {
        self.placements.get(name).ok_or_else(|| {
            LayoutError::NotFound(format!(
                "component '{}' in layout '{}'",
                name, self.name
            ))
        })
    }
    /// Get an exposed port by name
    pub fn get_port(&self, name: &str) -> LayoutResult<&PortRef> {
        self.ports.get(name).ok_or_else(|| {
            LayoutError::NotFound(format!("port '{}' in layout '{}'", name, self.name))
        })
    }
    /// Routed connections, in creation order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
    /// Placements, in insertion order
    pub fn placements(&self) -> impl Iterator<Item = (&String, &Placement)> {
        self.placements.iter()
    }
    /// Bounding box over all placements
    pub fn bbox(&self) -> BoundBox {
        let mut bbox = BoundBox::empty();
        for placement in self.placements.values() {
            match placement {
                Placement::Single(r) => bbox = bbox.union(&r.bbox()),
                Placement::Array(a) => {
                    let inner = match a.cell.read() {
                        Ok(c) => c.bbox(),
                        Err(_) => continue,
                    };
                    if inner.is_empty() {
                        continue;
                    }
                    for i in 0..a.rows {
                        for j in 0..a.cols {
                            let t = ComponentArray::cell_transform(&a.local, a.spacing, i, j);
                            for corner in inner.corners() {
                                bbox.grow(t.apply(corner));
                            }
                        }
                    }
                }
            }
        }
        bbox
    }
    /// Resolve a port identifier of the form
    /// `name`, `name.port`, `name[r][c]`, or `name[r][c].port`.
    /// The port name may be omitted only when the target has exactly
    /// one port. Index forms address arrays; bare names address single
    /// placements.
    pub fn resolve_port(&self, spec: &str) -> LayoutResult<PortRef> {
        let parsed = PortSpec::parse(spec)?;
        let placement = self.get_component(&parsed.component)?;
        match (placement, parsed.indices) {
            (Placement::Single(r), None) => {
                Self::select_port(&r.ports, parsed.port.as_deref(), &parsed.component)
            }
            (Placement::Single(_), Some(_)) => LayoutError::invalid(format!(
                "'{}' is not an array and cannot be addressed by [row][col]",
                parsed.component
            )),
            (Placement::Array(a), Some((row, col))) => {
                if row >= a.rows || col >= a.cols {
                    return LayoutError::not_found(format!(
                        "cell [{}][{}] out of range for array '{}' of size [{}][{}]",
                        row, col, parsed.component, a.rows, a.cols
                    ));
                }
                Self::select_port(&a.ports[row][col], parsed.port.as_deref(), &parsed.component)
            }
            (Placement::Array(_), None) => LayoutError::invalid(format!(
                "array '{}' must be addressed by [row][col]",
                parsed.component
            )),
        }
    }
    /// Pick one port from a projection table: by name, or implicitly
    /// when there is exactly one.
    fn select_port(
        ports: &IndexMap<String, PortRef>,
        port: Option<&str>,
        component: &str,
    ) -> LayoutResult<PortRef> {
        match port {
            Some(p) => ports.get(p).cloned().ok_or_else(|| {
                LayoutError::NotFound(format!("port '{}' on component '{}'", p, component))
            }),
            None => {
                if ports.is_empty() {
                    return LayoutError::invalid(format!(
                        "component '{}' has no ports to connect",
                        component
                    ));
                }
                if ports.len() > 1 {
                    return LayoutError::invalid(format!(
                        "missing port name for component '{}' with multiple ports",
                        component
                    ));
                }
                Ok(ports[0].clone())
            }
        }
    }
    /// Connect two ports, producing and storing a routed [Connection].
    /// Identifiers resolve as in [Layout::resolve_port]; widths must
    /// match.
    pub fn connect(&mut self, a: &str, b: &str, rule: &RouteRule) -> LayoutResult<&Connection> {
        let pa = self.resolve_port(a)?;
        let pb = self.resolve_port(b)?;
        self.connect_refs(&pa, &pb, rule)
    }
    /// Connect two already-resolved port references
    pub fn connect_refs(
        &mut self,
        a: &PortRef,
        b: &PortRef,
        rule: &RouteRule,
    ) -> LayoutResult<&Connection> {
        let connection = route(a, b, rule, self.grid)?;
        self.connections.push(connection);
        Ok(self.connections.last().unwrap())
    }
}

/// Parsed form of a port identifier
struct PortSpec {
    component: String,
    indices: Option<(usize, usize)>,
    port: Option<String>,
}
impl PortSpec {
    /// Parse `name`, `name.port`, `name[r][c]`, or `name[r][c].port`
    fn parse(spec: &str) -> LayoutResult<PortSpec> {
        let invalid = || LayoutError::Validation(format!("invalid port identifier '{}'", spec));
        let (head, port) = match spec.split_once('.') {
            Some((head, port)) => {
                if port.is_empty() || port.contains(['.', '[', ']']) {
                    return Err(invalid());
                }
                (head, Some(port.to_string()))
            }
            None => (spec, None),
        };
        let (component, indices) = match head.find('[') {
            Some(open) => {
                let (name, idx) = head.split_at(open);
                let mut nums = Vec::with_capacity(2);
                let mut rest = idx;
                while let Some(stripped) = rest.strip_prefix('[') {
                    let close = stripped.find(']').ok_or_else(invalid)?;
                    let num: usize = stripped[..close].parse().map_err(|_| invalid())?;
                    nums.push(num);
                    rest = &stripped[close + 1..];
                }
                if !rest.is_empty() || nums.len() != 2 {
                    return Err(invalid());
                }
                (name, Some((nums[0], nums[1])))
            }
            None => (head, None),
        };
        if component.is_empty() || component.contains([']', ' ']) {
            return Err(invalid());
        }
        Ok(PortSpec {
            component: component.to_string(),
            indices,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Port;
    use crate::shape::Polygon;

    fn grid() -> Grid {
        Grid::default()
    }
    /// A two-port coupler block used across the tests here
    fn coupler(grid: Grid) -> Component {
        let mut comp = Component::new("coupler");
        comp.insert(
            crate::tech::LayerKey::default(),
            Polygon::rect(Vector::zero(), Vector::new(10.0, 2.0), grid),
        );
        comp.port("west", Vector::new(0.0, 1.0), 180.0, 0.5);
        comp.port("east", Vector::new(10.0, 1.0), 0.0, 0.5);
        comp
    }

    #[test]
    fn spec_parsing() {
        let s = PortSpec::parse("mzi").unwrap();
        assert_eq!(s.component, "mzi");
        assert!(s.indices.is_none() && s.port.is_none());

        let s = PortSpec::parse("mzi.east").unwrap();
        assert_eq!(s.port.as_deref(), Some("east"));

        let s = PortSpec::parse("bank[1][2].out").unwrap();
        assert_eq!(s.indices, Some((1, 2)));
        assert_eq!(s.port.as_deref(), Some("out"));

        assert!(PortSpec::parse("bank[1]").is_err());
        assert!(PortSpec::parse("bank[1][x]").is_err());
        assert!(PortSpec::parse(".port").is_err());
        assert!(PortSpec::parse("a.b.c").is_err());
    }
    #[test]
    fn duplicate_names() {
        let mut layout = Layout::new("top", grid());
        let cell = Ptr::new(coupler(grid()));
        layout
            .place("A", cell.clone(), PlaceParams::default())
            .unwrap();
        // Same name without permission: rejected
        let err = layout.place("A", cell.clone(), PlaceParams::default());
        assert!(matches!(err, Err(LayoutError::Validation(_))));
        // With permission: deterministic suffix
        let r = layout
            .place("A", cell.clone(), PlaceParams::default().allow_duplicates())
            .unwrap();
        assert_eq!(r.name, "A_1");
    }
    #[test]
    fn own_name_rejected() {
        let mut layout = Layout::new("top", grid());
        let cell = Ptr::new(coupler(grid()));
        let err = layout.place("top", cell, PlaceParams::default());
        assert!(matches!(err, Err(LayoutError::Validation(_))));
    }
    #[test]
    fn port_resolution() {
        let mut layout = Layout::new("top", grid());
        let cell = Ptr::new(coupler(grid()));
        layout
            .place("c1", cell.clone(), PlaceParams::at(Vector::zero()))
            .unwrap();
        layout
            .array(
                "bank",
                cell.clone(),
                2,
                2,
                Vector::new(20.0, 10.0),
                PlaceParams::at(Vector::new(50.0, 0.0)),
            )
            .unwrap();

        let p = layout.resolve_port("c1.east").unwrap();
        assert!(p.position().near(Vector::new(10.0, 1.0), 1e-9));
        // Multiple ports, none named
        assert!(matches!(
            layout.resolve_port("c1"),
            Err(LayoutError::Validation(_))
        ));
        // Array addressing
        let p = layout.resolve_port("bank[1][1].west").unwrap();
        assert!(p.position().near(Vector::new(70.0, 11.0), 1e-9));
        assert!(matches!(
            layout.resolve_port("bank.west"),
            Err(LayoutError::Validation(_))
        ));
        assert!(matches!(
            layout.resolve_port("bank[5][0].west"),
            Err(LayoutError::NotFound(_))
        ));
        assert!(matches!(
            layout.resolve_port("c1[0][0].east"),
            Err(LayoutError::Validation(_))
        ));
        assert!(matches!(
            layout.resolve_port("ghost.east"),
            Err(LayoutError::NotFound(_))
        ));
    }
    #[test]
    fn single_port_shorthand() {
        let mut layout = Layout::new("top", grid());
        let mut comp = Component::new("term");
        comp.add_port(Port::new("only", Vector::zero(), 0.0, 0.5));
        layout
            .place("t", Ptr::new(comp), PlaceParams::default())
            .unwrap();
        let p = layout.resolve_port("t").unwrap();
        assert_eq!(p.name(), "only");
    }
    #[test]
    fn cycle_rejected() {
        let mut top = Layout::new("top", grid());
        let mut mid = Layout::new("mid", grid());
        let mut leaf = Layout::new("leaf", grid());
        mid.place_layout(&leaf, PlaceParams::default()).unwrap();
        top.place_layout(&mid, PlaceParams::default()).unwrap();
        // Transitive cycle: `top` already contains `mid`, so `mid` may
        // not absorb `top`
        let err = mid.place_layout(&top, PlaceParams::default());
        assert!(matches!(err, Err(LayoutError::Validation(_))));
        // And `leaf`, inside both, may not absorb either ancestor
        let err = leaf.place_layout(&top, PlaceParams::default());
        assert!(matches!(err, Err(LayoutError::Validation(_))));
        let err = leaf.place_layout(&mid, PlaceParams::default());
        assert!(matches!(err, Err(LayoutError::Validation(_))));
    }
    #[test]
    fn exposed_ports() {
        let mut layout = Layout::new("top", grid());
        let cell = Ptr::new(coupler(grid()));
        layout
            .place("c1", cell, PlaceParams::at(Vector::new(5.0, 5.0)))
            .unwrap();
        layout.expose("input", "c1.west").unwrap();
        let p = layout.get_port("input").unwrap();
        assert!(p.position().near(Vector::new(5.0, 6.0), 1e-9));
        assert!(layout.get_port("output").is_err());

        // Exposed ports ride along when the layout is realized
        let comp = layout.realize().unwrap();
        assert!(comp.ports.contains_key("input"));
        assert_eq!(comp.children.len(), 1);
    }
}
