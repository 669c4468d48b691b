//!
//! # wave21 unit tests
//!
//! Scenario tests exercising the component/layout/router/waveguide flow
//! end to end. Focused math tests live beside their modules.
//!

use super::*;

/// Create the [Layers] used by a number of tests: a small silicon
/// photonics stack
pub fn layers() -> Layers {
    let mut layers = Layers::default();
    layers.add_layer("wg_core", 1, 0);
    layers.add_layer("wg_clad", 1, 2);
    layers.add_layer("heater", 10, 0);
    layers.add_layer("metal1", 12, 0);
    layers
}
/// The waveguide cross-section shared by the scenario tests:
/// a core trace plus a wider cladding trench
pub fn xsection(layers: &Layers) -> TraceTemplate {
    let core = layers.keyname("wg_core").unwrap();
    let clad = layers.keyname("wg_clad").unwrap();
    let mut tpl = TraceTemplate::new();
    tpl.add("wg_core", vec![TraceSpec::new(core, 0.5, 0.0)]);
    tpl.add("wg_clad", vec![TraceSpec::new(clad, 4.5, 0.0)]);
    tpl
}
/// A two-port directional-coupler stand-in
fn coupler(layers: &Layers, grid: Grid) -> Component {
    let core = layers.keyname("wg_core").unwrap();
    let mut comp = Component::new("coupler");
    comp.insert(
        core,
        Polygon::rect(Vector::zero(), Vector::new(10.0, 2.0), grid),
    );
    comp.port("west", Vector::new(0.0, 1.0), 180.0, 0.5);
    comp.port("east", Vector::new(10.0, 1.0), 0.0, 0.5);
    comp
}

#[test]
fn place_route_and_build_traces() -> LayoutResult<()> {
    let grid = Grid::default();
    let layers = layers();
    let mut layout = Layout::new("ring_bank", grid);
    let cell = utils::Ptr::new(coupler(&layers, grid));

    layout.place("left", cell.clone(), PlaceParams::at(Vector::zero()))?;
    layout.place("right", cell.clone(), PlaceParams::at(Vector::new(40.0, 20.0)))?;

    // Route left.east -> right.west: both projected eastward/westward
    let rule = RouteRule::new(5.0, 0.2);
    let conn = layout.connect("left.east", "right.west", &rule)?;
    let path = conn.path.clone();
    assert_eq!(path.first().unwrap(), &Vector::new(10.0, 1.0));
    assert_eq!(path.last().unwrap(), &Vector::new(40.0, 21.0));

    // Turn the routed polyline into fabricated traces
    let wg = Waveguide::new(xsection(&layers), path, 0.5, 5.0);
    let trace_ref = {
        let mut lib = layout.lib.write()?;
        lib.build_with(&wg)?
    };
    let built = trace_ref.read()?;
    // One trace per cross-section layer
    assert_eq!(built.shapes.len(), 2);
    // The waveguide's ports land on the connection endpoints
    assert_eq!(built.get_port("in")?.position, Vector::new(10.0, 1.0));
    assert_eq!(built.get_port("out")?.position, Vector::new(40.0, 21.0));
    Ok(())
}

#[test]
fn duplicate_placement_gets_suffix() -> LayoutResult<()> {
    let grid = Grid::default();
    let layers = layers();
    let mut layout = Layout::new("top", grid);
    let a = utils::Ptr::new(coupler(&layers, grid));
    let b = utils::Ptr::new(coupler(&layers, grid));

    layout.place("A", a, PlaceParams::at(Vector::zero()))?;
    let second = layout.place("A", b, PlaceParams::default().allow_duplicates())?;
    assert_eq!(second.name, "A_1");
    Ok(())
}

#[test]
fn width_mismatch_at_connect() -> LayoutResult<()> {
    let grid = Grid::default();
    let layers = layers();
    let core = layers.keyname("wg_core").unwrap();
    let mut layout = Layout::new("top", grid);

    let mut narrow = Component::new("narrow");
    narrow.insert(
        core,
        Polygon::rect(Vector::zero(), Vector::new(2.0, 2.0), grid),
    );
    narrow.port("p", Vector::new(2.0, 1.0), 0.0, 0.4);
    let mut wide = Component::new("wide");
    wide.insert(
        core,
        Polygon::rect(Vector::zero(), Vector::new(2.0, 2.0), grid),
    );
    wide.port("p", Vector::new(0.0, 1.0), 180.0, 0.6);

    layout.place("n", utils::Ptr::new(narrow), PlaceParams::at(Vector::zero()))?;
    layout.place("w", utils::Ptr::new(wide), PlaceParams::at(Vector::new(50.0, 0.0)))?;
    let err = layout.connect("n.p", "w.p", &RouteRule::new(5.0, 0.2));
    assert!(matches!(err, Err(LayoutError::Validation(_))));
    Ok(())
}

#[test]
fn hierarchy_projects_ports() -> LayoutResult<()> {
    let grid = Grid::default();
    let layers = layers();
    let mut sub = Layout::new("stage", grid);
    let cell = utils::Ptr::new(coupler(&layers, grid));
    sub.place("c", cell, PlaceParams::at(Vector::new(5.0, 0.0)))?;
    sub.expose("out", "c.east")?;

    let mut top = Layout::new("top", grid);
    // Rotate the whole stage a quarter turn and move it
    let r = top.place_layout(
        &sub,
        PlaceParams::at(Vector::new(100.0, 0.0)).facing(Compass::North),
    )?;
    // stage-local port (15, 1) -> rotated (-1, 15) -> shifted (99, 15)
    let port = r.get_port("out")?;
    assert!(port.position().near(Vector::new(99.0, 15.0), 1e-9));
    // Outward east rotates to outward north
    assert!((port.direction() - 90.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn array_route_between_cells() -> LayoutResult<()> {
    let grid = Grid::default();
    let layers = layers();
    let mut layout = Layout::new("bank", grid);
    let cell = utils::Ptr::new(coupler(&layers, grid));
    layout.array("row", cell, 1, 2, Vector::new(60.0, 0.0), PlaceParams::default())?;

    let rule = RouteRule::new(5.0, 0.2);
    let conn = layout.connect("row[0][0].east", "row[0][1].west", &rule)?;
    // Straight shot between facing cells
    assert_eq!(conn.path.first().unwrap(), &Vector::new(10.0, 1.0));
    assert_eq!(conn.path.last().unwrap(), &Vector::new(60.0, 1.0));
    assert!(conn.path.iter().all(|p| (p.y - 1.0).abs() < 1e-9));
    Ok(())
}

#[test]
fn builds_are_deterministic() -> LayoutResult<()> {
    let layers = layers();
    let points = vec![
        Vector::zero(),
        Vector::new(30.0, 0.0),
        Vector::new(30.0, 30.0),
        Vector::new(60.0, 30.0),
    ];
    let make = || Waveguide::new(xsection(&layers), points.clone(), 0.5, 5.0);

    let a = utils::Ptr::new(make().build(Grid::default())?);
    let b = utils::Ptr::new(make().build(Grid::default())?);
    let ea = Exporter::export_component(&a, &layers)?;
    let eb = Exporter::export_component(&b, &layers)?;
    // Byte-identical exported vertex lists
    assert_eq!(ea.cells.len(), eb.cells.len());
    for (ca, cb) in ea.cells.iter().zip(eb.cells.iter()) {
        assert_eq!(ca.polygons, cb.polygons);
    }
    Ok(())
}

#[test]
fn memoized_waveguides_share_one_cell() -> LayoutResult<()> {
    let grid = Grid::default();
    let layers = layers();
    let mut layout = Layout::new("top", grid);
    let points = vec![Vector::zero(), Vector::new(25.0, 0.0)];
    let wg = Waveguide::new(xsection(&layers), points.clone(), 0.5, 5.0);
    let wg_again = Waveguide::new(xsection(&layers), points, 0.5, 5.0);

    layout.place("w1", &wg, PlaceParams::at(Vector::zero()))?;
    layout.place("w2", &wg_again, PlaceParams::at(Vector::new(0.0, 10.0)))?;
    // Identical parameterizations resolve to one shared definition
    assert_eq!(layout.lib.read()?.len(), 1);

    let lib = Exporter::export_layout(&layout, &layers)?;
    // One definition cell plus the top cell
    assert_eq!(lib.cells.len(), 2);
    let top = lib.cells.iter().find(|c| c.name == "top").unwrap();
    assert_eq!(top.instances.len(), 2);
    assert_eq!(top.instances[0].cell, top.instances[1].cell);
    Ok(())
}

#[test]
fn export_layout_with_arrays_and_ports() -> LayoutResult<()> {
    let grid = Grid::default();
    let layers = layers();
    let mut layout = Layout::new("chip", grid);
    let cell = utils::Ptr::new(coupler(&layers, grid));
    layout.place("c0", cell.clone(), PlaceParams::at(Vector::zero()))?;
    layout.array(
        "bank",
        cell,
        2,
        3,
        Vector::new(20.0, 15.0),
        PlaceParams::at(Vector::new(50.0, 0.0)),
    )?;
    layout.expose("input", "c0.west")?;

    let lib = Exporter::export_layout(&layout, &layers)?;
    assert_eq!(lib.unit, 1e-6);
    let top = lib.cells.iter().find(|c| c.name == "chip").unwrap();
    assert_eq!(top.instances.len(), 2);
    let aref = top.instances.iter().find(|i| i.rows == 2).unwrap();
    assert_eq!(aref.cols, 3);
    assert_eq!(aref.spacing, (20.0, 15.0));
    // The exposed port rides along as a label
    assert_eq!(top.labels.len(), 1);
    assert_eq!(top.labels[0].text, "input");
    assert_eq!(top.labels[0].position, (0.0, 1.0));
    Ok(())
}

#[test]
fn routed_path_feeds_waveguide_cleanly() -> LayoutResult<()> {
    // The spec's S-jog: clearance-length end segments are exactly
    // buildable at the same bend radius
    let grid = Grid::default();
    let layers = layers();
    let a = Port::new("a", Vector::zero(), 0.0, 0.5);
    let b = Port::new("b", Vector::new(0.0, 10.0), 0.0, 0.5);
    let rule = RouteRule::new(5.0, 0.2);
    let conn = route::route_ports(&a, &b, &rule, grid)?;

    let wg = Waveguide::new(xsection(&layers), conn.path.clone(), 0.5, 5.0);
    let comp = wg.build(grid)?;
    assert_eq!(comp.get_port("in")?.position, Vector::zero());
    assert_eq!(comp.get_port("out")?.position, Vector::new(0.0, 10.0));
    Ok(())
}
