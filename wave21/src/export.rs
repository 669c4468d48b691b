//!
//! # Export Interface
//!
//! The core's half of the (out-of-scope) GDS codec boundary: plain,
//! serializable records of per-cell polygons, labels, and placement
//! descriptors. Trace centerlines are flattened to mitered polygon
//! outlines here, so the codec receives nothing but vertex lists keyed
//! by `(layer, datatype)` and a tree of named cell instances.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::component::{Component, ComponentRef};
use crate::error::{LayoutError, LayoutResult};
use crate::geom::{Vector, TOL};
use crate::layout::{Layout, Placement};
use crate::shape::{Shape, ShapeTrait};
use crate::tech::Layers;
use crate::utils::{unique_name, Ptr};

/// One flattened polygon on a `(layer, datatype)` pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportPolygon {
    pub layer: i16,
    pub datatype: i16,
    pub points: Vec<(f64, f64)>,
}

/// One text label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportLabel {
    pub layer: i16,
    pub datatype: i16,
    pub text: String,
    pub position: (f64, f64),
    pub size: f64,
}

/// One placement of a named cell: a single instance, or a
/// `rows × cols` array when both counts exceed one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportInstance {
    pub cell: String,
    pub origin: (f64, f64),
    /// Counter-clockwise rotation, degrees
    pub rotation: f64,
    pub magnification: f64,
    pub x_reflection: bool,
    pub rows: usize,
    pub cols: usize,
    pub spacing: (f64, f64),
}

/// One exported cell: flattened geometry plus child placements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportCell {
    pub name: String,
    pub polygons: Vec<ExportPolygon>,
    pub labels: Vec<ExportLabel>,
    pub instances: Vec<ExportInstance>,
}

/// The complete export payload: cells in dependency order
/// (children precede their parents)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportLibrary {
    pub name: String,
    pub unit: f64,
    pub precision: f64,
    pub cells: Vec<ExportCell>,
}

/// # Exporter
///
/// Walks a component/layout tree depth-first, emitting each distinct
/// component definition exactly once (by pointer identity) and
/// respecting per-layer export flags.
pub struct Exporter<'a> {
    layers: &'a Layers,
    /// Pointer identity -> emitted cell name
    done: HashMap<Ptr<Component>, String>,
    cells: Vec<ExportCell>,
}
impl<'a> Exporter<'a> {
    /// Export a layout and everything it references
    pub fn export_layout(layout: &Layout, layers: &'a Layers) -> LayoutResult<ExportLibrary> {
        let mut this = Self::new(layers);
        let mut top = ExportCell {
            name: layout.name.clone(),
            polygons: Vec::new(),
            labels: Vec::new(),
            instances: Vec::new(),
        };
        for (_, placement) in layout.placements() {
            match placement {
                Placement::Single(r) => {
                    top.instances.push(this.instance(r)?);
                }
                Placement::Array(a) => {
                    let cell = this.visit(&a.cell)?;
                    let record = a.local.to_placement();
                    top.instances.push(ExportInstance {
                        cell,
                        origin: record.origin,
                        rotation: record.rotation,
                        magnification: record.magnification,
                        x_reflection: record.x_reflection,
                        rows: a.rows,
                        cols: a.cols,
                        spacing: (a.spacing.x, a.spacing.y),
                    });
                }
            }
        }
        // Exposed ports travel as text labels on the first exported
        // layer
        let (label_layer, label_datatype) = layers
            .exported()
            .next()
            .map(|(_, l)| (l.layer, l.datatype))
            .unwrap_or((0, 0));
        for (name, port) in &layout.ports {
            let p = port.position();
            top.labels.push(ExportLabel {
                layer: label_layer,
                datatype: label_datatype,
                text: name.clone(),
                position: (p.x, p.y),
                size: port.width(),
            });
        }
        this.cells.push(top);
        Ok(ExportLibrary {
            name: layout.name.clone(),
            unit: layout.grid.unit,
            precision: layout.grid.precision,
            cells: this.cells,
        })
    }
    /// Export a single component tree
    pub fn export_component(
        component: &Ptr<Component>,
        layers: &'a Layers,
    ) -> LayoutResult<ExportLibrary> {
        let mut this = Self::new(layers);
        let name = this.visit(component)?;
        let grid = crate::geom::Grid::default();
        Ok(ExportLibrary {
            name,
            unit: grid.unit,
            precision: grid.precision,
            cells: this.cells,
        })
    }
    fn new(layers: &'a Layers) -> Self {
        Self {
            layers,
            done: HashMap::new(),
            cells: Vec::new(),
        }
    }
    /// Emit `cell` (once) and return its exported name
    fn visit(&mut self, cell: &Ptr<Component>) -> LayoutResult<String> {
        if let Some(name) = self.done.get(cell) {
            return Ok(name.clone());
        }
        let comp = cell.read()?;
        // Distinct definitions may share a name; uniquify per identity.
        // `done` holds every name reserved so far, including cells still
        // being visited.
        let name = unique_name(&comp.name, |n| self.done.values().any(|v| v == n));
        // Reserve the name before descending, in case of diamonds
        self.done.insert(cell.clone(), name.clone());

        let mut record = ExportCell {
            name: name.clone(),
            polygons: Vec::new(),
            labels: Vec::new(),
            instances: Vec::new(),
        };
        for (layer_key, shape) in &comp.shapes {
            let layer = self.layers.get(*layer_key).ok_or_else(|| {
                LayoutError::NotFound(format!(
                    "layer of a shape in component '{}'",
                    comp.name
                ))
            })?;
            if !layer.export {
                continue;
            }
            match shape {
                Shape::Polygon(_) => {
                    record.polygons.push(ExportPolygon {
                        layer: layer.layer,
                        datatype: layer.datatype,
                        points: shape.get_points().iter().map(|p| (p.x, p.y)).collect(),
                    });
                }
                Shape::Trace(t) => {
                    let outline = trace_outline(&shape.get_points(), t.width, t.offset)?;
                    record.polygons.push(ExportPolygon {
                        layer: layer.layer,
                        datatype: layer.datatype,
                        points: outline.iter().map(|p| (p.x, p.y)).collect(),
                    });
                }
                Shape::Text(t) => {
                    let p = shape.get_points()[0];
                    record.labels.push(ExportLabel {
                        layer: layer.layer,
                        datatype: layer.datatype,
                        text: t.string.clone(),
                        position: (p.x, p.y),
                        size: t.size,
                    });
                }
            }
        }
        for child in &comp.children {
            record.instances.push(self.instance(child)?);
        }
        drop(comp);
        self.cells.push(record);
        Ok(name)
    }
    /// The placement record for one child reference
    fn instance(&mut self, child: &ComponentRef) -> LayoutResult<ExportInstance> {
        let cell = self.visit(&child.cell)?;
        let record = child.local.to_placement();
        Ok(ExportInstance {
            cell,
            origin: record.origin,
            rotation: record.rotation,
            magnification: record.magnification,
            x_reflection: record.x_reflection,
            rows: 1,
            cols: 1,
            spacing: (0.0, 0.0),
        })
    }
}

/// Flatten a trace centerline into its polygon outline: the spine offset
/// by `offset ± width/2` with mitered joints, walked forward on one side
/// and back on the other.
pub fn trace_outline(points: &[Vector], width: f64, offset: f64) -> LayoutResult<Vec<Vector>> {
    // Drop degenerate zero-length stubs before offsetting
    let mut spine: Vec<Vector> = Vec::with_capacity(points.len());
    for p in points {
        match spine.last() {
            Some(last) if p.near(*last, TOL) => continue,
            _ => spine.push(*p),
        }
    }
    if spine.len() < 2 {
        return LayoutError::infeasible(
            "cannot outline a zero-length trace centerline",
        );
    }
    let mut left = offset_polyline(&spine, offset + width / 2.0)?;
    let right = offset_polyline(&spine, offset - width / 2.0)?;
    left.extend(right.into_iter().rev());
    Ok(left)
}

/// Offset a polyline perpendicular by signed distance `d` (positive to
/// the left of travel), with mitered interior joints
fn offset_polyline(spine: &[Vector], d: f64) -> LayoutResult<Vec<Vector>> {
    let mut out = Vec::with_capacity(spine.len());
    for i in 0..spine.len() {
        let shifted = if i == 0 {
            let n = (spine[1] - spine[0]).normalize().perp();
            spine[0] + n * d
        } else if i == spine.len() - 1 {
            let n = (spine[i] - spine[i - 1]).normalize().perp();
            spine[i] + n * d
        } else {
            let n1 = (spine[i] - spine[i - 1]).normalize().perp();
            let n2 = (spine[i + 1] - spine[i]).normalize().perp();
            let m = n1 + n2;
            if m.length() < 1e-9 {
                // Fold-back joint: no finite miter exists
                return LayoutError::infeasible(format!(
                    "fold-back in trace centerline at ({}, {})",
                    spine[i].x, spine[i].y
                ));
            }
            let m = m.normalize();
            let denom = m.dot(n1);
            if denom.abs() < 1e-3 {
                return LayoutError::infeasible(format!(
                    "joint too sharp to miter in trace centerline at ({}, {})",
                    spine[i].x, spine[i].y
                ));
            }
            spine[i] + m * (d / denom)
        };
        out.push(shifted);
    }
    Ok(out)
}
