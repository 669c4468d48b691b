//!
//! # Waveguide Builder
//!
//! Converts an ordered centerline (hand-drawn or router-produced) plus a
//! cross-section template into one trace per fabrication layer, rounding
//! corners into circular arcs or cubic-Bezier bends and, optionally,
//! widening long straight runs with tapered transitions.
//!
//! The builder is a parametric [ComponentBuilder]: a pure function of
//! its parameter struct. Interpolation consumes the input point list
//! front-to-back into a fresh buffer, so colinear-point elision never
//! disturbs the scan position.
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::component::{Component, ComponentBuilder};
use crate::error::{LayoutError, LayoutResult};
use crate::geom::{wrap_degrees, Grid, Vector, TOL};
use crate::shape::{Polygon, Trace};
use crate::tech::TraceTemplate;

/// # Bend Style
///
/// How corners are rounded: a circular arc tangent to both legs, or a
/// cubic Bezier whose control points pull in by `sharpness` of the
/// radius (the customary value is `0.45`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum BendStyle {
    Circle,
    Bezier(f64),
}

/// # Waveguide
///
/// Parametric multi-layer trace builder. Identical parameterizations
/// build identical components and share one definition through the
/// component library's memoization.
#[derive(Debug, Clone)]
pub struct Waveguide {
    /// Cross-section: per logical layer, the trace specs to fabricate
    pub template: TraceTemplate,
    /// Centerline to interpolate
    pub points: Vec<Vector>,
    /// Nominal core width, used for the end ports
    pub width: f64,
    /// Bend radius
    pub radius: f64,
    /// Corner rounding method
    pub bend: BendStyle,
    /// Interpolation mesh tolerance
    pub tolerance: f64,
    /// Widen long straight runs with tapered transitions
    pub augmented: bool,
    /// Widened-section width when no augmentation template is given
    pub aug_width: f64,
    /// Per-layer widened widths; must cover the base template's layers
    pub aug_template: Option<TraceTemplate>,
    /// Taper length at each end of a widened section
    pub taper_length: f64,
}
impl Waveguide {
    pub fn new(template: TraceTemplate, points: Vec<Vector>, width: f64, radius: f64) -> Self {
        Self {
            template,
            points,
            width,
            radius,
            bend: BendStyle::Bezier(0.45),
            tolerance: 0.01,
            augmented: false,
            aug_width: 3.0,
            aug_template: None,
            taper_length: 10.0,
        }
    }
    /// Set the corner rounding method
    pub fn bend(mut self, bend: BendStyle) -> Self {
        self.bend = bend;
        self
    }
    /// Enable straight-run widening
    pub fn augmented(mut self, aug_width: f64, taper_length: f64) -> Self {
        self.augmented = true;
        self.aug_width = aug_width;
        self.taper_length = taper_length;
        self
    }
    /// Supply a per-layer widened-width template
    pub fn aug_template(mut self, template: TraceTemplate) -> Self {
        self.aug_template = Some(template);
        self
    }
}
impl ComponentBuilder for Waveguide {
    fn key(&self) -> String {
        let pts: Vec<String> = self
            .points
            .iter()
            .map(|p| format!("({},{})", p.x, p.y))
            .collect();
        let layers: Vec<String> = self.template.layer_names().cloned().collect();
        format!(
            "waveguide(points=[{}], layers=[{}], width={}, radius={}, bend={:?}, tol={}, aug={}, aug_width={}, taper={})",
            pts.join(","),
            layers.join(","),
            self.width,
            self.radius,
            self.bend,
            self.tolerance,
            self.augmented,
            self.aug_width,
            self.taper_length,
        )
    }
    fn build(&self, grid: Grid) -> LayoutResult<Component> {
        if self.points.len() < 2 {
            return LayoutError::invalid("a waveguide needs at least two centerline points");
        }
        if let Some(aug) = &self.aug_template {
            if !aug.covers(&self.template) {
                return LayoutError::invalid(
                    "augmentation template must contain the waveguide template's layers",
                );
            }
        }
        // Advisory pass over the raw centerline: corners sharper than 90
        // degrees interpolate poorly
        for w in self.points.windows(3) {
            if (w[0] - w[1]).dot(w[2] - w[1]) > TOL {
                log::warn!(
                    "waveguide corner at ({}, {}) is sharper than 90 degrees",
                    w[1].x,
                    w[1].y
                );
            }
        }

        let mut comp = Component::new(self.key());
        for (layer_name, specs) in self.template.iter() {
            for spec in specs {
                if spec.width > 2.0 * self.radius {
                    log::warn!(
                        "trace width {} on layer '{}' exceeds twice the bend radius {}; bends may self-overlap",
                        spec.width,
                        layer_name,
                        self.radius
                    );
                }
                let aug_width = match &self.aug_template {
                    Some(aug) => aug
                        .get(layer_name)
                        .and_then(|specs| specs.first())
                        .map(|s| s.width)
                        .unwrap_or(self.aug_width),
                    None => self.aug_width,
                };
                let interp = self.interpolate(spec.width, spec.offset, aug_width, grid)?;
                comp.insert(spec.layer, Trace::new(interp.centerline, spec.width, spec.offset, grid));
                for poly in interp.widenings {
                    comp.insert(spec.layer, poly);
                }
            }
        }
        // Layers present only in the augmentation template carry
        // geometry only at the widened sections
        if self.augmented {
            if let Some(aug) = &self.aug_template {
                for (layer_name, specs) in aug.iter() {
                    if self.template.get(layer_name).is_some() {
                        continue;
                    }
                    for spec in specs {
                        let interp = self.interpolate(self.width, spec.offset, spec.width, grid)?;
                        for poly in interp.widenings {
                            comp.insert(spec.layer, poly);
                        }
                    }
                }
            }
        }

        // End ports from the centerline tangents, at the nominal core
        // width. Outward normals face away from the trace.
        let first = self.points[0];
        let second = self.points[1];
        let n = self.points.len();
        let last = self.points[n - 1];
        let penultimate = self.points[n - 2];
        comp.port(
            "in",
            first,
            wrap_degrees((second - first).angle_degrees() + 180.0),
            self.width,
        );
        comp.port("out", last, (last - penultimate).angle_degrees(), self.width);
        Ok(comp)
    }
}

/// One layer's interpolation result
struct Interpolated {
    centerline: Vec<Vector>,
    widenings: Vec<Polygon>,
}

impl Waveguide {
    /// Interpolate the centerline for one trace spec: elide colinear
    /// interior points, round genuine corners, and collect widened
    /// sections for long straight runs.
    fn interpolate(
        &self,
        width: f64,
        offset: f64,
        aug_width: f64,
        grid: Grid,
    ) -> LayoutResult<Interpolated> {
        // Degenerate short path: a single straight segment, no bends
        if self.points.len() < 3 {
            return Ok(Interpolated {
                centerline: self.points.clone(),
                widenings: Vec::new(),
            });
        }
        // First pass: keep the endpoints and the genuine corners,
        // skipping colinear interior points. Built as a new list; the
        // source is never modified mid-scan.
        let mut nodes: Vec<Vector> = Vec::with_capacity(self.points.len());
        nodes.push(self.points[0]);
        for w in self.points.windows(3) {
            if !colinear(w[0], w[1], w[2], TOL) {
                nodes.push(w[1]);
            }
        }
        nodes.push(self.points[self.points.len() - 1]);

        let mut centerline: Vec<Vector> = vec![nodes[0]];
        let mut widenings: Vec<Polygon> = Vec::new();
        for k in 1..nodes.len() - 1 {
            let p = nodes[k];
            let v1 = nodes[k - 1] - p;
            let v2 = nodes[k + 1] - p;
            let prev_is_corner = k >= 2;

            // The incoming leg must hold this bend, plus the previous
            // one when the preceding node is also a corner
            let need_in = if prev_is_corner {
                2.0 * self.radius
            } else {
                self.radius
            };
            if v1.length() < need_in - TOL {
                return LayoutError::infeasible(format!(
                    "segment length {:.4} is too short to accommodate bend radius {} at corner ({}, {})",
                    v1.length(),
                    self.radius,
                    p.x,
                    p.y
                ));
            }
            if v2.length() < self.radius - TOL {
                return LayoutError::infeasible(format!(
                    "segment length {:.4} is too short to accommodate bend radius {} at corner ({}, {})",
                    v2.length(),
                    self.radius,
                    p.x,
                    p.y
                ));
            }

            // Widen the incoming straight run if there is room left
            // after debiting the bend reservations
            if self.augmented {
                let reserved_start = if prev_is_corner { self.radius } else { 0.0 };
                let run = v1.length() - reserved_start - self.radius;
                if run > 3.0 * self.taper_length {
                    widenings.push(self.widening(
                        nodes[k - 1],
                        p,
                        reserved_start,
                        self.radius,
                        width,
                        offset,
                        aug_width,
                        grid,
                    ));
                }
            }

            // Replace the corner with a rounded bend
            let bend_points = self.bend_points(nodes[k - 1], p, nodes[k + 1])?;
            centerline.extend(bend_points);
        }
        // The final straight run
        if self.augmented {
            let p0 = nodes[nodes.len() - 2];
            let p1 = nodes[nodes.len() - 1];
            let reserved_start = if nodes.len() >= 3 { self.radius } else { 0.0 };
            let run = (p1 - p0).length() - reserved_start;
            if run > 3.0 * self.taper_length {
                widenings.push(self.widening(
                    p0,
                    p1,
                    reserved_start,
                    0.0,
                    width,
                    offset,
                    aug_width,
                    grid,
                ));
            }
        }
        centerline.push(nodes[nodes.len() - 1]);
        Ok(Interpolated {
            centerline,
            widenings,
        })
    }
    /// Sample the rounded bend replacing corner `p` between neighbors
    /// `prev` and `next`
    fn bend_points(&self, prev: Vector, p: Vector, next: Vector) -> LayoutResult<Vec<Vector>> {
        let u = (prev - p).normalize();
        let w = (next - p).normalize();
        if u.dot(w) > 1.0 - 1e-9 {
            return LayoutError::infeasible(format!(
                "degenerate fold-back corner at ({}, {})",
                p.x, p.y
            ));
        }
        let a = p + u * self.radius;
        let d = p + w * self.radius;
        let n = (1.0 / self.tolerance).round().max(4.0) as usize;
        match self.bend {
            BendStyle::Bezier(sharpness) => {
                let b = p + u * (self.radius * sharpness);
                let c = p + w * (self.radius * sharpness);
                let mut pts = Vec::with_capacity(n);
                for i in 0..n {
                    let t = i as f64 / (n - 1) as f64;
                    let omt = 1.0 - t;
                    let point = a * (omt * omt * omt)
                        + b * (3.0 * omt * omt * t)
                        + c * (3.0 * omt * t * t)
                        + d * (t * t * t);
                    pts.push(point);
                }
                Ok(pts)
            }
            BendStyle::Circle => {
                // Fillet tangent to both legs at distance `radius` from
                // the corner; for right angles the arc radius equals the
                // bend radius
                let bisector = (u + w).normalize();
                let cos_half = u.dot(bisector).clamp(-1.0, 1.0);
                if cos_half.abs() < 1e-9 {
                    return LayoutError::infeasible(format!(
                        "degenerate corner at ({}, {})",
                        p.x, p.y
                    ));
                }
                let center = p + bisector * (self.radius / cos_half);
                let a0 = (a - center).angle();
                let a1 = (d - center).angle();
                let mut sweep = a1 - a0;
                // Take the short way around
                if sweep > std::f64::consts::PI {
                    sweep -= 2.0 * std::f64::consts::PI;
                } else if sweep < -std::f64::consts::PI {
                    sweep += 2.0 * std::f64::consts::PI;
                }
                let rho = (a - center).length();
                let mut pts = Vec::with_capacity(n);
                for i in 0..n {
                    let t = i as f64 / (n - 1) as f64;
                    let ang = a0 + sweep * t;
                    pts.push(center + Vector::from_angle(ang) * rho);
                }
                Ok(pts)
            }
        }
    }
    /// The widened-section outline for the straight run `p0 -> p1`,
    /// with `reserved_start`/`reserved_end` debited for adjacent bends:
    /// taper up over `taper_length`, a wide run, taper back down.
    #[allow(clippy::too_many_arguments)]
    fn widening(
        &self,
        p0: Vector,
        p1: Vector,
        reserved_start: f64,
        reserved_end: f64,
        width: f64,
        offset: f64,
        aug_width: f64,
        grid: Grid,
    ) -> Polygon {
        let dir = (p1 - p0).normalize();
        let n = dir.perp();
        let s0 = p0 + dir * reserved_start + n * offset;
        let s1 = p1 - dir * reserved_end + n * offset;
        let q1 = s0 + dir * self.taper_length;
        let q2 = s1 - dir * self.taper_length;
        let half = width / 2.0;
        let aug_half = aug_width / 2.0;
        Polygon::new(
            vec![
                s0 + n * half,
                q1 + n * aug_half,
                q2 + n * aug_half,
                s1 + n * half,
                s1 - n * half,
                q2 - n * aug_half,
                q1 - n * aug_half,
                s0 - n * half,
            ],
            grid,
        )
    }
}

/// Three-point colinearity, by the signed area of the triangle they form
pub fn colinear(p1: Vector, p2: Vector, p3: Vector, tol: f64) -> bool {
    (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y)).abs() <= tol
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Shape, ShapeTrait};
    use crate::tech::{Layers, TraceSpec};

    fn grid() -> Grid {
        Grid::default()
    }
    fn single_layer() -> (Layers, TraceTemplate) {
        let mut layers = Layers::default();
        let core = layers.add_layer("core", 1, 0);
        let mut tpl = TraceTemplate::new();
        tpl.add("core", vec![TraceSpec::new(core, 0.4, 0.0)]);
        (layers, tpl)
    }

    #[test]
    fn colinearity() {
        assert!(colinear(
            Vector::zero(),
            Vector::new(1.0, 1.0),
            Vector::new(3.0, 3.0),
            1e-3
        ));
        assert!(!colinear(
            Vector::zero(),
            Vector::new(1.0, 1.0),
            Vector::new(3.0, 3.1),
            1e-3
        ));
    }
    #[test]
    fn colinear_path_single_trace() {
        // A 3-point colinear path with augmentation disabled yields one
        // trace whose centerline is the merged input path
        let (_, tpl) = single_layer();
        let wg = Waveguide::new(
            tpl,
            vec![
                Vector::zero(),
                Vector::new(5.0, 0.0),
                Vector::new(12.0, 0.0),
            ],
            0.4,
            5.0,
        );
        let comp = wg.build(grid()).unwrap();
        assert_eq!(comp.shapes.len(), 1);
        match &comp.shapes[0].1 {
            Shape::Trace(t) => {
                assert_eq!(t.points, vec![Vector::zero(), Vector::new(12.0, 0.0)]);
                assert!((t.width - 0.4).abs() < 1e-9);
            }
            other => panic!("expected a trace, got {:?}", other),
        }
    }
    #[test]
    fn two_point_degenerate() {
        let (_, tpl) = single_layer();
        let wg = Waveguide::new(
            tpl,
            vec![Vector::zero(), Vector::new(8.0, 0.0)],
            0.4,
            5.0,
        );
        let comp = wg.build(grid()).unwrap();
        match &comp.shapes[0].1 {
            Shape::Trace(t) => assert_eq!(t.points.len(), 2),
            other => panic!("expected a trace, got {:?}", other),
        }
    }
    #[test]
    fn corner_rounding() {
        let (_, tpl) = single_layer();
        let wg = Waveguide::new(
            tpl,
            vec![
                Vector::zero(),
                Vector::new(20.0, 0.0),
                Vector::new(20.0, 20.0),
            ],
            0.4,
            5.0,
        )
        .bend(BendStyle::Circle);
        let comp = wg.build(grid()).unwrap();
        let trace = match &comp.shapes[0].1 {
            Shape::Trace(t) => t,
            other => panic!("expected a trace, got {:?}", other),
        };
        // The corner itself is replaced by bend samples
        assert!(!trace.points.contains(&Vector::new(20.0, 0.0)));
        // Bend starts and ends one radius off the corner
        assert!(trace.points.iter().any(|p| p.near(Vector::new(15.0, 0.0), 1e-6)));
        assert!(trace.points.iter().any(|p| p.near(Vector::new(20.0, 5.0), 1e-6)));
        // Every bend sample stays within the fillet's quarter-circle box
        for p in &trace.points {
            assert!(p.x <= 20.0 + 1e-6 && p.y >= -1e-6);
        }
        // Circular fillet: samples sit one radius from the center
        let center = Vector::new(15.0, 5.0);
        for p in trace.points.iter().filter(|p| p.x > 15.0 && p.y < 5.0) {
            assert!(((*p - center).length() - 5.0).abs() < 1e-3);
        }
    }
    #[test]
    fn short_segment_rejected() {
        let (_, tpl) = single_layer();
        let wg = Waveguide::new(
            tpl,
            vec![
                Vector::zero(),
                Vector::new(4.0, 0.0),
                Vector::new(4.0, 20.0),
            ],
            0.4,
            5.0,
        );
        // Incoming leg of length 4 cannot hold a radius-5 bend
        let err = wg.build(grid());
        assert!(matches!(err, Err(LayoutError::Geometry(_))));
    }
    #[test]
    fn consecutive_corners_need_double_radius() {
        let (_, tpl) = single_layer();
        // Two corners 8 apart with radius 5: 8 < 2 * 5
        let wg = Waveguide::new(
            tpl,
            vec![
                Vector::zero(),
                Vector::new(20.0, 0.0),
                Vector::new(20.0, 8.0),
                Vector::new(40.0, 8.0),
            ],
            0.4,
            5.0,
        );
        let err = wg.build(grid());
        assert!(matches!(err, Err(LayoutError::Geometry(_))));
    }
    #[test]
    fn end_ports() {
        let (_, tpl) = single_layer();
        let wg = Waveguide::new(
            tpl,
            vec![
                Vector::zero(),
                Vector::new(20.0, 0.0),
                Vector::new(20.0, 20.0),
            ],
            0.4,
            5.0,
        );
        let comp = wg.build(grid()).unwrap();
        let input = comp.get_port("in").unwrap();
        assert_eq!(input.position, Vector::zero());
        assert!((input.direction - 180.0).abs() < 1e-9);
        let output = comp.get_port("out").unwrap();
        assert_eq!(output.position, Vector::new(20.0, 20.0));
        assert!((output.direction - 90.0).abs() < 1e-9);
        assert!((output.width - 0.4).abs() < 1e-9);
    }
    #[test]
    fn augmentation_widens_long_runs() {
        let (_, tpl) = single_layer();
        let wg = Waveguide::new(
            tpl,
            vec![Vector::zero(), Vector::new(50.0, 0.0), Vector::new(100.0, 0.0)],
            0.4,
            5.0,
        )
        .augmented(3.0, 10.0);
        let comp = wg.build(grid()).unwrap();
        // One base trace plus one widened-section polygon
        let traces = comp
            .shapes
            .iter()
            .filter(|(_, s)| matches!(s, Shape::Trace(_)))
            .count();
        let polys: Vec<&Shape> = comp
            .shapes
            .iter()
            .filter(|(_, s)| matches!(s, Shape::Polygon(_)))
            .map(|(_, s)| s)
            .collect();
        assert_eq!(traces, 1);
        assert_eq!(polys.len(), 1);
        // The widened section reaches the augmented width
        let bbox = polys[0].bbox();
        assert!((bbox.height() - 3.0).abs() < 1e-6);
        // And tapers keep clear of the path ends
        assert!(bbox.min.x >= -1e-9 && bbox.max.x <= 100.0 + 1e-9);
    }
    #[test]
    fn aug_template_must_cover() {
        let (mut layers, tpl) = single_layer();
        let other = layers.add_layer("slab", 2, 0);
        let mut aug = TraceTemplate::new();
        aug.add("slab", vec![TraceSpec::new(other, 6.0, 0.0)]);
        let wg = Waveguide::new(
            tpl,
            vec![Vector::zero(), Vector::new(100.0, 0.0)],
            0.4,
            5.0,
        )
        .augmented(3.0, 10.0)
        .aug_template(aug);
        let err = wg.build(grid());
        assert!(matches!(err, Err(LayoutError::Validation(_))));
    }
}
