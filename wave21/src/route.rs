//!
//! # Port-to-Port Routing
//!
//! Produces a feasible bent polyline joining two oriented, equal-width
//! ports under a spacing/radius clearance, preferring the fewest
//! necessary bends.
//!
//! The algorithm walks a short partial path forward from each port (to
//! guarantee room for a bend at the port itself), classifies the
//! relative heading of the two ports, decomposes the remaining gap onto
//! the first path's tangent and normal, and emits one of three connector
//! topologies: a direct lateral jog, a single corner, or a three-move
//! wraparound. The reversed second partial path is spliced on last, so
//! the route starts and ends exactly at the port positions.
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::component::{Port, PortRef};
use crate::error::{LayoutError, LayoutResult};
use crate::geom::{radians, Grid, Vector, TOL};
use crate::path::QuickPath;
use crate::tech::DesignRules;

/// Parallelism threshold for heading classification
const ANGLE_TOL: f64 = 1e-6;

/// # Route Rule
///
/// The clearance constraints a route must respect, derived from a bend
/// radius and the process minimum-spacing rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RouteRule {
    /// Minimum radius of curvature at bends
    pub bend_radius: f64,
    /// Minimum spacing design rule
    pub min_spacing: f64,
}
impl RouteRule {
    pub fn new(bend_radius: f64, min_spacing: f64) -> Self {
        Self {
            bend_radius,
            min_spacing,
        }
    }
    /// Construct from the process design rules (`MIN_SPACE`) and a bend
    /// radius
    pub fn from_rules(bend_radius: f64, rules: &DesignRules) -> LayoutResult<Self> {
        Ok(Self {
            bend_radius,
            min_spacing: rules.require("MIN_SPACE")?,
        })
    }
    /// Minimum clearance any route segment must leave around a port:
    /// enough room for one bend or one spacing interval, whichever is
    /// larger
    pub fn clearance(&self) -> f64 {
        self.bend_radius.max(self.min_spacing)
    }
}

/// # Route Classification
///
/// The relative geometry of the two port headings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RouteClass {
    /// Both ports head the same way
    SameDirection,
    /// The ports head into each other
    Facing,
    /// The ports head away from each other
    BackToBack,
    /// The second heading is a clockwise turn from the first
    Clockwise,
    /// The second heading is a counter-clockwise turn from the first
    CounterClockwise,
}

/// Classify the pair of outward headings `da`, `db` separated by `sep`.
/// The ambiguous anti-parallel case (no longitudinal separation) logs a
/// warning and falls back to [RouteClass::Facing].
pub fn classify(da: Vector, db: Vector, sep: Vector) -> RouteClass {
    let cross = da.cross(db);
    if cross.abs() > ANGLE_TOL {
        return if cross > 0.0 {
            RouteClass::CounterClockwise
        } else {
            RouteClass::Clockwise
        };
    }
    if da.dot(db) > 0.0 {
        return RouteClass::SameDirection;
    }
    let along = da.dot(sep);
    if along > TOL {
        RouteClass::Facing
    } else if along < -TOL {
        RouteClass::BackToBack
    } else {
        log::warn!(
            "ambiguous anti-parallel port pair with no longitudinal separation; routing as facing"
        );
        RouteClass::Facing
    }
}

/// # Connection
///
/// The result of routing: an ordered polyline plus snapshots of the two
/// ports it joins. The polyline's first and last points equal the port
/// positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub path: Vec<Vector>,
    pub port_a: Port,
    pub port_b: Port,
    pub rule: RouteRule,
}
impl Connection {
    /// Length traveled along the connection
    pub fn length(&self) -> f64 {
        self.path.windows(2).map(|w| (w[1] - w[0]).length()).sum()
    }
}

/// Connector topology between the two partial-path endpoints
enum Connector {
    /// The endpoint gap itself is the connector segment
    Direct,
    /// One corner: a tangent move, then a normal move
    Corner,
    /// Three moves: lateral overshoot, tangential crossing, lateral
    /// return of exactly the clearance
    Wrap,
}

/// Route between two projected ports. See [route_ports].
pub fn route(a: &PortRef, b: &PortRef, rule: &RouteRule, grid: Grid) -> LayoutResult<Connection> {
    route_ports(&a.resolve(), &b.resolve(), rule, grid)
}

/// Route between two oriented, equal-width ports, producing a polyline
/// that leaves `a` along its outward normal and enters `b` against its
/// outward normal.
pub fn route_ports(a: &Port, b: &Port, rule: &RouteRule, grid: Grid) -> LayoutResult<Connection> {
    if (a.width - b.width).abs() > TOL {
        return LayoutError::invalid(format!(
            "cannot connect ports '{}' (width {}) and '{}' (width {}) of different width",
            a.name, a.width, b.name, b.width
        ));
    }
    let c = rule.clearance();
    let sep = b.position - a.position;
    if sep.length() < 2.0 * c {
        return LayoutError::infeasible(format!(
            "ports '{}' and '{}' are too close to fit any bend: distance {:.4} < {:.4}",
            a.name,
            b.name,
            sep.length(),
            2.0 * c
        ));
    }
    let da = Vector::from_angle(radians(a.direction));
    let db = Vector::from_angle(radians(b.direction));

    // Partial paths: walk one clearance out of each port
    let mut pa = QuickPath::new(a.position, a.direction, grid);
    pa.forward(c);
    let mut pb = QuickPath::new(b.position, b.direction, grid);
    pb.forward(c);

    let class = classify(da, db, sep);
    let t = da;
    let n = da.perp();

    // Decompose the endpoint gap onto the first path's frame
    let gap = pb.end().unwrap() - pa.end().unwrap();
    let dt = gap.dot(t);
    let dn = gap.dot(n);

    let connector = match class {
        RouteClass::SameDirection => {
            if dn.abs() < c - TOL {
                // Too little lateral room for a clean jog; a direct
                // connector would fold back on the far spur
                log::warn!(
                    "lateral offset {:.4} between ports '{}' and '{}' is below the clearance {:.4}; adding a wraparound jog",
                    dn.abs(),
                    a.name,
                    b.name,
                    c
                );
                Connector::Wrap
            } else {
                // Zero the tangential residual by extending whichever
                // side is behind; the remaining gap is the lateral jog.
                if dt > TOL {
                    pa.forward(dt);
                } else if dt < -TOL {
                    pb.forward(-dt);
                }
                Connector::Direct
            }
        }
        RouteClass::Facing => {
            if dt >= -TOL {
                // Split the longitudinal span evenly, centering the jog
                let half = (dt / 2.0).max(0.0);
                if half > TOL {
                    pa.forward(half);
                    pb.forward(half);
                }
                if dn.abs() > TOL && dn.abs() < c - TOL {
                    log::warn!(
                        "lateral jog {:.4} between ports '{}' and '{}' is below the clearance {:.4}",
                        dn.abs(),
                        a.name,
                        b.name,
                        c
                    );
                }
                Connector::Direct
            } else {
                // Facing, but each port sits behind the other's walk:
                // wrap around instead of folding back
                log::warn!(
                    "facing ports '{}' and '{}' overlap longitudinally; wrapping around",
                    a.name,
                    b.name
                );
                Connector::Wrap
            }
        }
        RouteClass::BackToBack => Connector::Wrap,
        RouteClass::Clockwise | RouteClass::CounterClockwise => {
            if dt < TOL {
                log::warn!(
                    "turn between ports '{}' and '{}' lands behind the first bend; wrapping around",
                    a.name,
                    b.name
                );
                Connector::Wrap
            } else {
                if dt < c - TOL || dn.abs() < c - TOL {
                    log::warn!(
                        "bend between ports '{}' and '{}' is closer than the clearance {:.4}",
                        a.name,
                        b.name,
                        c
                    );
                }
                Connector::Corner
            }
        }
    };

    match connector {
        Connector::Direct => (),
        Connector::Corner => {
            // Tangent move first, then the splice supplies the normal
            // move; the corner sits where the two port axes meet.
            let corner = pa.end().unwrap() + t * dt;
            pa.to(corner);
        }
        Connector::Wrap => {
            // Choose the return-leg side so the final approach cannot
            // fold into the spliced spur: never return along `db`.
            let dbn = db.dot(n);
            let w = if dbn > ANGLE_TOL {
                -c
            } else if dbn < -ANGLE_TOL {
                c
            } else if dn < -TOL {
                c
            } else {
                -c
            };
            let m1 = pa.end().unwrap() + n * (dn - w);
            let m2 = m1 + t * dt;
            pa.to(m1);
            pa.to(m2);
            // m2 + w*n lands exactly on the far partial-path endpoint
        }
    }

    // Splice the reversed second partial path and merge degenerate
    // zero-length stubs
    pb.reverse();
    let tail: Vec<Vector> = pb.points().to_vec();
    pa.extend(&tail);
    pa.clean(None);

    Ok(Connection {
        path: pa.into_points(),
        port_a: a.clone(),
        port_b: b.clone(),
        rule: *rule,
    })
}

/// Route through an ordered list of oriented waypoints: each `(position,
/// heading-degrees)` pair is a point the route passes through traveling
/// along `heading`. Chains the two-port algorithm pairwise and
/// concatenates the pieces.
pub fn route_via(
    a: &PortRef,
    waypoints: &[(Vector, f64)],
    b: &PortRef,
    rule: &RouteRule,
    grid: Grid,
) -> LayoutResult<Connection> {
    let pa = a.resolve();
    let pb = b.resolve();
    let width = pa.width;

    let mut path: Vec<Vector> = Vec::new();
    let mut from = pa.clone();
    for (i, (pos, heading)) in waypoints.iter().enumerate() {
        // Entering the waypoint traveling along `heading` means its
        // inbound face looks back against the travel direction
        let inbound = Port::new(
            format!("via{}", i),
            *pos,
            crate::geom::wrap_degrees(heading + 180.0),
            width,
        );
        let leg = route_ports(&from, &inbound, rule, grid)?;
        splice(&mut path, leg.path);
        // Leaving the waypoint, the outward heading is the travel
        // direction itself
        from = Port::new(format!("via{}", i), *pos, *heading, width);
    }
    let leg = route_ports(&from, &pb, rule, grid)?;
    splice(&mut path, leg.path);

    Ok(Connection {
        path,
        port_a: pa,
        port_b: pb,
        rule: *rule,
    })
}

/// Append `leg` to `path`, dropping the duplicated junction point
fn splice(path: &mut Vec<Vector>, leg: Vec<Vector>) {
    if path.is_empty() {
        path.extend(leg);
        return;
    }
    let last = *path.last().unwrap();
    path.extend(leg.into_iter().skip_while(|p| p.near(last, TOL)));
}
