//!
//! # Wave21 Photonic Circuit Layout
//!
//! A planar layout and routing engine for photonic/electronic chip
//! design: parametric components, hierarchical placement of reusable
//! geometry with port projection, a port-to-port router producing
//! design-rule-aware bent connections, and a multi-layer waveguide
//! builder turning centerlines into manufacturable traces.
//!
//! The typical flow: build a [component::Component] once from
//! parameters, place it into a [layout::Layout] any number of times,
//! route between the projected ports with [layout::Layout::connect],
//! hand each routed polyline to a [waveguide::Waveguide] builder, and
//! flatten everything to plain vertex records with
//! [export::Exporter] for the external GDS codec.
//!

// Internal modules & re-exports
pub use wave21utils as utils;

pub mod bbox;
pub mod component;
pub mod error;
pub mod export;
pub mod geom;
pub mod layout;
pub mod path;
pub mod route;
pub mod shape;
pub mod tech;
pub mod waveguide;

pub use bbox::{BoundBox, BoundBoxTrait};
pub use component::{
    Component, ComponentArray, ComponentBuilder, ComponentLibrary, ComponentRef, Port, PortRef,
};
pub use error::{LayoutError, LayoutResult};
pub use export::{ExportCell, ExportInstance, ExportLabel, ExportLibrary, ExportPolygon, Exporter};
pub use geom::{Compass, Grid, PlaceRecord, Transform, Vector};
pub use layout::{Layout, PlaceParams, PlaceTarget, Placement};
pub use path::QuickPath;
pub use route::{route, route_via, Connection, RouteClass, RouteRule};
pub use shape::{Polygon, Shape, ShapeTrait, Text, Trace};
pub use tech::{DesignRules, LayerKey, Layers, ProcessLayer, TraceSpec, TraceTemplate};
pub use waveguide::{BendStyle, Waveguide};

/// Unit Tests Module
#[cfg(test)]
mod tests;
