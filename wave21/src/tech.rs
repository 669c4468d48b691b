//!
//! # Technology Data
//!
//! Process layers, design rules, and trace cross-section templates.
//! These are plain configuration consumed by the router and waveguide
//! builder; loading them from vendor file formats is an external
//! collaborator's job, which hands the core the same structures defined
//! here.
//!

// Crates.io
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

// Local imports
use crate::error::{LayoutError, LayoutResult};

new_key_type! {
    /// Keys for [ProcessLayer] entries
    pub struct LayerKey;
}

/// # Process Layer
///
/// A fabrication layer matched to its GDSII `(layer, datatype)` pair,
/// plus display properties used by viewers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessLayer {
    /// Human-readable layer name
    pub name: String,
    /// GDSII layer number
    pub layer: i16,
    /// GDSII datatype number
    pub datatype: i16,
    /// Whether shapes on this layer are exported
    pub export: bool,
    /// Optional documentation string
    pub doc: Option<String>,
    /// Display fill color, as given by the technology source
    pub face_color: Option<String>,
    /// Display frame color
    pub edge_color: Option<String>,
    /// Display dither/fill pattern
    pub pattern: Option<String>,
}
impl ProcessLayer {
    pub fn new(name: impl Into<String>, layer: i16, datatype: i16) -> Self {
        Self {
            name: name.into(),
            layer,
            datatype,
            export: true,
            doc: None,
            face_color: None,
            edge_color: None,
            pattern: None,
        }
    }
}

/// # Layer Set & Manager
///
/// Keeps track of active process layers, indexed by name and by
/// `(layer, datatype)` pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layers {
    slots: SlotMap<LayerKey, ProcessLayer>,
    names: IndexMap<String, LayerKey>,
}
impl Layers {
    /// Add a [ProcessLayer], returning its key.
    /// A repeated name replaces the earlier mapping.
    pub fn add(&mut self, layer: ProcessLayer) -> LayerKey {
        let name = layer.name.clone();
        let key = self.slots.insert(layer);
        self.names.insert(name, key);
        key
    }
    /// Shorthand: add a new exported layer by name/number/datatype
    pub fn add_layer(&mut self, name: impl Into<String>, layer: i16, datatype: i16) -> LayerKey {
        self.add(ProcessLayer::new(name, layer, datatype))
    }
    /// Get a layer by key
    pub fn get(&self, key: LayerKey) -> Option<&ProcessLayer> {
        self.slots.get(key)
    }
    /// Get a layer's key by name
    pub fn keyname(&self, name: &str) -> Option<LayerKey> {
        self.names.get(name).copied()
    }
    /// Get a layer by name
    pub fn name(&self, name: &str) -> Option<&ProcessLayer> {
        let key = self.names.get(name)?;
        self.slots.get(*key)
    }
    /// Get a layer by its `(layer, datatype)` spec pair
    pub fn by_spec(&self, layer: i16, datatype: i16) -> Option<&ProcessLayer> {
        self.slots
            .values()
            .find(|l| l.layer == layer && l.datatype == datatype)
    }
    /// Get a layer by name, or a [LayoutError::NotFound]
    pub fn require(&self, name: &str) -> LayoutResult<LayerKey> {
        self.keyname(name)
            .ok_or_else(|| LayoutError::NotFound(format!("layer '{}'", name)))
    }
    /// Iterate over layers marked for export
    pub fn exported(&self) -> impl Iterator<Item = (LayerKey, &ProcessLayer)> {
        self.slots.iter().filter(|(_, l)| l.export)
    }
    /// Number of layers
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// # Design Rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub name: String,
    pub value: f64,
    pub doc: Option<String>,
}

/// # Design Rules
///
/// Named numeric constraints supplied by the process, consumed by the
/// router (`MIN_WIDTH`, `MIN_SPACE`) and validation passes. Constructed
/// with the customary defaults; technology loaders override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignRules {
    rules: IndexMap<String, Rule>,
}
impl DesignRules {
    pub fn new() -> Self {
        let mut rules = Self {
            rules: IndexMap::new(),
        };
        rules.add_rule("MIN_WIDTH", 0.1, Some("Minimum element width"));
        rules.add_rule("MIN_SPACE", 0.2, Some("Minimum spacing around element"));
        rules.add_rule("MIN_SPACE_DT", 1.0, Some("Minimum spacing to nearest deep trench"));
        rules.add_rule("MIN_DENSITY", 0.2, Some("Minimum material density ratio"));
        rules.add_rule("MAX_DENSITY", 0.7, Some("Maximum material density ratio"));
        rules
    }
    /// Add or replace a rule
    pub fn add_rule(&mut self, name: impl Into<String>, value: f64, doc: Option<&str>) {
        let name = name.into();
        self.rules.insert(
            name.clone(),
            Rule {
                name,
                value,
                doc: doc.map(|d| d.to_string()),
            },
        );
    }
    /// Get a rule value by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.rules.get(name).map(|r| r.value)
    }
    /// Get a rule value by name, or a [LayoutError::NotFound]
    pub fn require(&self, name: &str) -> LayoutResult<f64> {
        self.get(name)
            .ok_or_else(|| LayoutError::NotFound(format!("design rule '{}'", name)))
    }
    /// Update an existing rule's value
    pub fn set(&mut self, name: &str, value: f64) -> LayoutResult<()> {
        match self.rules.get_mut(name) {
            Some(rule) => {
                rule.value = value;
                Ok(())
            }
            None => LayoutError::not_found(format!("design rule '{}'", name)),
        }
    }
    /// Remove a rule
    pub fn remove(&mut self, name: &str) -> LayoutResult<Rule> {
        self.rules
            .shift_remove(name)
            .ok_or_else(|| LayoutError::NotFound(format!("design rule '{}'", name)))
    }
}
impl Default for DesignRules {
    fn default() -> Self {
        Self::new()
    }
}

/// # Trace Specification
///
/// One layer's slice of a cross-section: the trace width and its
/// perpendicular offset from the shared centerline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TraceSpec {
    pub layer: LayerKey,
    pub width: f64,
    pub offset: f64,
}
impl TraceSpec {
    pub fn new(layer: LayerKey, width: f64, offset: f64) -> Self {
        Self {
            layer,
            width,
            offset,
        }
    }
}

/// # Trace Template
///
/// The cross-section a single centerline expands into: per logical layer
/// name, one or more [TraceSpec]s (a layer name may fabricate several
/// parallel traces, e.g. a core plus cladding exclusion strips).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceTemplate {
    spec: IndexMap<String, Vec<TraceSpec>>,
}
impl TraceTemplate {
    pub fn new() -> Self {
        Self::default()
    }
    /// Add the specs fabricated for logical layer `name`
    pub fn add(&mut self, name: impl Into<String>, specs: Vec<TraceSpec>) -> &mut Self {
        self.spec.insert(name.into(), specs);
        self
    }
    /// Iterate `(name, specs)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<TraceSpec>)> {
        self.spec.iter()
    }
    /// Look up one logical layer's specs
    pub fn get(&self, name: &str) -> Option<&Vec<TraceSpec>> {
        self.spec.get(name)
    }
    /// The logical layer names, in insertion order
    pub fn layer_names(&self) -> impl Iterator<Item = &String> {
        self.spec.keys()
    }
    /// True when every logical layer of `other` is present here
    pub fn covers(&self, other: &TraceTemplate) -> bool {
        other.spec.keys().all(|k| self.spec.contains_key(k))
    }
    pub fn len(&self) -> usize {
        self.spec.len()
    }
    pub fn is_empty(&self) -> bool {
        self.spec.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_lookup() {
        let mut layers = Layers::default();
        let wg = layers.add_layer("wg_core", 1, 0);
        layers.add_layer("wg_clad", 1, 2);
        assert_eq!(layers.len(), 2);
        assert_eq!(layers.keyname("wg_core"), Some(wg));
        assert_eq!(layers.name("wg_clad").unwrap().datatype, 2);
        assert_eq!(layers.by_spec(1, 0).unwrap().name, "wg_core");
        assert!(layers.require("heater").is_err());
    }
    #[test]
    fn rule_defaults_and_overrides() {
        let mut rules = DesignRules::new();
        assert_eq!(rules.get("MIN_SPACE"), Some(0.2));
        rules.set("MIN_SPACE", 0.35).unwrap();
        assert_eq!(rules.require("MIN_SPACE").unwrap(), 0.35);
        assert!(rules.set("NOPE", 1.0).is_err());
    }
    #[test]
    fn template_coverage() {
        let mut layers = Layers::default();
        let core = layers.add_layer("core", 1, 0);
        let clad = layers.add_layer("clad", 2, 0);

        let mut tpl = TraceTemplate::new();
        tpl.add("core", vec![TraceSpec::new(core, 0.5, 0.0)]);

        let mut aug = TraceTemplate::new();
        aug.add("core", vec![TraceSpec::new(core, 3.0, 0.0)]);
        aug.add("clad", vec![TraceSpec::new(clad, 6.0, 0.0)]);

        assert!(aug.covers(&tpl));
        assert!(!tpl.covers(&aug));
    }
}
