//! Property values: literals, output references and string templates.
//!
//! A property bag describes the desired shape of a resource. Values are
//! either plain JSON literals or placeholders for attributes of other
//! resources that only become known after provisioning.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::reference::OutputReference;

/// One part of a string template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text.
    Literal(String),
    /// Placeholder for a resource attribute.
    Reference(OutputReference),
}

/// Builder for interpolated strings mixing literal text with references,
/// e.g. `rg-iot-{suffix}-{env}` where the suffix is a generated attribute.
#[derive(Debug, Clone, Default)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(TemplatePart::Literal(text.into()));
        self
    }

    /// Append an output reference.
    pub fn output(mut self, reference: OutputReference) -> Self {
        self.parts.push(TemplatePart::Reference(reference));
        self
    }

    /// Finish the template as a property value.
    pub fn build(self) -> PropertyValue {
        PropertyValue::Template(self.parts)
    }
}

/// A value in a resource property bag.
///
/// Literals are resolved as-is. References and templates suspend resolution
/// until the referenced resources have been provisioned.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A plain JSON value.
    Literal(Value),
    /// A deferred handle to another resource's attribute.
    Reference(OutputReference),
    /// An interpolated string with embedded references.
    Template(Vec<TemplatePart>),
    /// A nested object whose values may themselves contain references.
    Object(BTreeMap<String, PropertyValue>),
    /// An array whose elements may contain references.
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Build a nested object value.
    pub fn object(entries: Vec<(&str, PropertyValue)>) -> Self {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// Build an array value.
    pub fn array(elements: Vec<PropertyValue>) -> Self {
        Self::Array(elements)
    }

    /// Collect every output reference embedded in this value.
    pub fn collect_references(&self, out: &mut Vec<OutputReference>) {
        match self {
            Self::Literal(_) => {}
            Self::Reference(r) => out.push(r.clone()),
            Self::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Reference(r) = part {
                        out.push(r.clone());
                    }
                }
            }
            Self::Object(entries) => {
                for value in entries.values() {
                    value.collect_references(out);
                }
            }
            Self::Array(elements) => {
                for value in elements {
                    value.collect_references(out);
                }
            }
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Literal(Value::String(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<OutputReference> for PropertyValue {
    fn from(reference: OutputReference) -> Self {
        Self::Reference(reference)
    }
}

impl From<Template> for PropertyValue {
    fn from(template: Template) -> Self {
        template.build()
    }
}

/// Render a resolved JSON value into a template string segment.
///
/// Strings are spliced raw; everything else uses its JSON rendering.
pub(crate) fn render_fragment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An ordered bag of named property values.
///
/// Ordering is stable (BTreeMap) so that resolved bags compare and
/// serialize deterministically for diffing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// In-place insert.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect every output reference embedded in the bag.
    pub fn collect_references(&self) -> Vec<OutputReference> {
        let mut refs = Vec::new();
        for value in self.entries.values() {
            value.collect_references(&mut refs);
        }
        refs
    }
}
