//! Runtime attribute state: a named, typed, insertion-ordered set of values.

use crate::types::value::{AttributeType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An attribute with the set of values observed for it so far.
///
/// Values form an ordered set: insertion order is preserved and membership is
/// decided by `(type, raw)` equality. The set only ever grows within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(default)]
    pub values: Vec<Value>,
    /// Per-attribute overrides for matcher template parameters
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            values: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    /// Add a value unless an equal one is already present.
    /// Returns true if the set grew.
    pub fn add_value(&mut self, value: Value) -> bool {
        if self.values.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Values with a non-empty serialized form, in insertion order
    pub fn query_values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_blank())
    }
}
