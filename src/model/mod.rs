//! The entity model: attributes, matchers, resolvers, and indices.
//!
//! Models arrive as JSON documents and are validated eagerly so the planner
//! and traversal engine can assume a well-formed model throughout a job.

pub mod index;
pub mod matcher;
pub mod store;

pub use index::{IndexField, IndexSpec};
pub use matcher::MatcherSpec;
pub use store::{InMemoryModelStore, ModelStore};

use crate::error::{ResolutionError, Result};
use crate::types::AttributeType;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Declaration of an attribute in the entity model
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub attr_type: AttributeType,
}

/// A resolver: the set of attributes that must all match on a document for
/// that document to resolve to the entity
#[derive(Debug, Clone)]
pub struct ResolverSpec {
    pub attributes: Vec<String>,
}

/// A validated entity model
#[derive(Debug, Clone)]
pub struct Model {
    pub attributes: BTreeMap<String, AttributeSpec>,
    pub resolvers: BTreeMap<String, ResolverSpec>,
    pub matchers: BTreeMap<String, MatcherSpec>,
    pub indices: BTreeMap<String, IndexSpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModel {
    #[serde(default)]
    attributes: BTreeMap<String, RawAttribute>,
    #[serde(default)]
    resolvers: BTreeMap<String, RawResolver>,
    #[serde(default)]
    matchers: BTreeMap<String, RawMatcher>,
    #[serde(default)]
    indices: BTreeMap<String, RawIndex>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAttribute {
    #[serde(rename = "type", default)]
    attr_type: AttributeType,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResolver {
    attributes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMatcher {
    clause: String,
    #[serde(default)]
    params: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIndex {
    fields: BTreeMap<String, RawIndexField>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIndexField {
    attribute: String,
    #[serde(default)]
    matcher: Option<String>,
    #[serde(default)]
    quality: Option<f64>,
}

impl Model {
    /// Parse and validate a model from JSON text
    pub fn parse(text: &str) -> Result<Self> {
        let value: Json = serde_json::from_str(text)
            .map_err(|e| ResolutionError::validation(format!("entity model is not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    /// Parse and validate a model from an already-parsed JSON document
    pub fn from_value(value: &Json) -> Result<Self> {
        if !value.is_object() {
            return Err(ResolutionError::validation("entity model must be an object"));
        }
        let raw: RawModel = serde_json::from_value(value.clone())
            .map_err(|e| ResolutionError::validation(format!("entity model is malformed: {}", e)))?;

        if raw.attributes.is_empty() {
            return Err(ResolutionError::validation("entity model has no attributes"));
        }
        if raw.resolvers.is_empty() {
            return Err(ResolutionError::validation("entity model has no resolvers"));
        }
        if raw.matchers.is_empty() {
            return Err(ResolutionError::validation("entity model has no matchers"));
        }
        if raw.indices.is_empty() {
            return Err(ResolutionError::validation("entity model has no indices"));
        }

        let mut attributes = BTreeMap::new();
        for (name, attribute) in raw.attributes {
            check_name("attributes", &name)?;
            attributes.insert(name, AttributeSpec { attr_type: attribute.attr_type });
        }

        let mut resolvers = BTreeMap::new();
        for (name, resolver) in raw.resolvers {
            check_name("resolvers", &name)?;
            if resolver.attributes.is_empty() {
                return Err(ResolutionError::validation(format!(
                    "'resolvers.{}' has no attributes",
                    name
                )));
            }
            for attribute in &resolver.attributes {
                if !attributes.contains_key(attribute) {
                    return Err(ResolutionError::validation(format!(
                        "'resolvers.{}' references undeclared attribute '{}'",
                        name, attribute
                    )));
                }
            }
            resolvers.insert(name, ResolverSpec { attributes: resolver.attributes });
        }

        let mut matchers = BTreeMap::new();
        for (name, matcher) in raw.matchers {
            check_name("matchers", &name)?;
            if matcher.clause.trim().is_empty() {
                return Err(ResolutionError::validation(format!(
                    "'matchers.{}' has an empty clause",
                    name
                )));
            }
            matchers.insert(name.clone(), MatcherSpec::new(name, matcher.clause, matcher.params));
        }

        let mut indices = BTreeMap::new();
        for (name, index) in raw.indices {
            check_name("indices", &name)?;
            if index.fields.is_empty() {
                return Err(ResolutionError::validation(format!(
                    "'indices.{}' has no fields",
                    name
                )));
            }
            let mut fields = BTreeMap::new();
            for (field_name, field) in index.fields {
                fields.insert(
                    field_name.clone(),
                    IndexField::new(field_name, field.attribute, field.matcher, field.quality)?,
                );
            }
            indices.insert(name, IndexSpec::new(fields));
        }

        Ok(Self {
            attributes,
            resolvers,
            matchers,
            indices,
        })
    }

    /// The matcher usable for an index field, if the field names one and the
    /// model defines it
    pub fn field_matcher(&self, index_name: &str, field_name: &str) -> Option<&MatcherSpec> {
        let field = self.indices.get(index_name)?.fields.get(field_name)?;
        self.matchers.get(field.matcher.as_deref()?)
    }

    /// Restrict the model's indices to the given names.
    /// Unknown names are request errors.
    pub fn retain_indices(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            if !self.indices.contains_key(name) {
                return Err(ResolutionError::bad_request(format!(
                    "'{}' is not in the 'indices' field of the entity model",
                    name
                )));
            }
        }
        self.indices.retain(|name, _| names.contains(name));
        Ok(())
    }

    /// Restrict the model's resolvers to the given names.
    /// Unknown names are request errors.
    pub fn retain_resolvers(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            if !self.resolvers.contains_key(name) {
                return Err(ResolutionError::bad_request(format!(
                    "'{}' is not in the 'resolvers' field of the entity model",
                    name
                )));
            }
        }
        self.resolvers.retain(|name, _| names.contains(name));
        Ok(())
    }
}

/// Periods are reserved for dotted field paths, so they are forbidden in
/// attribute, resolver, matcher, and index names.
fn check_name(section: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ResolutionError::validation(format!(
            "'{}' contains an entry with an empty name",
            section
        )));
    }
    if name.contains('.') {
        return Err(ResolutionError::validation(format!(
            "'{}.{}' must not have periods in its name",
            section, name
        )));
    }
    Ok(())
}
