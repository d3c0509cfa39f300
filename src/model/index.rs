//! Index definitions: which document fields map to which attributes.

use crate::error::{ResolutionError, Result};
use std::collections::BTreeMap;

/// A field of an index, mapped to an attribute and optionally a matcher.
///
/// `path` is the JSON-pointer form of the dotted field name, used to read the
/// value out of a document's `_source`. Multi-fields such as `name.keyword`
/// are not stored in `_source`, so `path_parent` keeps the pointer with the
/// last segment removed as a fallback; single-segment names have no parent.
#[derive(Debug, Clone)]
pub struct IndexField {
    pub name: String,
    pub attribute: String,
    pub matcher: Option<String>,
    pub quality: Option<f64>,
    pub path: String,
    pub path_parent: Option<String>,
}

impl IndexField {
    pub fn new(
        name: impl Into<String>,
        attribute: impl Into<String>,
        matcher: Option<String>,
        quality: Option<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let attribute = attribute.into();
        if name.trim().is_empty() {
            return Err(ResolutionError::validation("index field names must not be empty"));
        }
        if attribute.trim().is_empty() {
            return Err(ResolutionError::validation(format!(
                "index field '{}' must name a non-empty attribute",
                name
            )));
        }
        if let Some(matcher) = &matcher {
            if matcher.trim().is_empty() {
                return Err(ResolutionError::validation(format!(
                    "index field '{}' must name a non-empty matcher when one is given",
                    name
                )));
            }
        }
        if let Some(quality) = quality {
            if !(0.0..=1.0).contains(&quality) {
                return Err(ResolutionError::validation(format!(
                    "index field '{}' quality must be between 0.0 and 1.0",
                    name
                )));
            }
        }
        let segments: Vec<&str> = name.split('.').collect();
        let path = format!("/{}", segments.join("/"));
        let path_parent = if segments.len() > 1 {
            Some(format!("/{}", segments[..segments.len() - 1].join("/")))
        } else {
            None
        };
        Ok(Self {
            name,
            attribute,
            matcher,
            quality,
            path,
            path_parent,
        })
    }
}

/// An index and the derived attribute-to-fields lookup.
#[derive(Debug, Clone, Default)]
pub struct IndexSpec {
    pub fields: BTreeMap<String, IndexField>,
    /// Attribute name to the (lexicographically ordered) names of the fields
    /// mapped to it. Holds keys into `fields`, not copies.
    pub attribute_fields: BTreeMap<String, Vec<String>>,
}

impl IndexSpec {
    pub fn new(fields: BTreeMap<String, IndexField>) -> Self {
        let mut attribute_fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (field_name, field) in &fields {
            attribute_fields
                .entry(field.attribute.clone())
                .or_default()
                .push(field_name.clone());
        }
        Self {
            fields,
            attribute_fields,
        }
    }

    /// Names of the fields mapped to an attribute, or an empty slice
    pub fn fields_for_attribute(&self, attribute: &str) -> &[String] {
        self.attribute_fields
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
