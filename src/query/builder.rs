//! Per-attribute and per-index-field clause construction.

use crate::error::{ResolutionError, Result};
use crate::model::Model;
use crate::query::ast::{Clause, Combiner};
use crate::types::Attribute;
use std::collections::BTreeMap;

/// Build one clause per index field mapped to an attribute.
///
/// For each field with a usable matcher, every non-blank value of the
/// attribute populates the matcher template. Two or more value clauses for a
/// field are wrapped in a `bool` under the combiner; a single clause stays
/// unwrapped; fields with no clauses contribute nothing. Fields are visited
/// in lexicographic order.
pub fn make_index_field_clauses(
    model: &Model,
    index_name: &str,
    attributes: &BTreeMap<String, Attribute>,
    attribute_name: &str,
    combiner: Combiner,
) -> Result<Vec<Clause>> {
    let Some(attribute) = attributes.get(attribute_name) else {
        return Ok(Vec::new());
    };
    let Some(index) = model.indices.get(index_name) else {
        return Ok(Vec::new());
    };

    let mut index_field_clauses = Vec::new();
    for field_name in index.fields_for_attribute(attribute_name) {
        let Some(matcher) = model.field_matcher(index_name, field_name) else {
            continue;
        };

        let mut value_clauses = Vec::new();
        for value in attribute.query_values() {
            let populated = matcher.populate(field_name, &value.serialized, attribute)?;
            let raw = serde_json::from_str(&populated).map_err(|e| {
                ResolutionError::validation(format!(
                    "'matchers.{}' produced invalid JSON for field '{}': {}",
                    matcher.name, field_name, e
                ))
            })?;
            value_clauses.push(Clause::Leaf(raw));
        }

        if let Some(clause) = Clause::combine(combiner, value_clauses) {
            index_field_clauses.push(clause);
        }
    }
    Ok(index_field_clauses)
}

/// Build one clause per attribute in the set, visiting attributes in
/// lexicographic order. Multi-field results are wrapped under the combiner;
/// attributes with no usable clauses are skipped.
pub fn make_attribute_clauses(
    model: &Model,
    index_name: &str,
    attributes: &BTreeMap<String, Attribute>,
    combiner: Combiner,
) -> Result<Vec<Clause>> {
    let mut attribute_clauses = Vec::new();
    for attribute_name in attributes.keys() {
        let index_field_clauses =
            make_index_field_clauses(model, index_name, attributes, attribute_name, combiner)?;
        if let Some(clause) = Clause::combine(combiner, index_field_clauses) {
            attribute_clauses.push(clause);
        }
    }
    Ok(attribute_clauses)
}
