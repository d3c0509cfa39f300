//! Resolver filter tree planning.
//!
//! Attributes shared by many resolvers are pulled toward the root of the
//! tree, so resolvers with common attributes share a prefix path and the
//! backend can factor the common constraints.

use crate::error::Result;
use crate::model::Model;
use crate::query::ast::{Clause, Combiner};
use crate::query::builder::make_index_field_clauses;
use crate::types::Attribute;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Nested attribute tree for the active resolvers; leaves are empty maps
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterTree(pub BTreeMap<String, FilterTree>);

/// Count how many of the given resolvers each attribute appears in
pub fn count_attributes_across_resolvers(
    model: &Model,
    resolvers: &[String],
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for resolver_name in resolvers {
        if let Some(resolver) = model.resolvers.get(resolver_name) {
            for attribute_name in &resolver.attributes {
                *counts.entry(attribute_name.clone()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Sort each resolver's attributes, descending by cross-resolver count and
/// ascending by name within a count
pub fn sort_resolver_attributes(
    model: &Model,
    resolvers: &[String],
    counts: &BTreeMap<String, usize>,
) -> Vec<Vec<String>> {
    let mut resolvers_sorted = Vec::with_capacity(resolvers.len());
    for resolver_name in resolvers {
        let Some(resolver) = model.resolvers.get(resolver_name) else {
            continue;
        };
        let mut groups: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        for attribute_name in &resolver.attributes {
            let count = counts.get(attribute_name).copied().unwrap_or(0);
            groups.entry(count).or_default().insert(attribute_name.clone());
        }
        let mut resolver_sorted = Vec::new();
        for (_, names) in groups.iter().rev() {
            resolver_sorted.extend(names.iter().cloned());
        }
        resolvers_sorted.push(resolver_sorted);
    }
    resolvers_sorted
}

/// Insert each resolver's sorted attribute sequence as a path, reusing
/// existing nodes so common prefixes are shared
pub fn make_filter_tree(resolvers_sorted: &[Vec<String>]) -> FilterTree {
    let mut root = FilterTree::default();
    for resolver_sorted in resolvers_sorted {
        let mut current = &mut root;
        for attribute_name in resolver_sorted {
            current = current.0.entry(attribute_name.clone()).or_default();
        }
    }
    root
}

/// Emit the boolean clause for a filter tree.
///
/// The outer `should` lets any resolver path fire; the `filter` chain down a
/// path requires every attribute along it to match. Returns `None` when no
/// attribute at this level produced a clause.
pub fn populate_filter_tree(
    model: &Model,
    index_name: &str,
    tree: &FilterTree,
    attributes: &BTreeMap<String, Attribute>,
) -> Result<Option<Clause>> {
    let mut attribute_clauses = Vec::new();
    for (attribute_name, subtree) in &tree.0 {
        let index_field_clauses =
            make_index_field_clauses(model, index_name, attributes, attribute_name, Combiner::Should)?;
        let Some(fields_clause) = Clause::combine(Combiner::Should, index_field_clauses) else {
            continue;
        };

        match populate_filter_tree(model, index_name, subtree, attributes)? {
            Some(child) => {
                attribute_clauses.push(Clause::bool_filter(vec![fields_clause, child]));
            }
            None => attribute_clauses.push(fields_clause),
        }
    }

    Ok(match attribute_clauses.len() {
        0 => None,
        1 => Some(Clause::bool_filter(attribute_clauses)),
        _ => Some(Clause::bool_should(attribute_clauses)),
    })
}
