//! Final query assembly for one index.

use crate::error::Result;
use crate::model::Model;
use crate::query::ast::{Clause, Combiner};
use crate::query::builder::make_attribute_clauses;
use crate::query::planner::{
    count_attributes_across_resolvers, make_filter_tree, populate_filter_tree,
    sort_resolver_attributes, FilterTree,
};
use crate::types::Attribute;
use serde_json::{json, Map, Value as Json};
use std::collections::{BTreeMap, BTreeSet};

/// Whether a resolver can be queried on an index with the current attribute
/// state: every one of its attributes must be present with at least one
/// non-blank value, be mapped to at least one field of the index, and at
/// least one such field must have a defined matcher.
pub fn can_query(
    model: &Model,
    index_name: &str,
    resolver_name: &str,
    attributes: &BTreeMap<String, Attribute>,
) -> bool {
    let Some(resolver) = model.resolvers.get(resolver_name) else {
        return false;
    };
    let Some(index) = model.indices.get(index_name) else {
        return false;
    };
    for attribute_name in &resolver.attributes {
        let Some(attribute) = attributes.get(attribute_name) else {
            return false;
        };
        if attribute.query_values().next().is_none() {
            return false;
        }
        let fields = index.fields_for_attribute(attribute_name);
        if fields.is_empty() {
            return false;
        }
        if !fields
            .iter()
            .any(|f| model.field_matcher(index_name, f).is_some())
        {
            return false;
        }
    }
    true
}

/// An assembled query for one index, plus the planning artifacts that go
/// into the query log
#[derive(Debug)]
pub struct QueryAssembly {
    pub body: Json,
    pub resolvers: Vec<String>,
    pub filter_tree: FilterTree,
}

/// Assemble the query body for an index, or `None` if no resolver applies.
///
/// `must_not` excludes already-seen document ids and the exclude-scope
/// attributes; `filter` holds the include-scope attributes and the resolver
/// tree clause.
#[allow(clippy::too_many_arguments)]
pub fn assemble(
    model: &Model,
    index_name: &str,
    attributes: &BTreeMap<String, Attribute>,
    scope_include: &BTreeMap<String, Attribute>,
    scope_exclude: &BTreeMap<String, Attribute>,
    doc_ids: &BTreeSet<String>,
    max_docs_per_query: usize,
    profile: bool,
) -> Result<Option<QueryAssembly>> {
    let resolvers: Vec<String> = model
        .resolvers
        .keys()
        .filter(|name| can_query(model, index_name, name, attributes))
        .cloned()
        .collect();
    if resolvers.is_empty() {
        return Ok(None);
    }

    let mut must_not = Vec::new();
    if !doc_ids.is_empty() {
        let ids: Vec<&String> = doc_ids.iter().collect();
        must_not.push(Clause::Leaf(json!({ "ids": { "values": ids } })));
    }
    if !scope_exclude.is_empty() {
        let clauses = make_attribute_clauses(model, index_name, scope_exclude, Combiner::Should)?;
        match clauses.len() {
            0 => {}
            1 => must_not.extend(clauses),
            _ => must_not.push(Clause::bool_should(clauses)),
        }
    }

    let mut filter = Vec::new();
    if !scope_include.is_empty() {
        let clauses = make_attribute_clauses(model, index_name, scope_include, Combiner::Filter)?;
        match clauses.len() {
            0 => {}
            1 => filter.extend(clauses),
            _ => filter.push(Clause::bool_filter(clauses)),
        }
    }

    let counts = count_attributes_across_resolvers(model, &resolvers);
    let resolvers_sorted = sort_resolver_attributes(model, &resolvers, &counts);
    let filter_tree = make_filter_tree(&resolvers_sorted);
    if let Some(resolvers_clause) =
        populate_filter_tree(model, index_name, &filter_tree, attributes)?
    {
        filter.push(resolvers_clause);
    }

    let query = Clause::Bool {
        must_not,
        filter,
        should: Vec::new(),
    };

    let mut body = Map::new();
    body.insert("query".to_string(), query.to_json());
    body.insert("size".to_string(), json!(max_docs_per_query));
    if profile {
        body.insert("profile".to_string(), json!(true));
    }

    Ok(Some(QueryAssembly {
        body: Json::Object(body),
        resolvers,
        filter_tree,
    }))
}
