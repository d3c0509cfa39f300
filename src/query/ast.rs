//! Structured boolean query tree.
//!
//! Queries are assembled as a tree of `Clause` values and serialized to JSON
//! once at the backend boundary, so placeholder substitution only ever has to
//! be escape-safe inside matcher templates.

use serde_json::{json, Map, Value as Json};

/// Which boolean occurrence combines a group of clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combiner {
    Should,
    Filter,
}

/// One node of a boolean query
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// A populated matcher clause or other raw query fragment
    Leaf(Json),
    /// A `bool` query with its occurrence lists
    Bool {
        must_not: Vec<Clause>,
        filter: Vec<Clause>,
        should: Vec<Clause>,
    },
}

impl Clause {
    pub fn empty_bool() -> Self {
        Clause::Bool {
            must_not: Vec::new(),
            filter: Vec::new(),
            should: Vec::new(),
        }
    }

    pub fn bool_should(should: Vec<Clause>) -> Self {
        Clause::Bool {
            must_not: Vec::new(),
            filter: Vec::new(),
            should,
        }
    }

    pub fn bool_filter(filter: Vec<Clause>) -> Self {
        Clause::Bool {
            must_not: Vec::new(),
            filter,
            should: Vec::new(),
        }
    }

    /// Wrap clauses under the given combiner
    pub fn bool_with(combiner: Combiner, clauses: Vec<Clause>) -> Self {
        match combiner {
            Combiner::Should => Clause::bool_should(clauses),
            Combiner::Filter => Clause::bool_filter(clauses),
        }
    }

    /// Combine clauses: none yields nothing, a single clause stays unwrapped,
    /// two or more are wrapped in a `bool` under the combiner.
    pub fn combine(combiner: Combiner, mut clauses: Vec<Clause>) -> Option<Clause> {
        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(Clause::bool_with(combiner, clauses)),
        }
    }

    /// Serialize this clause to its JSON form.
    ///
    /// `must_not` and `should` always serialize as arrays; a singleton
    /// `filter` serializes as a bare object, matching the query shapes the
    /// backend receives.
    pub fn to_json(&self) -> Json {
        match self {
            Clause::Leaf(raw) => raw.clone(),
            Clause::Bool {
                must_not,
                filter,
                should,
            } => {
                let mut body = Map::new();
                if !must_not.is_empty() {
                    body.insert(
                        "must_not".to_string(),
                        Json::Array(must_not.iter().map(Clause::to_json).collect()),
                    );
                }
                if filter.len() == 1 {
                    body.insert("filter".to_string(), filter[0].to_json());
                } else if !filter.is_empty() {
                    body.insert(
                        "filter".to_string(),
                        Json::Array(filter.iter().map(Clause::to_json).collect()),
                    );
                }
                if !should.is_empty() {
                    body.insert(
                        "should".to_string(),
                        Json::Array(should.iter().map(Clause::to_json).collect()),
                    );
                }
                if body.is_empty() {
                    json!({})
                } else {
                    json!({ "bool": body })
                }
            }
        }
    }
}
