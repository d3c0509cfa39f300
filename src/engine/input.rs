//! Job input: the model, the seed attributes, and the scope.

use crate::model::Model;
use crate::types::Attribute;
use std::collections::BTreeMap;

/// Request-time filters constraining which documents are eligible.
///
/// Index and resolver scoping is applied to the model before a job starts;
/// the attribute scopes here feed the assembler's `filter` and `must_not`
/// clauses on every query.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub include: BTreeMap<String, Attribute>,
    pub exclude: BTreeMap<String, Attribute>,
}

/// Everything a resolution job needs to run
#[derive(Debug, Clone)]
pub struct Input {
    pub model: Model,
    pub attributes: BTreeMap<String, Attribute>,
    pub scope: Scope,
}

impl Input {
    pub fn new(model: Model, attributes: BTreeMap<String, Attribute>) -> Self {
        Self {
            model,
            attributes,
            scope: Scope::default(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}
