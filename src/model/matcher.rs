//! Matcher clause templates and placeholder substitution.

use crate::error::{ResolutionError, Result};
use crate::types::Attribute;
use regex::{NoExpand, Regex};
use std::collections::BTreeMap;

/// Pattern that recognizes `{{ var }}` placeholders in a clause template
const PLACEHOLDER: &str = r"\{\{\s*([A-Za-z0-9_\-]+)\s*\}\}";

/// A reusable clause template with placeholders for the index field name,
/// the value, and arbitrary named parameters.
///
/// The template is a JSON fragment in textual form, e.g.
/// `{ "match": { "{{ field }}": {{ value }} } }`. String values arrive
/// already escaped and quoted, so the `{{ value }}` placeholder is written
/// without surrounding quotes.
#[derive(Debug, Clone)]
pub struct MatcherSpec {
    pub name: String,
    pub clause: String,
    pub params: BTreeMap<String, String>,
    /// Placeholder name to its precompiled pattern, derived from `clause`
    variables: BTreeMap<String, Regex>,
}

impl MatcherSpec {
    pub fn new(
        name: impl Into<String>,
        clause: impl Into<String>,
        params: BTreeMap<String, String>,
    ) -> Self {
        let name = name.into();
        let clause = clause.into();
        let variables = Self::index_variables(&clause);
        Self {
            name,
            clause,
            params,
            variables,
        }
    }

    /// Compile one pattern per distinct placeholder so duplicated
    /// placeholders are all replaced in a single pass.
    fn index_variables(clause: &str) -> BTreeMap<String, Regex> {
        let scanner = Regex::new(PLACEHOLDER).expect("placeholder pattern is valid");
        let mut variables = BTreeMap::new();
        for capture in scanner.captures_iter(clause) {
            let variable = capture[1].to_string();
            variables.entry(variable.clone()).or_insert_with(|| {
                let pattern = format!(r"\{{\{{\s*{}\s*\}}\}}", regex::escape(&variable));
                Regex::new(&pattern).expect("escaped placeholder pattern is valid")
            });
        }
        variables
    }

    /// Substitute `{{ field }}`, `{{ value }}`, and named parameters into the
    /// clause template.
    ///
    /// Named parameters resolve from the attribute's params first, then the
    /// matcher's defaults. A placeholder with no value anywhere is a
    /// validation error. Replacements are literal text and are not rescanned.
    pub fn populate(&self, field: &str, value: &str, attribute: &Attribute) -> Result<String> {
        let mut clause = self.clause.clone();
        for (variable, pattern) in &self.variables {
            let replacement = match variable.as_str() {
                "field" => field,
                "value" => value,
                name => attribute
                    .params
                    .get(name)
                    .or_else(|| self.params.get(name))
                    .map(String::as_str)
                    .ok_or_else(|| {
                        ResolutionError::validation(format!(
                            "'matchers.{}' was given no value for '{{{{ {} }}}}'",
                            self.name, name
                        ))
                    })?,
            };
            clause = pattern.replace_all(&clause, NoExpand(replacement)).into_owned();
        }
        Ok(clause)
    }
}
