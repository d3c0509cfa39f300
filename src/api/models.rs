//! Request and response models for the resolution API.

use crate::engine::constants::*;
use crate::engine::{JobConfig, Scope};
use crate::error::{ResolutionError, Result};
use crate::model::Model;
use crate::types::{Attribute, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Query parameters accepted by the resolution endpoint
#[derive(Debug, Deserialize)]
pub struct ResolutionParams {
    /// Annotate each hit with its harvested attributes
    #[serde(rename = "_attributes", default = "default_include_attributes")]
    pub include_attributes: bool,
    /// Include the hits envelope in the response
    #[serde(rename = "hits", default = "default_include_hits")]
    pub include_hits: bool,
    /// Log queries and responses in the response
    #[serde(rename = "queries", default = "default_include_queries")]
    pub include_queries: bool,
    /// Keep `_source` on each hit
    #[serde(rename = "_source", default = "default_include_source")]
    pub include_source: bool,
    #[serde(default = "default_max_docs_per_query")]
    pub max_docs_per_query: usize,
    #[serde(default = "default_max_hops")]
    pub max_hops: i64,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    #[serde(default = "default_profile")]
    pub profile: bool,
}

fn default_include_attributes() -> bool {
    DEFAULT_INCLUDE_ATTRIBUTES
}
fn default_include_hits() -> bool {
    DEFAULT_INCLUDE_HITS
}
fn default_include_queries() -> bool {
    DEFAULT_INCLUDE_QUERIES
}
fn default_include_source() -> bool {
    DEFAULT_INCLUDE_SOURCE
}
fn default_max_docs_per_query() -> usize {
    DEFAULT_MAX_DOCS_PER_QUERY
}
fn default_max_hops() -> i64 {
    DEFAULT_MAX_HOPS
}
fn default_pretty() -> bool {
    DEFAULT_PRETTY
}
fn default_profile() -> bool {
    DEFAULT_PROFILE
}

impl Default for ResolutionParams {
    fn default() -> Self {
        Self {
            include_attributes: DEFAULT_INCLUDE_ATTRIBUTES,
            include_hits: DEFAULT_INCLUDE_HITS,
            include_queries: DEFAULT_INCLUDE_QUERIES,
            include_source: DEFAULT_INCLUDE_SOURCE,
            max_docs_per_query: DEFAULT_MAX_DOCS_PER_QUERY,
            max_hops: DEFAULT_MAX_HOPS,
            pretty: DEFAULT_PRETTY,
            profile: DEFAULT_PROFILE,
        }
    }
}

impl From<ResolutionParams> for JobConfig {
    fn from(params: ResolutionParams) -> Self {
        Self {
            include_attributes: params.include_attributes,
            include_hits: params.include_hits,
            include_queries: params.include_queries,
            include_source: params.include_source,
            max_docs_per_query: params.max_docs_per_query,
            max_hops: params.max_hops,
            pretty: params.pretty,
            profile: params.profile,
        }
    }
}

/// Error response model
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error type
    pub error_type: String,
}

/// Index and resolver restrictions plus the attribute scope parsed from a
/// request body
#[derive(Debug, Default)]
pub struct RequestScope {
    pub indices: Vec<String>,
    pub resolvers: Vec<String>,
    pub attributes: Scope,
}

/// Resolve the entity type from the URL or the request body, but not both
pub fn parse_entity_type(entity_type_from_url: Option<&str>, body: &Json) -> Result<Option<String>> {
    let from_body = body
        .get("entity_type")
        .and_then(Json::as_str)
        .filter(|t| !t.is_empty());
    match entity_type_from_url.filter(|t| !t.is_empty()) {
        Some(from_url) => {
            if from_body.is_some() {
                return Err(ResolutionError::bad_request(
                    "'entity_type' must be specified in the request body or URL, but not both",
                ));
            }
            Ok(Some(from_url.to_string()))
        }
        None => Ok(from_body.map(str::to_string)),
    }
}

/// Parse the required `attributes` field of the request body into typed seed
/// attributes
pub fn parse_seed_attributes(body: &Json, model: &Model) -> Result<BTreeMap<String, Attribute>> {
    let Some(attributes) = body.get("attributes") else {
        return Err(ResolutionError::bad_request(
            "'attributes' field is missing from the request body",
        ));
    };
    let parsed = parse_attribute_map(attributes, model, "attributes")?;
    if parsed.is_empty() {
        return Err(ResolutionError::bad_request(
            "the 'attributes' field of the request body must not be empty",
        ));
    }
    Ok(parsed)
}

/// Parse a `{name: value | [values]}` map into typed attributes.
/// `context` names the field for error messages.
fn parse_attribute_map(
    node: &Json,
    model: &Model,
    context: &str,
) -> Result<BTreeMap<String, Attribute>> {
    let Some(entries) = node.as_object() else {
        return Err(ResolutionError::bad_request(format!(
            "'{}' must be an object of attribute values",
            context
        )));
    };
    let mut attributes = BTreeMap::new();
    for (name, values) in entries {
        if name.contains('.') {
            return Err(ResolutionError::bad_request(format!(
                "'{}.{}' must not have periods in its name",
                context, name
            )));
        }
        let Some(spec) = model.attributes.get(name) else {
            return Err(ResolutionError::bad_request(format!(
                "'{}.{}' is not an attribute of the entity model",
                context, name
            )));
        };
        let mut attribute = Attribute::new(name.clone(), spec.attr_type);
        match values {
            Json::Object(_) => {
                return Err(ResolutionError::bad_request(format!(
                    "'{}.{}' must be a scalar or an array of scalars",
                    context, name
                )));
            }
            Json::Array(values) => {
                for value in values {
                    if value.is_object() || value.is_array() {
                        return Err(ResolutionError::bad_request(format!(
                            "'{}.{}' must be a scalar or an array of scalars",
                            context, name
                        )));
                    }
                    attribute.add_value(Value::create(spec.attr_type, value));
                }
            }
            scalar => {
                attribute.add_value(Value::create(spec.attr_type, scalar));
            }
        }
        attributes.insert(name.clone(), attribute);
    }
    Ok(attributes)
}

/// Parse the optional `scope` field of the request body
pub fn parse_scope(body: &Json, model: &Model) -> Result<RequestScope> {
    let mut scope = RequestScope::default();
    let Some(node) = body.get("scope") else {
        return Ok(scope);
    };
    if node.is_null() {
        return Ok(scope);
    }
    if !node.is_object() {
        return Err(ResolutionError::bad_request(
            "the 'scope' field of the request body must be an object",
        ));
    }

    if let Some(indices) = node.get("indices") {
        scope.indices = parse_name_list(indices, "scope.indices", false)?;
    }
    if let Some(resolvers) = node.get("resolvers") {
        scope.resolvers = parse_name_list(resolvers, "scope.resolvers", true)?;
    }
    if let Some(include) = node.get("include") {
        if let Some(attributes) = include.get("attributes") {
            scope.attributes.include =
                parse_attribute_map(attributes, model, "scope.include.attributes")?;
        }
    }
    if let Some(exclude) = node.get("exclude") {
        if let Some(attributes) = exclude.get("attributes") {
            scope.attributes.exclude =
                parse_attribute_map(attributes, model, "scope.exclude.attributes")?;
        }
    }
    Ok(scope)
}

/// Accept a string or an array of non-empty strings
fn parse_name_list(node: &Json, context: &str, forbid_periods: bool) -> Result<Vec<String>> {
    let mut names = Vec::new();
    match node {
        Json::String(name) => names.push(name.clone()),
        Json::Array(entries) => {
            for entry in entries {
                let Some(name) = entry.as_str() else {
                    return Err(ResolutionError::bad_request(format!(
                        "'{}' must be a string or an array of strings",
                        context
                    )));
                };
                if name.is_empty() {
                    return Err(ResolutionError::bad_request(format!(
                        "'{}' must have non-empty strings",
                        context
                    )));
                }
                names.push(name.to_string());
            }
        }
        _ => {
            return Err(ResolutionError::bad_request(format!(
                "'{}' must be a string or an array of strings",
                context
            )));
        }
    }
    if forbid_periods {
        for name in &names {
            if name.contains('.') {
                return Err(ResolutionError::bad_request(format!(
                    "'{}' must not have periods in its values",
                    context
                )));
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> Model {
        Model::parse(
            r#"{
                "attributes": {
                    "name": { "type": "string" },
                    "age": { "type": "number" }
                },
                "resolvers": { "name": { "attributes": ["name"] } },
                "matchers": { "simple": { "clause": "{ \"match\": { \"{{ field }}\": {{ value }} } }" } },
                "indices": { "ppl": { "fields": { "name": { "attribute": "name", "matcher": "simple" } } } }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_entity_type_from_url_or_body_not_both() {
        let body = json!({"entity_type": "person"});
        assert_eq!(
            parse_entity_type(None, &body).unwrap(),
            Some("person".to_string())
        );
        assert_eq!(
            parse_entity_type(Some("person"), &json!({})).unwrap(),
            Some("person".to_string())
        );
        assert!(parse_entity_type(Some("person"), &body).is_err());
    }

    #[test]
    fn test_seed_attributes_scalar_and_array() {
        let body = json!({"attributes": {"name": "Alice", "age": [34, 35]}});
        let seeds = parse_seed_attributes(&body, &model()).unwrap();
        assert_eq!(seeds["name"].values.len(), 1);
        assert_eq!(seeds["age"].values.len(), 2);
        assert_eq!(seeds["age"].values[0].raw, json!(34));
    }

    #[test]
    fn test_seed_attributes_double_keeps_numeric_value() {
        let body = json!({"attributes": {"age": 3.5}});
        let seeds = parse_seed_attributes(&body, &model()).unwrap();
        assert_eq!(seeds["age"].values[0].raw, json!(3.5));
    }

    #[test]
    fn test_seed_attributes_reject_objects() {
        let model = model();
        let body = json!({"attributes": {"name": {"first": "Alice"}}});
        assert!(parse_seed_attributes(&body, &model).is_err());
        let body = json!({"attributes": {"name": [["Alice"]]}});
        assert!(parse_seed_attributes(&body, &model).is_err());
    }

    #[test]
    fn test_seed_attributes_missing_or_empty() {
        let model = model();
        assert!(parse_seed_attributes(&json!({}), &model).is_err());
        assert!(parse_seed_attributes(&json!({"attributes": {}}), &model).is_err());
    }

    #[test]
    fn test_seed_attributes_unknown_name() {
        let body = json!({"attributes": {"email": "a@b.c"}});
        assert!(parse_seed_attributes(&body, &model()).is_err());
    }

    #[test]
    fn test_scope_accepts_string_or_array() {
        let model = model();
        let scope = parse_scope(&json!({"scope": {"indices": "ppl"}}), &model).unwrap();
        assert_eq!(scope.indices, vec!["ppl"]);
        let scope = parse_scope(&json!({"scope": {"resolvers": ["name"]}}), &model).unwrap();
        assert_eq!(scope.resolvers, vec!["name"]);
    }

    #[test]
    fn test_scope_rejects_bad_shapes() {
        let model = model();
        assert!(parse_scope(&json!({"scope": "ppl"}), &model).is_err());
        assert!(parse_scope(&json!({"scope": {"indices": 7}}), &model).is_err());
        assert!(parse_scope(&json!({"scope": {"indices": [""]}}), &model).is_err());
        assert!(parse_scope(&json!({"scope": {"resolvers": ["a.b"]}}), &model).is_err());
    }

    #[test]
    fn test_scope_attribute_filters() {
        let model = model();
        let body = json!({"scope": {
            "include": {"attributes": {"name": "Alice"}},
            "exclude": {"attributes": {"name": ["Bob"]}}
        }});
        let scope = parse_scope(&body, &model).unwrap();
        assert_eq!(scope.attributes.include["name"].values.len(), 1);
        assert_eq!(scope.attributes.exclude["name"].values.len(), 1);
    }

    #[test]
    fn test_null_scope_is_empty() {
        let scope = parse_scope(&json!({"scope": null}), &model()).unwrap();
        assert!(scope.indices.is_empty());
        assert!(scope.resolvers.is_empty());
    }

    #[test]
    fn test_params_map_to_job_config() {
        let config: JobConfig = ResolutionParams::default().into();
        assert!(config.include_hits);
        assert_eq!(config.max_hops, DEFAULT_MAX_HOPS);
    }
}
