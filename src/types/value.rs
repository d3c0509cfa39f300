//! Typed attribute values harvested from documents or supplied as seeds.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Logical type of an attribute declared in the entity model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    Date,
}

impl Default for AttributeType {
    fn default() -> Self {
        AttributeType::String
    }
}

/// A single attribute value.
///
/// `raw` is the typed JSON form used for set membership; `serialized` is the
/// JSON literal text substituted into matcher templates. Strings serialize
/// escaped and quoted, numbers and booleans in literal form, and null
/// serializes to the empty string (which the clause builder skips).
///
/// Two values are equal iff their `(type, raw)` pairs are equal, so the
/// number `1` and the string `"1"` are distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Value {
    #[serde(rename = "type")]
    pub value_type: AttributeType,
    pub raw: Json,
    pub serialized: String,
}

impl Value {
    /// Convert a JSON leaf into a value of the given attribute type.
    ///
    /// Leaves that do not fit the declared type keep their textual form so
    /// that a malformed document cannot abort a traversal.
    pub fn create(value_type: AttributeType, node: &Json) -> Self {
        let raw = match value_type {
            AttributeType::Number => match node {
                Json::Number(_) => node.clone(),
                Json::String(s) => s
                    .parse::<i64>()
                    .map(Json::from)
                    .or_else(|_| s.parse::<f64>().map(Json::from))
                    .unwrap_or_else(|_| Json::String(s.clone())),
                other => Self::textual(other),
            },
            AttributeType::Boolean => match node {
                Json::Bool(_) => node.clone(),
                other => Self::textual(other),
            },
            AttributeType::String | AttributeType::Date => Self::textual(node),
        };
        let serialized = match &raw {
            Json::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            value_type,
            raw,
            serialized,
        }
    }

    fn textual(node: &Json) -> Json {
        match node {
            Json::String(_) | Json::Null => node.clone(),
            other => Json::String(other.to_string()),
        }
    }

    /// Whether this value contributes to queries
    pub fn is_blank(&self) -> bool {
        self.serialized.is_empty()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.value_type == other.value_type && self.raw == other.raw
    }
}
