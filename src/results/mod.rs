//! Response envelope types for resolution jobs.

use serde::Serialize;
use serde_json::Value as Json;

/// The hits section of a resolution response
#[derive(Debug, Clone, Serialize)]
pub struct HitsEnvelope {
    pub total: usize,
    pub hits: Vec<Json>,
}

/// The full response envelope: `{"took", "hits"?, "queries"?}`.
///
/// Field order is fixed so identical runs serialize byte-identically.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResponse {
    /// Job duration in milliseconds
    pub took: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<HitsEnvelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<Json>>,
}

impl ResolutionResponse {
    /// Format the response as compact JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Format the response as pretty JSON
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}
