//! The search backend boundary.

pub mod scripted;

pub use scripted::ScriptedBackend;

use crate::error::Result;
use serde_json::Value as Json;

/// An opaque document search service.
///
/// The engine submits one query body at a time and expects responses shaped
/// as `{ "hits": { "hits": [ { "_id", "_source", ... } ] } }`. The body must
/// be forwarded to the store untouched. Implementations must be safe for
/// sequential calls from a job; distinct jobs may call concurrently.
pub trait SearchBackend: Send + Sync {
    fn search(&self, index_name: &str, query_body: &str) -> Result<Json>;
}
