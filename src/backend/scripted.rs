//! A scripted backend that replays canned responses.
//!
//! Used by the traversal tests and the demo server. Each index holds a queue
//! of responses; every search pops the next one, or returns an empty result
//! once the queue runs dry. Submitted requests are recorded for inspection.

use crate::backend::SearchBackend;
use crate::error::{ResolutionError, Result};
use serde_json::{json, Value as Json};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// A recorded search request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub index: String,
    pub body: String,
}

#[derive(Default)]
struct ScriptState {
    responses: BTreeMap<String, VecDeque<Json>>,
    requests: Vec<RecordedRequest>,
    fail_next: bool,
}

/// Backend double replaying a per-index queue of canned responses
#[derive(Default)]
pub struct ScriptedBackend {
    state: Mutex<ScriptState>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full response document for an index
    pub fn enqueue_response(&self, index: impl Into<String>, response: Json) {
        self.state
            .lock()
            .expect("scripted backend lock poisoned")
            .responses
            .entry(index.into())
            .or_default()
            .push_back(response);
    }

    /// Queue a response containing the given hit documents
    pub fn enqueue_hits(&self, index: impl Into<String>, hits: Vec<Json>) {
        self.enqueue_response(index, json!({ "hits": { "hits": hits } }));
    }

    /// Make the next search fail with a backend error
    pub fn fail_next(&self) {
        self.state
            .lock()
            .expect("scripted backend lock poisoned")
            .fail_next = true;
    }

    /// Requests seen so far, in submission order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .lock()
            .expect("scripted backend lock poisoned")
            .requests
            .clone()
    }

    fn empty_response() -> Json {
        json!({ "hits": { "hits": [] } })
    }
}

impl SearchBackend for ScriptedBackend {
    fn search(&self, index_name: &str, query_body: &str) -> Result<Json> {
        let mut state = self.state.lock().expect("scripted backend lock poisoned");
        state.requests.push(RecordedRequest {
            index: index_name.to_string(),
            body: query_body.to_string(),
        });
        if state.fail_next {
            state.fail_next = false;
            return Err(ResolutionError::Backend("scripted failure".to_string()));
        }
        Ok(state
            .responses
            .get_mut(index_name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(Self::empty_response))
    }
}
