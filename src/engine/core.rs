//! Core ResolutionJob struct and constructor

use crate::backend::SearchBackend;
use crate::engine::cancel::CancelToken;
use crate::engine::config::JobConfig;
use crate::engine::input::Input;
use crate::types::Attribute;
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One entity resolution run over a search backend.
///
/// A job is single-threaded: it queries indices serially within a hop and
/// hops serially until no new attribute values turn up or the hop limit is
/// reached. A job instance is not safe for concurrent reuse, but distinct
/// jobs share no mutable state and may run in parallel.
pub struct ResolutionJob {
    pub(crate) backend: Arc<dyn SearchBackend>,
    pub(crate) input: Input,
    pub(crate) config: JobConfig,
    pub(crate) cancel: CancelToken,

    // Job state, reset when the job is reused
    pub(crate) attributes: BTreeMap<String, Attribute>,
    pub(crate) doc_ids: BTreeMap<String, BTreeSet<String>>,
    pub(crate) hits: Vec<Json>,
    pub(crate) queries: Vec<Json>,
    pub(crate) hop: i64,
    pub(crate) ran: bool,
}

impl ResolutionJob {
    pub fn new(backend: Arc<dyn SearchBackend>, input: Input) -> Self {
        Self {
            backend,
            input,
            config: JobConfig::default(),
            cancel: CancelToken::new(),
            attributes: BTreeMap::new(),
            doc_ids: BTreeMap::new(),
            hits: Vec::new(),
            queries: Vec::new(),
            hop: 0,
            ran: false,
        }
    }

    pub fn with_config(mut self, config: JobConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Reset the state fields in case the same job object is reused
    pub(crate) fn reset_state(&mut self) {
        self.attributes = self.input.attributes.clone();
        self.doc_ids = BTreeMap::new();
        self.hits = Vec::new();
        self.queries = Vec::new();
        self.hop = 0;
        self.ran = false;
    }
}
