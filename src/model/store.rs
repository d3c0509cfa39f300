//! Storage of entity models by entity type.

use crate::error::{ResolutionError, Result};
use crate::model::Model;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Supplies validated models for named entity types
pub trait ModelStore: Send + Sync {
    /// Load the model for an entity type, or `NotFound`
    fn load(&self, entity_type: &str) -> Result<Model>;
}

/// A process-local model store
#[derive(Default)]
pub struct InMemoryModelStore {
    models: RwLock<BTreeMap<String, Model>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the model for an entity type
    pub fn put(&self, entity_type: impl Into<String>, model: Model) {
        self.models
            .write()
            .expect("model store lock poisoned")
            .insert(entity_type.into(), model);
    }

    pub fn entity_types(&self) -> Vec<String> {
        self.models
            .read()
            .expect("model store lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl ModelStore for InMemoryModelStore {
    fn load(&self, entity_type: &str) -> Result<Model> {
        self.models
            .read()
            .expect("model store lock poisoned")
            .get(entity_type)
            .cloned()
            .ok_or_else(|| ResolutionError::NotFound(entity_type.to_string()))
    }
}
