//! The resolution engine.
//!
//! This module is organized into the following submodules:
//! - `constants`: Job configuration defaults
//! - `config`: Job configuration (`JobConfig`)
//! - `cancel`: Cooperative cancellation token
//! - `input`: Job input (seed attributes, model, scope)
//! - `core`: Core `ResolutionJob` struct, constructor, and state reset
//! - `execution`: The hop loop (query, harvest, terminate)

pub mod cancel;
pub mod config;
pub mod constants;
pub mod core;
pub mod execution;
pub mod input;

// Re-export main types for convenience
pub use cancel::CancelToken;
pub use config::JobConfig;
pub use constants::*;
pub use core::ResolutionJob;
pub use input::{Input, Scope};
