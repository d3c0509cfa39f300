//! Job configuration types

use crate::engine::constants::*;

/// Output and traversal options for a resolution job
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Annotate each hit with the attributes harvested from it
    pub include_attributes: bool,
    /// Include the hits envelope in the response
    pub include_hits: bool,
    /// Log each query and its (hit-stripped) response in the response
    pub include_queries: bool,
    /// Keep `_source` on each hit
    pub include_source: bool,
    pub max_docs_per_query: usize,
    /// Hop limit; -1 means unbounded
    pub max_hops: i64,
    pub pretty: bool,
    /// Ask the backend to profile queries; implies query logging
    pub profile: bool,
}

impl Default for JobConfig {
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
