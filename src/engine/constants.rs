//! Job configuration defaults, shared with the request layer

pub const DEFAULT_INCLUDE_ATTRIBUTES: bool = true;
pub const DEFAULT_INCLUDE_HITS: bool = true;
pub const DEFAULT_INCLUDE_QUERIES: bool = false;
pub const DEFAULT_INCLUDE_SOURCE: bool = true;
pub const DEFAULT_MAX_DOCS_PER_QUERY: usize = 1000;
pub const DEFAULT_MAX_HOPS: i64 = 100;
pub const DEFAULT_PRETTY: bool = false;
pub const DEFAULT_PROFILE: bool = false;

/// `max_hops` value meaning "no hop limit"
pub const UNLIMITED_HOPS: i64 = -1;
