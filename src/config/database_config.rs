use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the database connection pool. All sizing knobs are fixed
/// at backend construction and not adjustable at runtime.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file. When not set, the server falls back to the
    /// in-memory backend and data is lost on restart.
    pub path: Option<PathBuf>,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Minimum number of idle connections the pool maintains.
    pub min_connections: u32,
    /// Maximum lifetime of a single pooled connection, in seconds.
    pub max_lifetime_sec: u64,
    /// Time to wait for a free connection before giving up, in seconds.
    pub acquire_timeout_sec: u64,
    /// Queries slower than this threshold are logged as slow, in milliseconds.
    pub slow_query_threshold_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 25,
            min_connections: 5,
            max_lifetime_sec: 3600,
            acquire_timeout_sec: 10,
            slow_query_threshold_ms: 200,
        }
    }
}
