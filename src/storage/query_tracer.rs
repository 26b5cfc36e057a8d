use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Records start time, statement text and parameter summary for every
/// database operation and classifies it as slow or normal against a
/// configurable threshold. A pure observability side-channel: it never alters
/// query results or error outcomes.
#[derive(Debug, Clone)]
pub struct QueryTracer {
    slow_threshold: Duration,
}

impl QueryTracer {
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }

    pub async fn trace<T, F>(&self, statement: &str, params: &str, query: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = Instant::now();
        let result = query.await;
        let elapsed = start.elapsed();

        if elapsed > self.slow_threshold {
            warn!(statement, params, elapsed_ms = elapsed.as_millis() as u64, "Slow SQL query.");
        } else {
            debug!(statement, params, elapsed_ms = elapsed.as_millis() as u64, "SQL query.");
        }

        result
    }
}
