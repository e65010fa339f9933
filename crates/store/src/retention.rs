use std::time::Duration;

use chrono::{DateTime, Utc};
use tracetree_core::error::{Result, TraceTreeError};

use crate::TraceStore;
use crate::write::evict_least_recent;

impl TraceStore {
    pub fn run_retention(&self, ttl: Duration, max_traces: usize) -> Result<usize> {
        let expired = self.prune_ttl(ttl)?;
        let evicted = self.prune_count(max_traces)?;
        if expired + evicted > 0 {
            tracing::info!(expired, evicted, "retention pruned traces");
        }
        Ok(expired + evicted)
    }

    pub fn prune_ttl(&self, ttl: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl)
                .map_err(|e| TraceTreeError::Internal(format!("ttl conversion failed: {e}")))?;
        self.prune_older_than(cutoff)
    }

    /// Removes traces that have not received a span since `cutoff`.
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut traces = self.write()?;
        let before = traces.len();
        traces.retain(|_, entry| entry.last_ingest >= cutoff);
        Ok(before - traces.len())
    }

    pub fn prune_count(&self, max_traces: usize) -> Result<usize> {
        let mut traces = self.write()?;
        Ok(evict_least_recent(&mut traces, max_traces))
    }
}
