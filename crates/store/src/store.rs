use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracetree_core::error::{Result, TraceTreeError};
use tracetree_core::model::span::Span;
use tracetree_core::query::StatusResponse;

#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub max_traces: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self { max_traces: 10_000 }
    }
}

/// Spans received for one trace, in arrival order.
#[derive(Debug, Clone)]
pub(crate) struct TraceEntry {
    pub spans: Vec<Span>,
    pub first_ingest: DateTime<Utc>,
    pub last_ingest: DateTime<Utc>,
}

/// Append-only span buffer keyed by trace id.
///
/// Clones share the same map. Reads copy spans out under the read lock, so a
/// caller's snapshot never changes underneath it.
#[derive(Clone)]
pub struct TraceStore {
    traces: Arc<RwLock<HashMap<String, TraceEntry>>>,
    limits: StoreLimits,
}

impl TraceStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            traces: Arc::new(RwLock::new(HashMap::new())),
            limits,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(StoreLimits::default())
    }

    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, TraceEntry>>> {
        self.traces
            .read()
            .map_err(|_| TraceTreeError::Store("trace store lock poisoned".to_string()))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, TraceEntry>>> {
        self.traces
            .write()
            .map_err(|_| TraceTreeError::Store("trace store lock poisoned".to_string()))
    }

    pub fn status(&self) -> Result<StatusResponse> {
        let traces = self.read()?;
        Ok(StatusResponse {
            trace_count: traces.len(),
            span_count: traces.values().map(|t| t.spans.len()).sum(),
            max_traces: self.limits.max_traces,
            oldest_ingest: traces.values().map(|t| t.first_ingest).min(),
            newest_ingest: traces.values().map(|t| t.last_ingest).max(),
        })
    }
}
