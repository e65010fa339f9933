use std::collections::HashMap;

use chrono::Utc;
use tracetree_core::error::Result;
use tracetree_core::model::span::Span;

use crate::TraceStore;
use crate::store::TraceEntry;

impl TraceStore {
    /// Appends every span to its trace's collection. Nothing is validated or
    /// deduplicated: a repeated span id is stored again.
    pub fn ingest(&self, spans: &[Span]) -> Result<usize> {
        if spans.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut traces = self.write()?;
        for span in spans {
            let entry = traces
                .entry(span.trace_id.clone())
                .or_insert_with(|| TraceEntry {
                    spans: Vec::new(),
                    first_ingest: now,
                    last_ingest: now,
                });
            entry.spans.push(span.clone());
            entry.last_ingest = now;
        }

        let evicted = evict_least_recent(&mut traces, self.limits().max_traces);
        if evicted > 0 {
            tracing::debug!(evicted, "trace cap reached, evicted oldest traces");
        }
        tracing::debug!(count = spans.len(), traces = traces.len(), "spans ingested");
        Ok(spans.len())
    }
}

/// Drops traces with the oldest `last_ingest` until at most `max` remain.
pub(crate) fn evict_least_recent(traces: &mut HashMap<String, TraceEntry>, max: usize) -> usize {
    if traces.len() <= max {
        return 0;
    }

    let mut by_age: Vec<(chrono::DateTime<Utc>, String)> = traces
        .iter()
        .map(|(id, entry)| (entry.last_ingest, id.clone()))
        .collect();
    by_age.sort();

    let excess = traces.len() - max;
    for (_, id) in by_age.into_iter().take(excess) {
        traces.remove(&id);
    }
    excess
}
