use tracetree_core::error::Result;
use tracetree_core::filter::SortOrder;
use tracetree_core::model::span::Span;
use tracetree_core::model::tree::TraceTree;
use tracetree_core::query::{TraceListItem, TracesRequest};
use tracetree_core::time::micros_to_datetime;
use tracetree_core::tree::build_tree;

use crate::TraceStore;

impl TraceStore {
    /// Copy of the spans stored for `trace_id`; empty when the trace is
    /// unknown.
    pub fn fetch_spans(&self, trace_id: &str) -> Result<Vec<Span>> {
        let traces = self.read()?;
        Ok(traces
            .get(trace_id)
            .map(|entry| entry.spans.clone())
            .unwrap_or_default())
    }

    pub fn build_tree(&self, trace_id: &str) -> Result<TraceTree> {
        let spans = self.fetch_spans(trace_id)?;
        let tree = build_tree(trace_id, &spans);
        tracing::debug!(
            trace_id,
            spans = spans.len(),
            status = tree.status.as_str(),
            "trace tree built"
        );
        Ok(tree)
    }

    pub fn list_traces(&self, req: &TracesRequest) -> Result<Vec<TraceListItem>> {
        let snapshot: Vec<(String, Vec<Span>)> = {
            let traces = self.read()?;
            traces
                .iter()
                .filter(|(_, entry)| match &req.service {
                    Some(filter) => entry.spans.iter().any(|s| filter.matches(&s.service_name)),
                    None => true,
                })
                .map(|(id, entry)| (id.clone(), entry.spans.clone()))
                .collect()
        };

        let mut items: Vec<TraceListItem> = snapshot
            .iter()
            .map(|(trace_id, spans)| list_item(trace_id, spans))
            .filter(|item| {
                micros_to_datetime(item.start_time_micros)
                    .map(|ts| req.window.contains(ts))
                    .unwrap_or(false)
            })
            .collect();

        match req.sort {
            SortOrder::StartAsc => items.sort_by(|a, b| {
                a.start_time_micros
                    .cmp(&b.start_time_micros)
                    .then_with(|| a.trace_id.cmp(&b.trace_id))
            }),
            SortOrder::StartDesc => items.sort_by(|a, b| {
                b.start_time_micros
                    .cmp(&a.start_time_micros)
                    .then_with(|| a.trace_id.cmp(&b.trace_id))
            }),
            SortOrder::DurationDesc => items.sort_by(|a, b| {
                b.duration_micros
                    .cmp(&a.duration_micros)
                    .then_with(|| a.trace_id.cmp(&b.trace_id))
            }),
        }
        items.truncate(req.limit);
        Ok(items)
    }
}

fn list_item(trace_id: &str, spans: &[Span]) -> TraceListItem {
    let tree = build_tree(trace_id, spans);
    let start = spans
        .iter()
        .map(|s| s.start_time_micros)
        .min()
        .unwrap_or_default();

    match tree.root() {
        Some(root) => TraceListItem {
            trace_id: trace_id.to_string(),
            root_span_id: Some(root.span_id.clone()),
            root_name: root.name.clone(),
            root_service: root.service_name.clone(),
            start_time_micros: root.start_time_micros,
            duration_micros: root.duration_micros,
            span_count: spans.len(),
            status: tree.status.as_str().to_string(),
        },
        None => TraceListItem {
            trace_id: trace_id.to_string(),
            root_span_id: None,
            root_name: String::new(),
            root_service: String::new(),
            start_time_micros: start,
            duration_micros: 0,
            span_count: spans.len(),
            status: tree.status.as_str().to_string(),
        },
    }
}
