use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::{ServiceFilter, SortOrder, TimeWindow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeRequest {
    pub trace_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpansRequest {
    pub trace_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracesRequest {
    pub service: Option<ServiceFilter>,
    pub window: TimeWindow,
    pub sort: SortOrder,
    pub limit: usize,
}

impl Default for TracesRequest {
    fn default() -> Self {
        Self {
            service: None,
            window: TimeWindow::all(),
            sort: SortOrder::default(),
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraceListItem {
    pub trace_id: String,
    pub root_span_id: Option<String>,
    pub root_name: String,
    pub root_service: String,
    pub start_time_micros: i64,
    pub duration_micros: u64,
    pub span_count: usize,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub trace_count: usize,
    pub span_count: usize,
    pub max_traces: usize,
    pub oldest_ingest: Option<DateTime<Utc>>,
    pub newest_ingest: Option<DateTime<Utc>>,
}
