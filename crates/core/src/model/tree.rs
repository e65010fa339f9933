use serde::{Deserialize, Serialize};

use crate::model::span::{Span, SpanKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TreeStatus {
    Found,
    NotFound,
    Malformed,
}

impl TreeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "FOUND",
            Self::NotFound => "NOT_FOUND",
            Self::Malformed => "MALFORMED",
        }
    }
}

/// A span enriched with the values derived while reconstructing its trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub kind: SpanKind,
    pub service_name: String,
    pub node_id: String,
    pub start_time_micros: i64,
    pub duration_micros: u64,
    pub end_time_micros: i64,
    pub depth: u32,
    pub self_time_micros: u64,
    pub children: Vec<String>,
}

impl From<&Span> for Node {
    fn from(span: &Span) -> Self {
        Self {
            trace_id: span.trace_id.clone(),
            span_id: span.span_id.clone(),
            parent_span_id: span.parent_span_id.clone(),
            name: span.name.clone(),
            kind: span.kind,
            service_name: span.service_name.clone(),
            node_id: span.node_id.clone(),
            start_time_micros: span.start_time_micros,
            duration_micros: span.duration_micros,
            end_time_micros: span.end_time_micros(),
            depth: 0,
            self_time_micros: 0,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TraceTree {
    pub trace_id: String,
    pub root_span_id: Option<String>,
    pub status: TreeStatus,
    pub message: String,
    pub nodes: Vec<Node>,
    pub critical_path: Vec<String>,
    pub critical_path_micros: u64,
}

impl TraceTree {
    pub fn not_found(trace_id: &str) -> Self {
        Self::empty(trace_id, TreeStatus::NotFound, "Trace not found".to_string())
    }

    pub fn malformed(trace_id: &str, message: String) -> Self {
        Self::empty(trace_id, TreeStatus::Malformed, message)
    }

    fn empty(trace_id: &str, status: TreeStatus, message: String) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            root_span_id: None,
            status,
            message,
            nodes: Vec::new(),
            critical_path: Vec::new(),
            critical_path_micros: 0,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == TreeStatus::Found
    }

    pub fn node(&self, span_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.span_id == span_id)
    }

    pub fn root(&self) -> Option<&Node> {
        self.root_span_id.as_deref().and_then(|id| self.node(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_shape() {
        let tree = TraceTree::not_found("abc");
        assert_eq!(tree.status, TreeStatus::NotFound);
        assert_eq!(tree.message, "Trace not found");
        assert!(tree.nodes.is_empty());
        assert!(tree.critical_path.is_empty());
        assert!(tree.root().is_none());
    }

    #[test]
    fn status_serializes_screaming_case() {
        let json = serde_json::to_value(TraceTree::not_found("abc")).unwrap();
        assert_eq!(json["status"], "NOT_FOUND");
        assert_eq!(json["traceId"], "abc");
        assert!(json["rootSpanId"].is_null());
        assert_eq!(json["criticalPath"], serde_json::json!([]));
    }
}
