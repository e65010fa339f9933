use serde::{Deserialize, Serialize};
use tracetree_core::model::span::Span;
use tracetree_core::model::tree::TraceTree;
use tracetree_core::query::{
    SpansRequest, StatusResponse, TraceListItem, TracesRequest, TreeRequest,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApiRequest {
    Tree(TreeRequest),
    Spans(SpansRequest),
    Traces(TracesRequest),
    Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApiResponse {
    Tree(TraceTree),
    Spans(Vec<Span>),
    Traces(Vec<TraceListItem>),
    Status(StatusResponse),
    Error(String),
}
