use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message;

use crate::http::HttpState;
use crate::otlp::decode::decode_request;

pub async fn export_traces(State(state): State<HttpState>, body: Bytes) -> StatusCode {
    let Ok(req) = ExportTraceServiceRequest::decode(body) else {
        tracing::warn!("otlp http traces decode failed");
        return StatusCode::BAD_REQUEST;
    };

    let spans = decode_request(req);
    tracing::debug!(count = spans.len(), "otlp http traces accepted");
    match state.store.ingest(&spans) {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = ?e, "otlp http ingest failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
