use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracetree_core::error::TraceTreeError;
use tracetree_core::filter::{ServiceFilter, SortOrder};
use tracetree_core::model::span::Span;
use tracetree_core::model::tree::TraceTree;
use tracetree_core::query::{TraceListItem, TracesRequest};
use tracetree_store::TraceStore;
use tracing::Level;

use crate::otlp::http::export_traces;

#[derive(Clone)]
pub struct HttpState {
    pub store: TraceStore,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct TracesParams {
    pub service: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

pub fn router(store: TraceStore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/spans", post(ingest_spans))
        .route("/spans/{trace_id}", get(get_spans))
        .route("/trace/{trace_id}/tree", get(get_tree))
        .route("/traces", get(list_traces))
        .route("/v1/traces", post(export_traces))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(HttpState { store })
}

async fn ingest_spans(
    State(state): State<HttpState>,
    Json(spans): Json<Vec<Span>>,
) -> Result<Json<IngestResponse>, StatusCode> {
    let accepted = state.store.ingest(&spans).map_err(store_failure)?;
    tracing::debug!(count = accepted, "json spans accepted");
    Ok(Json(IngestResponse { accepted }))
}

async fn get_spans(
    State(state): State<HttpState>,
    Path(trace_id): Path<String>,
) -> Result<Json<Vec<Span>>, StatusCode> {
    state
        .store
        .fetch_spans(&trace_id)
        .map(Json)
        .map_err(store_failure)
}

async fn get_tree(
    State(state): State<HttpState>,
    Path(trace_id): Path<String>,
) -> Result<Json<TraceTree>, StatusCode> {
    state
        .store
        .build_tree(&trace_id)
        .map(Json)
        .map_err(store_failure)
}

async fn list_traces(
    State(state): State<HttpState>,
    Query(params): Query<TracesParams>,
) -> Result<Json<Vec<TraceListItem>>, (StatusCode, String)> {
    let req = traces_request(params).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    state
        .store
        .list_traces(&req)
        .map(Json)
        .map_err(|e| (store_failure(e), "store unavailable".to_string()))
}

fn traces_request(params: TracesParams) -> Result<TracesRequest, TraceTreeError> {
    let mut req = TracesRequest::default();
    if let Some(service) = params.service {
        req.service = Some(ServiceFilter::parse(&service)?);
    }
    if let Some(sort) = params.sort {
        req.sort = sort.parse::<SortOrder>()?;
    }
    if let Some(limit) = params.limit {
        req.limit = limit;
    }
    Ok(req)
}

fn store_failure(err: TraceTreeError) -> StatusCode {
    tracing::warn!(error = ?err, "trace store request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use tracetree_store::TraceStore;

    use super::router;

    async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn ingest_then_fetch_spans_and_tree() {
        let app = router(TraceStore::in_memory());
        let spans = testkit::three_span_trace("t1");

        let (status, body) = send(&app, post_json("/spans", testkit::spans_json(&spans))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], 3);

        let (status, body) = send(&app, get("/spans/t1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
        assert_eq!(body[0]["spanId"], "A");

        let (status, body) = send(&app, get("/trace/t1/tree")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "FOUND");
        assert_eq!(body["rootSpanId"], "A");
        assert_eq!(body["criticalPath"], serde_json::json!(["A", "C"]));
        assert_eq!(body["nodes"][0]["selfTimeMicros"], 10);
    }

    #[tokio::test]
    async fn lowercase_and_null_kinds_are_accepted() {
        let store = TraceStore::in_memory();
        let app = router(store.clone());
        let body = r#"[
            {"traceId":"k1","spanId":"a","name":"GET /","kind":"server","startTimeMicros":0,"durationMicros":10},
            {"traceId":"k1","spanId":"b","parentSpanId":"a","name":"call","kind":null,"startTimeMicros":1,"durationMicros":5}
        ]"#;

        let (status, resp) = send(&app, post_json("/spans", body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["accepted"], 2);

        let (_, tree) = send(&app, get("/trace/k1/tree")).await;
        assert_eq!(tree["nodes"][0]["kind"], "SERVER");
        assert_eq!(tree["nodes"][1]["kind"], "INTERNAL");
    }

    #[tokio::test]
    async fn unknown_trace_is_not_found_body() {
        let app = router(TraceStore::in_memory());

        let (status, body) = send(&app, get("/trace/nope/tree")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "NOT_FOUND");
        assert_eq!(body["message"], "Trace not found");
        assert_eq!(body["nodes"], serde_json::json!([]));

        let (status, body) = send(&app, get("/spans/nope")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let app = router(TraceStore::in_memory());
        let (status, _) = send(&app, post_json("/spans", "{\"not\":\"a list\"}".into())).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn otlp_protobuf_ingest() {
        let store = TraceStore::in_memory();
        let app = router(store.clone());
        let payload = testkit::encode_otlp(&testkit::otlp_trace_request(7));

        let req = Request::builder()
            .method("POST")
            .uri("/v1/traces")
            .header("content-type", "application/x-protobuf")
            .body(Body::from(payload))
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);

        let tree = store.build_tree(&testkit::hex_id(7, 16)).unwrap();
        assert!(tree.is_found());
        assert_eq!(tree.nodes.len(), 2);

        let garbage = Request::builder()
            .method("POST")
            .uri("/v1/traces")
            .body(Body::from(vec![0xff, 0xff, 0xff]))
            .unwrap();
        let (status, _) = send(&app, garbage).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_traces_with_params() {
        let store = TraceStore::in_memory();
        store.ingest(&testkit::checkout_trace("checkout")).unwrap();
        store.ingest(&testkit::three_span_trace("small")).unwrap();
        let app = router(store);

        let (status, body) = send(&app, get("/traces?sort=duration_desc&limit=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["traceId"], "checkout");

        let (status, body) = send(&app, get("/traces?service=frontend")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["traceId"], "small");

        let (status, _) = send(&app, get("/traces?sort=sideways")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
