use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::span::SpanKind as OtlpSpanKind;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span as OtlpSpan};
use prost::Message;
use tracetree_core::model::span::{Span, SpanKind};

/// 2026-01-01T00:00:00Z in microseconds.
pub const BASE_MICROS: i64 = 1_767_225_600_000_000;

#[allow(clippy::too_many_arguments)]
pub fn span(
    trace_id: &str,
    span_id: &str,
    parent: Option<&str>,
    name: &str,
    kind: SpanKind,
    service: &str,
    start: i64,
    duration: u64,
) -> Span {
    Span {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: parent.map(str::to_string),
        name: name.to_string(),
        kind,
        service_name: service.to_string(),
        node_id: format!("{service}-0"),
        start_time_micros: start,
        duration_micros: duration,
    }
}

/// Root A with children B `[0,40]` and C `[50,100]`.
pub fn three_span_trace(trace_id: &str) -> Vec<Span> {
    vec![
        span(trace_id, "A", None, "GET /", SpanKind::Server, "frontend", 0, 100),
        span(trace_id, "B", Some("A"), "render", SpanKind::Internal, "frontend", 0, 40),
        span(trace_id, "C", Some("A"), "fetch", SpanKind::Client, "frontend", 50, 50),
    ]
}

/// Two unrelated roots; R2 starts first and becomes the chosen root.
pub fn disjoint_roots_trace(trace_id: &str) -> Vec<Span> {
    vec![
        span(trace_id, "R1", None, "job.a", SpanKind::Internal, "batch", 10, 100),
        span(trace_id, "R1a", Some("R1"), "job.a.step", SpanKind::Internal, "batch", 20, 50),
        span(trace_id, "R2", None, "job.b", SpanKind::Internal, "batch", 5, 10),
        span(trace_id, "R2a", Some("R2"), "job.b.step", SpanKind::Internal, "batch", 6, 2),
    ]
}

/// Every span's parent resolves, so no root exists.
pub fn cyclic_trace(trace_id: &str) -> Vec<Span> {
    vec![
        span(trace_id, "x", Some("y"), "ping", SpanKind::Client, "loop", 0, 10),
        span(trace_id, "y", Some("x"), "pong", SpanKind::Server, "loop", 1, 5),
    ]
}

/// Gateway → orders → payments call chain, listed leaf-first.
///
/// Critical path: `gw, order, pay, fraud` for 650ms.
pub fn checkout_trace(trace_id: &str) -> Vec<Span> {
    let t = |offset_ms: i64| BASE_MICROS + offset_ms * 1_000;
    vec![
        span(trace_id, "fraud", Some("pay"), "fraud.score", SpanKind::Internal, "payments", t(85), 60_000),
        span(trace_id, "db", Some("order"), "INSERT orders", SpanKind::Client, "orders", t(30), 40_000),
        span(trace_id, "pay", Some("order"), "charge", SpanKind::Client, "payments", t(80), 140_000),
        span(trace_id, "order", Some("gw"), "create order", SpanKind::Server, "orders", t(25), 200_000),
        span(trace_id, "auth", Some("gw"), "auth.verify", SpanKind::Client, "api-gateway", t(2), 18_000),
        span(trace_id, "gw", None, "POST /checkout", SpanKind::Server, "api-gateway", t(0), 250_000),
    ]
}

pub fn spans_json(spans: &[Span]) -> String {
    serde_json::to_string(spans).unwrap()
}

pub fn hex_id(byte: u8, len: usize) -> String {
    format!("{byte:02x}").repeat(len)
}

fn string_kv(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(Value::StringValue(value.to_string())),
        }),
    }
}

/// OTLP export with a SERVER root (100ms) and a CLIENT child (40ms) from
/// service `api` on host `host-a`. Trace id bytes are all `trace_byte`.
pub fn otlp_trace_request(trace_byte: u8) -> ExportTraceServiceRequest {
    let start_nanos = BASE_MICROS as u64 * 1_000;
    let root = OtlpSpan {
        trace_id: vec![trace_byte; 16],
        span_id: vec![1; 8],
        name: "GET /v1/orders".to_string(),
        kind: OtlpSpanKind::Server as i32,
        start_time_unix_nano: start_nanos,
        end_time_unix_nano: start_nanos + 100_000_000,
        ..Default::default()
    };
    let child = OtlpSpan {
        trace_id: vec![trace_byte; 16],
        span_id: vec![2; 8],
        parent_span_id: vec![1; 8],
        name: "SELECT orders".to_string(),
        kind: OtlpSpanKind::Client as i32,
        start_time_unix_nano: start_nanos + 10_000_000,
        end_time_unix_nano: start_nanos + 50_000_000,
        ..Default::default()
    };

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: vec![string_kv("service.name", "api"), string_kv("host.name", "host-a")],
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope {
                    name: "testkit".to_string(),
                    version: "0.1".to_string(),
                    ..Default::default()
                }),
                spans: vec![root, child],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

pub fn encode_otlp(req: &ExportTraceServiceRequest) -> Vec<u8> {
    req.encode_to_vec()
}
