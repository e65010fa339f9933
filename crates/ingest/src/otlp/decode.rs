use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::AnyValue;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::Span as OtlpSpan;
use opentelemetry_proto::tonic::trace::v1::span::SpanKind as OtlpSpanKind;
use tracetree_core::model::span::{Span, SpanKind};

const NODE_ATTRIBUTES: [&str; 2] = ["host.name", "service.instance.id"];

pub fn decode_request(req: ExportTraceServiceRequest) -> Vec<Span> {
    let mut spans = Vec::new();
    for rs in req.resource_spans {
        let resource = rs.resource.as_ref();
        for ss in rs.scope_spans {
            for span in ss.spans {
                spans.push(decode_span(resource, &span));
            }
        }
    }
    spans
}

pub fn decode_span(resource: Option<&Resource>, span: &OtlpSpan) -> Span {
    let start_micros = i64::try_from(span.start_time_unix_nano / 1_000).unwrap_or(i64::MAX);
    let duration_micros = span
        .end_time_unix_nano
        .saturating_sub(span.start_time_unix_nano)
        / 1_000;

    Span {
        trace_id: bytes_to_hex(&span.trace_id).unwrap_or_default(),
        span_id: bytes_to_hex(&span.span_id).unwrap_or_default(),
        parent_span_id: bytes_to_hex(&span.parent_span_id),
        name: span.name.clone(),
        kind: decode_kind(span.kind),
        service_name: resource_attr(resource, &["service.name"]),
        node_id: resource_attr(resource, &NODE_ATTRIBUTES),
        start_time_micros: start_micros,
        duration_micros,
    }
}

fn decode_kind(kind: i32) -> SpanKind {
    match OtlpSpanKind::try_from(kind) {
        Ok(OtlpSpanKind::Server | OtlpSpanKind::Consumer) => SpanKind::Server,
        Ok(OtlpSpanKind::Client | OtlpSpanKind::Producer) => SpanKind::Client,
        _ => SpanKind::Internal,
    }
}

/// First non-empty value among `keys`, in order; `unknown` otherwise.
fn resource_attr(resource: Option<&Resource>, keys: &[&str]) -> String {
    if let Some(resource) = resource {
        for key in keys {
            let value = resource
                .attributes
                .iter()
                .find(|kv| kv.key == *key)
                .map(|kv| any_value_to_string(kv.value.as_ref()))
                .unwrap_or_default();
            if !value.is_empty() {
                return value;
            }
        }
    }
    "unknown".to_string()
}

fn any_value_to_string(value: Option<&AnyValue>) -> String {
    value
        .and_then(|v| v.value.as_ref())
        .map(|v| match v {
            Value::StringValue(s) => s.clone(),
            Value::BoolValue(b) => b.to_string(),
            Value::IntValue(i) => i.to_string(),
            Value::DoubleValue(d) => d.to_string(),
            Value::BytesValue(b) => String::from_utf8_lossy(b).to_string(),
            _ => "<complex>".to_string(),
        })
        .unwrap_or_default()
}

fn bytes_to_hex(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    Some(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}
