use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::{Arc, Mutex, OnceLock};

use chrono::Utc;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace as sdktrace;
use tokio::sync::mpsc;
use tracetree_core::model::span::{Span, SpanKind};
use tracetree_store::TraceStore;
use tracing::{Id, Subscriber};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const SELF_SERVICE: &str = "tracetree";
const SELF_BATCH: usize = 128;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub self_observe: bool,
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self {
            self_observe: self_observe_enabled(std::env::var("TRACETREE_SELF_OBSERVE").ok()),
        }
    }
}

fn self_observe_enabled(value: Option<String>) -> bool {
    matches!(
        value.unwrap_or_default().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn init_cli_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .try_init();
}

pub fn init_run_tracing(cfg: TelemetryConfig, store: TraceStore) {
    let env_filter = EnvFilter::from_default_env();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .compact();

    let otlp_layer = build_otlp_layer();
    let store_layer = cfg.self_observe.then(|| SelfObserveLayer::new(store));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otlp_layer)
        .with(store_layer)
        .try_init();
}

pub fn shutdown_tracing() {
    if let Some(provider) = otlp_provider_slot()
        .lock()
        .ok()
        .and_then(|mut slot| slot.take())
    {
        let _ = provider.shutdown();
    }
}

fn build_otlp_layer<S>() -> Option<OpenTelemetryLayer<S, sdktrace::Tracer>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_err() {
        return None;
    }

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
    {
        Ok(exporter) => exporter,
        Err(err) => {
            eprintln!("tracetree: otlp exporter disabled: {err}");
            return None;
        }
    };

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();
    let tracer = provider.tracer(SELF_SERVICE);

    if let Ok(mut slot) = otlp_provider_slot().lock() {
        *slot = Some(provider);
    }

    Some(tracing_opentelemetry::layer().with_tracer(tracer))
}

fn otlp_provider_slot() -> &'static Mutex<Option<sdktrace::SdkTracerProvider>> {
    static SLOT: OnceLock<Mutex<Option<sdktrace::SdkTracerProvider>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

#[derive(Debug, Clone)]
struct SpanStart {
    trace_id: String,
    span_id: String,
    parent_span_id: Option<String>,
    name: String,
    start_micros: i64,
}

impl SpanStart {
    fn finish(self, end_micros: i64) -> Span {
        Span {
            trace_id: self.trace_id,
            span_id: self.span_id,
            parent_span_id: self.parent_span_id,
            name: self.name,
            kind: SpanKind::Internal,
            service_name: SELF_SERVICE.to_string(),
            node_id: format!("{SELF_SERVICE}-{}", std::process::id()),
            start_time_micros: self.start_micros,
            duration_micros: end_micros.abs_diff(self.start_micros),
        }
    }
}

/// Records the server's own tracing spans into its store so they can be
/// inspected with the same tree queries as ingested traces.
#[derive(Clone)]
struct SelfObserveLayer {
    tx: mpsc::UnboundedSender<Span>,
    open: Arc<Mutex<HashMap<u64, SpanStart>>>,
}

impl SelfObserveLayer {
    fn new(store: TraceStore) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Span>();
        tokio::spawn(async move {
            let mut batch = Vec::with_capacity(SELF_BATCH);
            while let Some(span) = rx.recv().await {
                batch.push(span);
                while batch.len() < SELF_BATCH {
                    match rx.try_recv() {
                        Ok(span) => batch.push(span),
                        Err(_) => break,
                    }
                }
                let _ = store.ingest(&batch);
                batch.clear();
            }
        });

        Self {
            tx,
            open: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lookup(&self, id: u64) -> Option<SpanStart> {
        self.open.lock().ok().and_then(|m| m.get(&id).cloned())
    }
}

impl<S> Layer<S> for SelfObserveLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let id_u64 = id.into_u64();
        let span_id = format!("{id_u64:016x}");

        let parent = attrs
            .parent()
            .map(Id::into_u64)
            .or_else(|| ctx.lookup_current().map(|s| s.id().into_u64()))
            .and_then(|pid| self.lookup(pid));

        let (trace_id, parent_span_id) = match parent {
            Some(parent) => (parent.trace_id, Some(parent.span_id)),
            None => (uuid::Uuid::new_v4().simple().to_string(), None),
        };

        let start = SpanStart {
            trace_id,
            span_id,
            parent_span_id,
            name: attrs.metadata().name().to_string(),
            start_micros: Utc::now().timestamp_micros(),
        };

        if let Ok(mut map) = self.open.lock() {
            map.insert(id_u64, start);
        }
    }

    fn on_close(&self, id: Id, _ctx: Context<'_, S>) {
        let Some(start) = self
            .open
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&id.into_u64()))
        else {
            return;
        };

        let _ = self.tx.send(start.finish(Utc::now().timestamp_micros()));
    }
}
