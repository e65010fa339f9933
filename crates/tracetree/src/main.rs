mod client;
mod output;
mod protocol;
mod query_server;
mod telemetry;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracetree_core::config::Config;
use tracetree_core::filter::{ServiceFilter, SortOrder, TimeWindow};
use tracetree_core::model::span::Span;
use tracetree_core::model::tree::TraceTree;
use tracetree_core::query::{SpansRequest, TracesRequest, TreeRequest};
use tracetree_core::time::parse_time_or_relative;
use tracetree_core::tree::build_tree;
use tracetree_ingest::http::IngestResponse;
use tracetree_store::{StoreLimits, TraceStore};

use crate::client::QueryClient;
use crate::output::{print_spans_human, print_status_human, print_traces_human, print_tree_human};
use crate::protocol::{ApiRequest, ApiResponse};
use crate::telemetry::{TelemetryConfig, init_cli_tracing, init_run_tracing, shutdown_tracing};

#[derive(Parser, Debug)]
#[command(name = "tracetree")]
#[command(about = "Rebuild distributed traces into annotated call trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    uds: Option<PathBuf>,

    #[arg(long, global = true)]
    addr: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run ingest and query servers")]
    Run {
        #[arg(long)]
        ingest_http_addr: Option<String>,
        #[arg(long)]
        ingest_grpc_addr: Option<String>,
        #[arg(long)]
        query_tcp_addr: Option<String>,
        #[arg(long)]
        query_uds_path: Option<PathBuf>,
    },
    #[command(about = "Show the reconstructed tree of a trace")]
    Tree { trace_id: String },
    #[command(about = "Dump the raw spans stored for a trace")]
    Spans { trace_id: String },
    #[command(about = "List traces")]
    Traces {
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        until: Option<String>,
        #[arg(long)]
        service: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, default_value = "start_desc")]
        sort: String,
    },
    Status,
    #[command(about = "Build a tree offline from a JSON span file")]
    Build {
        file: PathBuf,
        #[arg(long)]
        trace_id: Option<String>,
    },
    #[command(about = "Upload a JSON span file to a running server")]
    Ingest {
        file: PathBuf,
        #[arg(long)]
        http_addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            ingest_http_addr,
            ingest_grpc_addr,
            query_tcp_addr,
            query_uds_path,
        } => {
            run_server(
                RunOverrides {
                    ingest_http_addr,
                    ingest_grpc_addr,
                    query_tcp_addr,
                    query_uds_path,
                },
                TelemetryConfig::from_env(),
            )
            .await
        }
        Commands::Tree { trace_id } => {
            init_cli_tracing();
            let req = ApiRequest::Tree(TreeRequest { trace_id });
            query(cli.uds, cli.addr, req, cli.json).await
        }
        Commands::Spans { trace_id } => {
            init_cli_tracing();
            let req = ApiRequest::Spans(SpansRequest { trace_id });
            query(cli.uds, cli.addr, req, cli.json).await
        }
        Commands::Traces {
            since,
            until,
            service,
            limit,
            sort,
        } => {
            init_cli_tracing();
            let req = ApiRequest::Traces(TracesRequest {
                service: service.map(|s| ServiceFilter::parse(&s)).transpose()?,
                window: parse_window(since, until)?,
                sort: sort.parse::<SortOrder>()?,
                limit,
            });
            query(cli.uds, cli.addr, req, cli.json).await
        }
        Commands::Status => {
            init_cli_tracing();
            query(cli.uds, cli.addr, ApiRequest::Status, cli.json).await
        }
        Commands::Build { file, trace_id } => {
            init_cli_tracing();
            let tree = build_offline(&file, trace_id)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                print_tree_human(&tree);
            }
            Ok(())
        }
        Commands::Ingest { file, http_addr } => {
            init_cli_tracing();
            let addr = ingest_target(http_addr)?;
            let accepted = upload_spans(&file, &addr).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&accepted)?);
            } else {
                println!("accepted={}", accepted.accepted);
            }
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
struct RunOverrides {
    ingest_http_addr: Option<String>,
    ingest_grpc_addr: Option<String>,
    query_tcp_addr: Option<String>,
    query_uds_path: Option<PathBuf>,
}

impl RunOverrides {
    fn apply(self, cfg: &mut Config) {
        if let Some(v) = self.ingest_http_addr {
            cfg.ingest_http_addr = v;
        }
        if let Some(v) = self.ingest_grpc_addr {
            cfg.ingest_grpc_addr = v;
        }
        if let Some(v) = self.query_tcp_addr {
            cfg.query_tcp_addr = v;
        }
        if let Some(v) = self.query_uds_path {
            cfg.uds_path = v;
        }
    }
}

async fn run_server(overrides: RunOverrides, telemetry_cfg: TelemetryConfig) -> anyhow::Result<()> {
    let mut cfg = Config::load().context("load config")?;
    overrides.apply(&mut cfg);

    let store = TraceStore::new(StoreLimits {
        max_traces: cfg.max_traces,
    });
    init_run_tracing(telemetry_cfg, store.clone());

    eprintln!("tracetree run");
    eprintln!("  ingest http: {}", cfg.ingest_http_addr);
    eprintln!("  ingest grpc: {}", cfg.ingest_grpc_addr);
    eprintln!("  query uds: {}", cfg.uds_path.display());
    eprintln!("  query tcp: {}", cfg.query_tcp_addr);
    eprintln!(
        "  retention: ttl={} max_traces={}",
        humantime::format_duration(cfg.retention_ttl),
        cfg.max_traces
    );

    let http_addr = parse_addr(&cfg.ingest_http_addr, "ingest http")?;
    let grpc_addr = parse_addr(&cfg.ingest_grpc_addr, "ingest grpc")?;
    let query_addr = parse_addr(&cfg.query_tcp_addr, "query tcp")?;

    let ingest_task = tokio::spawn(tracetree_ingest::server::run_ingest_servers(
        store.clone(),
        grpc_addr,
        http_addr,
    ));

    let query_task = tokio::spawn(query_server::run_query_server(
        store.clone(),
        cfg.uds_path.clone(),
        query_addr,
    ));

    let retention_task = tokio::spawn({
        let store = store.clone();
        let ttl = cfg.retention_ttl;
        let max = cfg.max_traces;
        async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                if let Err(err) = store.run_retention(ttl, max) {
                    tracing::warn!(error = ?err, "retention task failed");
                }
            }
        }
    });

    tokio::select! {
        res = ingest_task => {
            res??;
        }
        res = query_task => {
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    retention_task.abort();
    let _ = tokio::fs::remove_file(&cfg.uds_path).await;
    shutdown_tracing();
    Ok(())
}

fn parse_addr(addr: &str, what: &str) -> anyhow::Result<SocketAddr> {
    addr.parse()
        .with_context(|| format!("invalid {what} address: {addr}"))
}

async fn query(
    uds: Option<PathBuf>,
    addr: Option<String>,
    req: ApiRequest,
    json: bool,
) -> anyhow::Result<()> {
    let mut client = QueryClient::connect(uds, addr).await?;
    let response = client.request(req).await?;
    print_response(response, json)
}

fn parse_window(since: Option<String>, until: Option<String>) -> anyhow::Result<TimeWindow> {
    let since = since.map(|v| parse_time_or_relative(&v)).transpose()?;
    let until = until.map(|v| parse_time_or_relative(&v)).transpose()?;
    Ok(TimeWindow { since, until })
}

fn read_span_file(file: &Path) -> anyhow::Result<Vec<Span>> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("read span file {}", file.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse span file {}", file.display()))
}

fn build_offline(file: &Path, trace_id: Option<String>) -> anyhow::Result<TraceTree> {
    let spans = read_span_file(file)?;
    let Some(trace_id) = trace_id.or_else(|| spans.first().map(|s| s.trace_id.clone())) else {
        anyhow::bail!("{} holds no spans; pass --trace-id", file.display());
    };
    let selected: Vec<Span> = spans
        .into_iter()
        .filter(|s| s.trace_id == trace_id)
        .collect();
    Ok(build_tree(&trace_id, &selected))
}

/// `--http-addr`, else the configured ingest address. The global `--addr`
/// names the query server and is never used here.
fn ingest_target(http_addr: Option<String>) -> anyhow::Result<String> {
    match http_addr {
        Some(addr) => Ok(addr),
        None => Ok(Config::load().context("load config")?.ingest_http_addr),
    }
}

async fn upload_spans(file: &Path, addr: &str) -> anyhow::Result<IngestResponse> {
    let spans = read_span_file(file)?;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/spans"))
        .json(&spans)
        .send()
        .await
        .with_context(|| format!("post spans to {addr}"))?;

    if !response.status().is_success() {
        anyhow::bail!("span upload failed with status {}", response.status());
    }
    response.json().await.context("decode ingest response")
}

fn print_response(response: ApiResponse, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match response {
        ApiResponse::Tree(v) => print_tree_human(&v),
        ApiResponse::Spans(v) => print_spans_human(&v),
        ApiResponse::Traces(v) => print_traces_human(&v),
        ApiResponse::Status(v) => print_status_human(&v),
        ApiResponse::Error(e) => anyhow::bail!("query failed: {e}"),
    }
    Ok(())
}
