use std::net::SocketAddr;

use tonic::transport::Server;
use tracetree_core::error::{Result, TraceTreeError};
use tracetree_store::TraceStore;

use crate::http;
use crate::otlp::grpc::GrpcIngest;

pub async fn run_ingest_servers(
    store: TraceStore,
    grpc_addr: SocketAddr,
    http_addr: SocketAddr,
) -> Result<()> {
    let grpc = GrpcIngest::new(store.clone());
    let http_router = http::router(store);

    let grpc_task = tokio::spawn(async move {
        Server::builder()
            .add_service(grpc.traces_service())
            .serve(grpc_addr)
            .await
    });

    let http_task = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(http_addr).await?;
        axum::serve(listener, http_router).await
    });

    tokio::select! {
        res = grpc_task => {
            let inner = res.map_err(|e| TraceTreeError::Ingest(format!("gRPC task join failed: {e}")))?;
            inner.map_err(|e| TraceTreeError::Ingest(format!("gRPC server failed: {e}")))
        }
        res = http_task => {
            let inner = res.map_err(|e| TraceTreeError::Ingest(format!("HTTP task join failed: {e}")))?;
            inner.map_err(|e| TraceTreeError::Ingest(format!("HTTP server failed: {e}")))
        }
    }
}
