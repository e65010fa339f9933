use opentelemetry_proto::tonic::collector::trace::v1::trace_service_server::{
    TraceService, TraceServiceServer,
};
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use tonic::{Request, Response, Status};
use tracetree_store::TraceStore;

use crate::otlp::decode::decode_request;

#[derive(Clone)]
pub struct GrpcIngest {
    store: TraceStore,
}

impl GrpcIngest {
    pub fn new(store: TraceStore) -> Self {
        Self { store }
    }

    pub fn traces_service(&self) -> TraceServiceServer<Self> {
        TraceServiceServer::new(self.clone())
    }
}

#[tonic::async_trait]
impl TraceService for GrpcIngest {
    async fn export(
        &self,
        request: Request<ExportTraceServiceRequest>,
    ) -> std::result::Result<Response<ExportTraceServiceResponse>, Status> {
        let spans = decode_request(request.into_inner());
        tracing::debug!(count = spans.len(), "otlp grpc traces accepted");
        self.store.ingest(&spans).map_err(|e| {
            tracing::warn!(error = ?e, "otlp grpc ingest failed");
            Status::internal(e.to_string())
        })?;
        Ok(Response::new(ExportTraceServiceResponse::default()))
    }
}
