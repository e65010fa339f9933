use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UnixListener};
use tracetree_store::TraceStore;

use crate::protocol::{ApiRequest, ApiResponse};

pub async fn run_query_server(
    store: TraceStore,
    uds_path: PathBuf,
    tcp_addr: SocketAddr,
) -> anyhow::Result<()> {
    if let Some(parent) = uds_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("create uds parent dir")?;
    }

    if tokio::fs::metadata(&uds_path).await.is_ok() {
        let _ = tokio::fs::remove_file(&uds_path).await;
    }

    let uds_listener = UnixListener::bind(&uds_path).context("bind UDS query listener")?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(&uds_path).await?.permissions();
        perms.set_mode(0o600);
        tokio::fs::set_permissions(&uds_path, perms).await?;
    }
    let tcp_listener = TcpListener::bind(tcp_addr)
        .await
        .context("bind TCP query listener")?;

    let uds_task = tokio::spawn(run_uds_loop(uds_listener, store.clone()));
    let tcp_task = tokio::spawn(run_tcp_loop(tcp_listener, store));

    tokio::select! {
        res = uds_task => {
            res??;
        }
        res = tcp_task => {
            res??;
        }
    }

    Ok(())
}

async fn run_uds_loop(listener: UnixListener, store: TraceStore) -> anyhow::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_stream(BufReader::new(stream), store).await {
                tracing::warn!(error = ?err, "uds client request failed");
            }
        });
    }
}

async fn run_tcp_loop(listener: TcpListener, store: TraceStore) -> anyhow::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_stream(BufReader::new(stream), store).await {
                tracing::warn!(error = ?err, "tcp client request failed");
            }
        });
    }
}

async fn handle_stream<T>(mut stream: BufReader<T>, store: TraceStore) -> anyhow::Result<()>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut line = String::new();
    let n = stream.read_line(&mut line).await?;
    if n == 0 {
        return Ok(());
    }

    let response = match serde_json::from_str::<ApiRequest>(&line) {
        Ok(req) => handle_request(req, &store),
        Err(e) => ApiResponse::Error(format!("invalid request: {e}")),
    };
    let payload = serde_json::to_vec(&response)?;
    stream.get_mut().write_all(&payload).await?;
    stream.get_mut().write_all(b"\n").await?;
    stream.get_mut().flush().await?;
    Ok(())
}

#[tracing::instrument(name = "query", skip_all)]
fn handle_request(req: ApiRequest, store: &TraceStore) -> ApiResponse {
    let resp = match req {
        ApiRequest::Tree(r) => store.build_tree(&r.trace_id).map(ApiResponse::Tree),
        ApiRequest::Spans(r) => store.fetch_spans(&r.trace_id).map(ApiResponse::Spans),
        ApiRequest::Traces(r) => store.list_traces(&r).map(ApiResponse::Traces),
        ApiRequest::Status => store.status().map(ApiResponse::Status),
    };

    resp.unwrap_or_else(|e| ApiResponse::Error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use tracetree_core::model::tree::TreeStatus;
    use tracetree_core::query::{SpansRequest, TracesRequest, TreeRequest};

    use super::*;

    #[test]
    fn dispatches_each_request_kind() {
        let store = TraceStore::in_memory();
        store.ingest(&testkit::three_span_trace("t1")).unwrap();

        let tree = handle_request(
            ApiRequest::Tree(TreeRequest {
                trace_id: "t1".into(),
            }),
            &store,
        );
        let ApiResponse::Tree(tree) = tree else {
            panic!("expected tree response");
        };
        assert_eq!(tree.status, TreeStatus::Found);
        assert_eq!(tree.critical_path, vec!["A", "C"]);

        let spans = handle_request(
            ApiRequest::Spans(SpansRequest {
                trace_id: "t1".into(),
            }),
            &store,
        );
        assert!(matches!(spans, ApiResponse::Spans(v) if v.len() == 3));

        let traces = handle_request(ApiRequest::Traces(TracesRequest::default()), &store);
        assert!(matches!(traces, ApiResponse::Traces(v) if v.len() == 1));

        let status = handle_request(ApiRequest::Status, &store);
        assert!(matches!(status, ApiResponse::Status(s) if s.span_count == 3));
    }

    #[tokio::test]
    async fn malformed_line_gets_error_response() {
        let (client, server) = tokio::io::duplex(1024);
        let store = TraceStore::in_memory();
        let handle = tokio::spawn(handle_stream(BufReader::new(server), store));

        let mut client = BufReader::new(client);
        client.get_mut().write_all(b"{\"Nope\":1}\n").await.unwrap();
        let mut line = String::new();
        client.read_line(&mut line).await.unwrap();
        handle.await.unwrap().unwrap();

        let resp: ApiResponse = serde_json::from_str(&line).unwrap();
        assert!(matches!(resp, ApiResponse::Error(msg) if msg.starts_with("invalid request")));
    }
}
