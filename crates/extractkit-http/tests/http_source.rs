//! `HttpSource` against a minimal local HTTP/1.1 server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use extractkit_core::{
    processor_fn, Batch, ByteSource, ExtractConfig, Format, ProcessorError, TransportError,
};
use extractkit_http::{HttpSource, HttpSourceConfig, RetryConfig};
use futures::TryStreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Answer one connection per canned response, in order. Returns the URL and
/// a counter of accepted requests.
async fn serve(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}/extract"), hits)
}

fn ok(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn status(code: u16, reason: &str) -> String {
    format!("HTTP/1.1 {code} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
}

fn source(max_retries: u32) -> HttpSource {
    HttpSource::new(HttpSourceConfig {
        retry: RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            multiplier: 2.0,
        },
        request_timeout: Some(Duration::from_secs(5)),
        ..HttpSourceConfig::default()
    })
    .unwrap()
}

async fn read_all(source: &HttpSource, url: &str) -> Result<Vec<u8>, TransportError> {
    let chunks: Vec<_> = source.open(url).await?.try_collect().await?;
    Ok(chunks.concat())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn streams_the_body() {
    let (url, hits) = serve(vec![ok("id,name\n1,alice\n")]).await;
    let body = read_all(&source(0), &url).await.unwrap();
    assert_eq!(body, b"id,name\n1,alice\n");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (url, hits) = serve(vec![status(404, "Not Found"), ok("unused")]).await;
    let err = read_all(&source(3), &url).await.unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 404, .. }), "{err}");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let (url, hits) = serve(vec![status(503, "Service Unavailable"), ok("[1,2]")]).await;
    let body = read_all(&source(2), &url).await.unwrap();
    assert_eq!(body, b"[1,2]");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retries_are_bounded() {
    let (url, hits) = serve(vec![
        status(503, "Service Unavailable"),
        status(503, "Service Unavailable"),
        status(503, "Service Unavailable"),
    ])
    .await;
    let err = read_all(&source(2), &url).await.unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 503, .. }), "{err}");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn truncated_body_is_a_read_error() {
    let truncated =
        "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n[1,2,".to_string();
    let (url, _) = serve(vec![truncated]).await;
    let err = read_all(&source(3), &url).await.unwrap_err();
    assert!(matches!(err, TransportError::Read { .. }), "{err}");
}

#[tokio::test]
async fn pipeline_over_http() {
    let (url, _) = serve(vec![ok("id,name\n1,alice\n2,bob\n3,carol\n")]).await;
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let processor = processor_fn(move |batch: Batch| {
        counter.fetch_add(batch.len(), Ordering::SeqCst);
        async { Ok::<_, ProcessorError>(()) }
    });

    let config = ExtractConfig::new(url).format(Format::Csv).chunk_size(2);
    let summary = extractkit_pipeline::run(&source(0), &config, &processor).await.unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}
