//! End-to-end tests for `SummarizerClient::process` against a one-shot
//! local HTTP responder.

use edudash_protocol::UserId;
use edudash_summarizer::{SummarizerClient, Upload};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves one request with `status` and `body`; yields the raw request.
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/process", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let l = l.to_ascii_lowercase();
                        l.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        String::from_utf8_lossy(&buf).to_string()
    });

    (url, handle)
}

fn notes() -> Upload {
    Upload::new("notes.txt", b"Mitochondria are the powerhouse of the cell.".to_vec())
}

#[tokio::test]
async fn test_process_sends_multipart_with_file_and_user() {
    let body = r#"{"success":true,"data":{"title":"Cells","summary":"About cells","sections":[],"topics":["biology"],"insights":[],"actionItems":["Read ch. 2"]}}"#;
    let (url, server) = serve_once("200 OK", body).await;

    let response = SummarizerClient::new(url)
        .process(notes(), &UserId::new("u-42"), "user-jwt")
        .await;
    let request = server.await.unwrap();
    let lower = request.to_ascii_lowercase();

    assert!(response.success);
    assert_eq!(response.data.unwrap().action_items, vec!["Read ch. 2"]);
    assert!(lower.starts_with("post /api/process"));
    assert!(lower.contains("authorization: bearer user-jwt"));
    assert!(lower.contains("content-type: multipart/form-data"));
    assert!(request.contains(r#"name="file"; filename="notes.txt""#));
    assert!(request.contains(r#"name="userId""#));
    assert!(request.contains("u-42"));
    assert!(request.contains("Mitochondria"));
}

#[tokio::test]
async fn test_process_500_with_error_body_reports_message() {
    let (url, _server) = serve_once("500 Internal Server Error", r#"{"error":"bad file"}"#).await;

    let response = SummarizerClient::new(url)
        .process(notes(), &UserId::new("u-1"), "jwt")
        .await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("bad file"));
    assert!(response.data.is_none());
}

#[tokio::test]
async fn test_process_error_without_json_uses_status_message() {
    let (url, _server) = serve_once("503 Service Unavailable", "upstream down").await;

    let response = SummarizerClient::new(url)
        .process(notes(), &UserId::new("u-1"), "jwt")
        .await;

    assert_eq!(response.error.as_deref(), Some("Request failed with status 503"));
}

#[tokio::test]
async fn test_process_empty_upload_is_rejected_without_request() {
    // Nothing listens here; a request would fail differently.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/process", listener.local_addr().unwrap());
    drop(listener);

    let response = SummarizerClient::new(url)
        .process(Upload::new("empty.pdf", Vec::<u8>::new()), &UserId::new("u-1"), "jwt")
        .await;

    assert_eq!(response.error.as_deref(), Some("file is empty"));
}

#[tokio::test]
async fn test_process_unreachable_endpoint_is_failure_value() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/process", listener.local_addr().unwrap());
    drop(listener);

    let response = SummarizerClient::new(url)
        .process(notes(), &UserId::new("u-1"), "jwt")
        .await;

    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("request failed"));
}
