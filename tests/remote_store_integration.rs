//! Integration tests for the remote match client against a local HTTP stub

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;
use std::time::Duration;

use askbuddy::config::RemoteConfig;
use askbuddy::rag::retrieval::{MatchStore, RemoteMatchClient};
use askbuddy::{AskError, ErrorKind};

/// Serve one canned response; the handle yields the raw request
fn serve_once(status_line: &str, body: &str) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind local test server");
    let port = listener.local_addr().expect("failed to read local addr").port();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("no connection");
        let request = read_request(&mut stream);
        stream.write_all(response.as_bytes()).expect("failed to respond");
        request
    });

    (port, handle)
}

/// Read headers, then exactly Content-Length bytes of body
fn read_request(stream: &mut std::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).expect("read failed");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let lower = line.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}

fn client_for(port: u16) -> RemoteMatchClient {
    client_with_timeout(port, 5)
}

fn client_with_timeout(port: u16, timeout_secs: u64) -> RemoteMatchClient {
    let config = RemoteConfig {
        url: Some(format!("http://127.0.0.1:{}", port)),
        api_key: Some("test-anon-key".to_string()),
        timeout_secs,
        ..Default::default()
    };
    RemoteMatchClient::new(&config).unwrap()
}

/// Accept one connection, read the request and never answer
fn serve_silently(hold_for: Duration) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind local test server");
    let port = listener.local_addr().expect("failed to read local addr").port();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("no connection");
        read_request(&mut stream);
        std::thread::sleep(hold_for);
    });

    (port, handle)
}

#[tokio::test]
async fn test_search_sends_rpc_and_decodes_rows() {
    let (port, server) = serve_once(
        "200 OK",
        r#"[{"chunk_text":"low","similarity":0.2},{"content":"high","score":0.95,"course_id":4}]"#,
    );

    let items = client_for(port).search(&[0.5, 0.25], 2, Some(4)).await.unwrap();
    let request = server.join().unwrap();

    assert!(request.starts_with("POST /rest/v1/rpc/match_course_book_chunks "));
    let lower = request.to_ascii_lowercase();
    assert!(lower.contains("apikey: test-anon-key"));
    assert!(lower.contains("authorization: bearer test-anon-key"));

    let body_start = request.find("\r\n\r\n").unwrap() + 4;
    let payload: serde_json::Value = serde_json::from_str(&request[body_start..]).unwrap();
    assert_eq!(payload["match_count"], 2);
    assert_eq!(payload["filter_course_id"], 4);
    assert_eq!(payload["query_embedding"].as_array().unwrap().len(), 2);

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text, "high");
    assert_eq!(items[0].course_id, Some(4));
    assert_eq!(items[1].text, "low");
}

#[tokio::test]
async fn test_scope_filter_omitted_when_absent() {
    let (port, server) = serve_once("200 OK", "[]");

    let items = client_for(port).search(&[1.0], 5, None).await.unwrap();
    let request = server.join().unwrap();

    assert!(items.is_empty());
    assert!(!request.contains("filter_course_id"));
}

#[tokio::test]
async fn test_non_success_status_is_upstream_error() {
    let (port, server) = serve_once("503 Service Unavailable", r#"{"message":"db asleep"}"#);

    let err = client_for(port).search(&[1.0], 5, None).await.unwrap_err();
    server.join().unwrap();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    match err {
        AskError::UpstreamError { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("db asleep"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_array_body_is_empty() {
    let (port, server) = serve_once("200 OK", r#"{"rows":[]}"#);

    let items = client_for(port).search(&[1.0], 5, None).await.unwrap();
    server.join().unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_upstream_error() {
    let (port, server) = serve_once("200 OK", "<html>gateway</html>");

    let err = client_for(port).search(&[1.0], 5, None).await.unwrap_err();
    server.join().unwrap();
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn test_connection_refused_is_upstream_error() {
    // Bind then drop to get a port with nothing listening
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = client_for(port).search(&[1.0], 5, None).await.unwrap_err();
    match err {
        AskError::UpstreamError { status, .. } => assert_eq!(status, 0),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_silent_store_times_out_as_upstream_error() {
    let (port, server) = serve_silently(Duration::from_secs(3));

    let err = client_with_timeout(port, 1)
        .search(&[1.0], 5, None)
        .await
        .unwrap_err();
    server.join().unwrap();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    match err {
        AskError::UpstreamError { status, body } => {
            assert_eq!(status, 0);
            assert!(body.contains("timed out"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
