//! Tests of the real HTTP clients against a canned local API.
//!
//! A throwaway TCP listener answers each request from a fixed route
//! table and records request heads, so these tests can exercise wire
//! behavior the scripted fakes in `pipeline.rs` cannot: a blob endpoint
//! failing mid-traversal, and the headers outbound requests carry.

use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use repolore::config::{GeminiConfig, GithubConfig};
use repolore::embedding::GeminiEmbedder;
use repolore::gemini::GeminiClient;
use repolore::github::GithubClient;
use repolore::traits::{Embedder, RepositorySource};

// ─── Canned API ──────────────────────────────────────────────────────

/// One canned response: an exact request path (query string ignored),
/// the status to answer with, and a JSON body.
struct Route {
    path: &'static str,
    status: u16,
    body: String,
}

struct CannedApi {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedApi {
    /// Request heads seen so far, in arrival order.
    fn request_heads(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Bind a listener on a random port and serve `routes` until the test ends.
async fn canned_api(routes: Vec<Route>) -> CannedApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));

    let routes = Arc::new(routes);
    let seen = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                serve_one(socket, &routes, &seen).await;
            });
        }
    });

    CannedApi { base_url, requests }
}

async fn serve_one(mut socket: TcpStream, routes: &[Route], seen: &Mutex<Vec<String>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();

    // Drain the request body so the client never sees a broken pipe.
    let content_length: usize = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    seen.lock().unwrap().push(head.clone());

    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|target| target.split('?').next())
        .unwrap_or("/");
    let (status, body) = routes
        .iter()
        .find(|r| r.path == path)
        .map(|r| (r.status, r.body.clone()))
        .unwrap_or((404, json!({ "message": "Not Found" }).to_string()));

    let reason = if status == 200 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json; charset=utf-8\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

// ─── Tests ───────────────────────────────────────────────────────────

/// Prove that one blob endpoint failing skips that file and nothing
/// else: the traversal still succeeds with every file it could fetch.
#[tokio::test]
async fn fetch_documents_skips_blobs_the_api_fails_to_serve() {
    let tree = json!({
        "sha": "root",
        "tree": [
            { "path": "src/lib.rs", "mode": "100644", "type": "blob", "sha": "b-lib" },
            { "path": "src/flaky.rs", "mode": "100644", "type": "blob", "sha": "b-flaky" },
            { "path": "docs", "mode": "040000", "type": "tree", "sha": "t-docs" }
        ],
        "truncated": false
    });
    let blob = json!({
        "content": STANDARD.encode("pub fn answer() -> u32 { 42 }"),
        "encoding": "base64"
    });
    let api = canned_api(vec![
        Route {
            path: "/repos/acme/widget/git/trees/main",
            status: 200,
            body: tree.to_string(),
        },
        Route {
            path: "/repos/acme/widget/git/blobs/b-lib",
            status: 200,
            body: blob.to_string(),
        },
        Route {
            path: "/repos/acme/widget/git/blobs/b-flaky",
            status: 500,
            body: json!({ "message": "Server Error" }).to_string(),
        },
    ])
    .await;

    let config = GithubConfig {
        token: Some("test-token".to_string()),
        api_base: api.base_url.clone(),
        ..Default::default()
    };
    let client = GithubClient::new(config).unwrap();

    let docs = client
        .fetch_documents("https://github.com/acme/widget", None)
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].path, "src/lib.rs");
    assert_eq!(docs[0].content, "pub fn answer() -> u32 { 42 }");
    // One tree listing plus one fetch per blob, no retries on the 500
    assert_eq!(api.request_heads().len(), 3);
}

/// Prove that model requests identify this crate.
#[tokio::test]
async fn embedding_requests_carry_the_crate_user_agent() {
    let api = canned_api(vec![Route {
        path: "/models/text-embedding-004:embedContent",
        status: 200,
        body: json!({ "embedding": { "values": vec![0.25f32; 768] } }).to_string(),
    }])
    .await;

    let config = GeminiConfig {
        api_key: Some("test-key".to_string()),
        api_base: api.base_url.clone(),
        max_retries: 0,
        timeout_secs: 5,
        ..Default::default()
    };
    let embedder = GeminiEmbedder::new(GeminiClient::new(config).unwrap());

    let embedding = embedder.embed("query text").await;
    assert_eq!(embedding.len(), 768);
    assert!((embedding[0] - 0.25).abs() < 1e-6);

    let heads = api.request_heads();
    assert_eq!(heads.len(), 1);
    let head = heads[0].to_ascii_lowercase();
    assert!(
        head.contains("user-agent: repolore"),
        "request head missing user agent: {head}"
    );
}
