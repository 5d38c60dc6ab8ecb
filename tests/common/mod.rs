//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_cacher::config::CacherConfig;
use api_cacher::lifecycle::{Application, Shutdown, StartupError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A mock upstream listening on an ephemeral port.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}/v1/data", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request heads received so far, lowercased.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable mock upstream. `f` receives the zero-based request index.
pub async fn start_programmable_upstream<F, Fut>(f: F) -> MockUpstream
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let (task_hits, task_requests) = (hits.clone(), requests.clone());
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let index = task_hits.fetch_add(1, Ordering::SeqCst);
                    let (f, requests) = (f.clone(), task_requests.clone());
                    tokio::spawn(async move {
                        serve_one(socket, index, f, requests).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockUpstream { addr, hits, requests }
}

/// Start a mock upstream that replays `script` in order, repeating the last entry.
pub async fn start_scripted_upstream(script: Vec<(u16, &'static str)>) -> MockUpstream {
    let script = Arc::new(script);
    start_programmable_upstream(move |index| {
        let script = script.clone();
        async move {
            let (status, body) = script[index.min(script.len() - 1)];
            (status, body.to_string())
        }
    })
    .await
}

async fn serve_one<F, Fut>(
    mut socket: TcpStream,
    index: usize,
    f: Arc<F>,
    requests: Arc<Mutex<Vec<String>>>,
) where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = (u16, String)>,
{
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    requests
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&head).to_lowercase());

    let (status, body) = f(index).await;
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// A configuration rooted in `state_dir`, pointed at `endpoint`.
pub fn test_config(state_dir: &Path, endpoint: &str) -> CacherConfig {
    let mut config = CacherConfig::default();
    config.storage.state_dir = state_dir.to_path_buf();
    config.upstream.endpoint_url = endpoint.to_string();
    config.upstream.request_timeout_seconds = 2;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

/// A running application instance.
pub struct TestApp {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), StartupError>>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for every task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("app did not shut down in time")
            .unwrap()
            .unwrap();
    }
}

pub async fn spawn_app(config: CacherConfig) -> TestApp {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let app = Application::build(config, shutdown.clone()).unwrap();
    let handle = tokio::spawn(app.run(listener));

    TestApp { addr, shutdown, handle }
}

/// Poll `url` until it answers 200 or the deadline passes.
pub async fn wait_for_ok(client: &reqwest::Client, url: &str) -> reqwest::Response {
    for _ in 0..100 {
        if let Ok(res) = client.get(url).send().await {
            if res.status().is_success() {
                return res;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} never returned 200", url);
}
