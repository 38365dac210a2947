//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use issuance_gateway::config::schema::PoolConfig;
use issuance_gateway::{Gateway, GatewayConfig, HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// How a mock backend answers.
#[derive(Debug, Clone)]
pub struct Behavior {
    pub status: u16,
    pub body: Option<String>,
    pub delay: Duration,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            status: 200,
            body: None,
            delay: Duration::ZERO,
        }
    }
}

pub struct Backend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    aborted: Arc<AtomicUsize>,
}

impl Backend {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Connections the client closed before the backend answered.
    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Start a mock backend on an ephemeral port.
///
/// Unless a body is configured it answers with "<METHOD> <PATH>".
pub async fn start_backend(behavior: Behavior) -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let aborted = Arc::new(AtomicUsize::new(0));

    let (reqs, abrt) = (requests.clone(), aborted.clone());
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let (reqs, abrt, behavior) = (reqs.clone(), abrt.clone(), behavior.clone());
            tokio::spawn(async move {
                serve_one(socket, behavior, reqs, abrt).await;
            });
        }
    });

    Backend {
        addr,
        requests,
        aborted,
    }
}

async fn serve_one(
    mut socket: TcpStream,
    behavior: Behavior,
    requests: Arc<Mutex<Vec<Recorded>>>,
    aborted: Arc<AtomicUsize>,
) {
    let Some(recorded) = read_request(&mut socket).await else {
        return;
    };
    let body = behavior
        .body
        .clone()
        .unwrap_or_else(|| format!("{} {}", recorded.method, recorded.path));
    requests.lock().unwrap().push(recorded);

    if !behavior.delay.is_zero() {
        let mut probe = [0u8; 1];
        tokio::select! {
            _ = tokio::time::sleep(behavior.delay) => {}
            read = socket.read(&mut probe) => {
                if matches!(read, Ok(0) | Err(_)) {
                    aborted.fetch_add(1, Ordering::SeqCst);
                    return;
                }
            }
        }
    }

    let reason = StatusCode::from_u16(behavior.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\nX-Backend: mock\r\n\r\n{}",
        behavior.status,
        reason,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Read the request head and any body, so closing never resets the peer.
async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let recorded = Recorded {
        method,
        path,
        headers,
    };

    if let Some(len) = recorded
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        while buf.len() - head_end < len {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    } else if recorded
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        while !buf[head_end..].ends_with(b"0\r\n\r\n") {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    Some(recorded)
}

/// A backend that reads the request and hangs up without answering.
pub async fn start_hangup_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Default table pointed at `backend`, with one allowed principal ("webapp")
/// and every background listener switched off.
pub fn base_config(backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.pools = vec![PoolConfig {
        name: "issuance".into(),
        targets: vec![backend.to_string()],
    }];
    config.access.allow_list = vec!["webapp".into()];
    config.health_check.enabled = false;
    config.observability.metrics_enabled = false;
    config.admin.enabled = false;
    config
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<Gateway>,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let gateway = server.gateway();
    let shutdown = Shutdown::new(Duration::from_secs(5));
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        addr,
        gateway,
        updates,
        shutdown,
    }
}

/// Send `request` verbatim and return the response status line.
///
/// HTTP clients normalize request targets, so paths with dot segments and
/// hand-built chunked bodies go over a plain socket.
pub async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request).await.unwrap();

    let mut response = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => response.extend_from_slice(&chunk[..n]),
        }
        if response.windows(2).any(|w| w == b"\r\n") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&response).to_string();
    text.lines().next().unwrap_or_default().to_string()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Poll `check` until it holds or `deadline` passes.
pub async fn eventually(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
