//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use spa_gateway::config::GatewayConfig;
use spa_gateway::lifecycle::{Gateway, Shutdown};
use spa_gateway::net::ConnectionRegistry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const INDEX_HTML: &str = "<!doctype html><html><body>app</body></html>";
pub const APP_JS: &str = "console.log('app');";

/// A request as the mock upstream saw it on the wire.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

/// Static bundle with an entry document and one script.
pub fn bundle() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::write(dir.path().join("app.js"), APP_JS).unwrap();
    dir
}

pub fn gateway_config(web_folder: &Path, upstream: Option<SocketAddr>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.address = "127.0.0.1".into();
    config.server.port = 0;
    config.server.drain_timeout_secs = 5;
    config.web.folder = web_folder.to_path_buf();
    if let Some(upstream) = upstream {
        config.upstream.enable_proxy = true;
        config.upstream.host = upstream.ip().to_string();
        config.upstream.port = upstream.port();
    }
    config
}

/// A gateway running on an ephemeral port.
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub registry: ConnectionRegistry,
    pub handle: JoinHandle<i32>,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Poll the registry until it holds `count` connections.
    pub async fn wait_for_connections(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.registry.active_count() != count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {count} connections, have {}",
                self.registry.active_count()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Trigger shutdown and return the exit status.
    pub async fn stop(self) -> i32 {
        self.shutdown.trigger("test", 0);
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("gateway did not stop")
            .unwrap()
    }
}

pub async fn start_gateway(config: GatewayConfig) -> RunningGateway {
    let gateway = Gateway::bind(config).await.unwrap();
    let addr = gateway.local_addr().unwrap();
    let registry = gateway.registry();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(gateway.run(shutdown.clone()));

    RunningGateway {
        addr,
        shutdown,
        registry,
        handle,
    }
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Raw-TCP upstream that records each request and answers `201` with the
/// request body echoed back.
pub async fn start_echo_upstream() -> (SocketAddr, mpsc::UnboundedReceiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(captured) = read_request(&mut socket).await else {
                    return;
                };

                let body = [b"echo:".as_slice(), &captured.body].concat();
                let head = format!(
                    "HTTP/1.1 201 Created\r\nContent-Type: text/plain\r\nX-Upstream: mock\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = tx.send(captured);
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut captured = CapturedRequest {
        head,
        body: buf[head_end..].to_vec(),
    };
    let length: usize = captured
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    while captured.body.len() < length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        captured.body.extend_from_slice(&chunk[..n]);
    }
    Some(captured)
}

/// WebSocket upstream that echoes text and binary frames.
///
/// With `close_after`, the upstream drops the socket after that many echoes.
pub async fn start_ws_upstream(close_after: Option<usize>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                    return;
                };
                let mut echoed = 0;
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_text() || message.is_binary() {
                        if ws.send(message).await.is_err() {
                            return;
                        }
                        echoed += 1;
                        if close_after == Some(echoed) {
                            return;
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Open a raw connection and complete one keep-alive request on it.
pub async fn open_idle_connection(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /app.js HTTP/1.1\r\nHost: gateway\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut chunk = [0u8; 1024];
    while !received.ends_with(APP_JS.as_bytes()) {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
            .await
            .unwrap()
            .unwrap();
        assert!(n > 0, "connection closed before response");
        received.extend_from_slice(&chunk[..n]);
    }
    stream
}

/// True once the peer has closed `stream` (EOF or reset).
pub async fn closed_by_peer(stream: &mut TcpStream) -> bool {
    let mut chunk = [0u8; 64];
    matches!(
        tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk)).await,
        Ok(Ok(0)) | Ok(Err(_))
    )
}
