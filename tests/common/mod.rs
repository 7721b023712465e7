//! Shared utilities for integration and concurrency testing.

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use catalog_http::http::{Request, Response, Transport, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Barrier;
use tokio::time::Instant;

#[allow(dead_code)]
pub fn json_response(status: i32) -> Response {
    Response::new(status)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"RID":"1-X4Y2"}]"#)
}

#[allow(dead_code)]
pub fn html_response(status: i32) -> Response {
    Response::new(status)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html><body><h1>Proxy Error</h1></body></html>")
}

/// In-memory transport that replays a fixed script of replies.
///
/// Once the script runs out every further attempt gets the fallback reply.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Response, TransportError>>>,
    fallback: Result<Response, TransportError>,
    log: Mutex<Vec<(Instant, Request)>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(replies: Vec<Result<Response, TransportError>>) -> Arc<Self> {
        Self::with_fallback(replies, Ok(json_response(200)))
    }

    pub fn repeating(reply: Result<Response, TransportError>) -> Arc<Self> {
        Self::with_fallback(Vec::new(), reply)
    }

    fn with_fallback(
        replies: Vec<Result<Response, TransportError>>,
        fallback: Result<Response, TransportError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback,
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn dispatch_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    /// When each attempt was sent.
    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.log.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.log.lock().unwrap().push((Instant::now(), request.clone()));
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Service whose session can expire.
///
/// While logged out every attempt is answered with 401. The first `herd`
/// logged-out attempts are held until all of them arrived, so they observe
/// the expired session together.
pub struct SessionTransport {
    logged_in: AtomicBool,
    herd: usize,
    barrier: Barrier,
    arrivals: AtomicUsize,
    dispatches: AtomicUsize,
    unauthorized: AtomicUsize,
}

#[allow(dead_code)]
impl SessionTransport {
    pub fn logged_out(herd: usize) -> Arc<Self> {
        Arc::new(Self {
            logged_in: AtomicBool::new(false),
            herd,
            barrier: Barrier::new(herd),
            arrivals: AtomicUsize::new(0),
            dispatches: AtomicUsize::new(0),
            unauthorized: AtomicUsize::new(0),
        })
    }

    pub fn log_in(&self) {
        self.logged_in.store(true, Ordering::SeqCst);
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    pub fn unauthorized_count(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for SessionTransport {
    async fn send(&self, _request: &Request) -> Result<Response, TransportError> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        if self.logged_in.load(Ordering::SeqCst) {
            return Ok(json_response(200));
        }
        if self.arrivals.fetch_add(1, Ordering::SeqCst) < self.herd {
            self.barrier.wait().await;
        }
        self.unauthorized.fetch_add(1, Ordering::SeqCst);
        Ok(json_response(401))
    }
}

/// Reply produced by a programmable backend.
#[allow(dead_code)]
pub struct MockReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

#[allow(dead_code)]
impl MockReply {
    pub fn json(status: u16, body: &str) -> Self {
        Self { status, content_type: "application/json", body: body.to_string() }
    }

    pub fn html(status: u16) -> Self {
        Self {
            status,
            content_type: "text/html",
            body: "<html><body>Bad Gateway</body></html>".to_string(),
        }
    }
}

/// Start a programmable HTTP backend on an ephemeral port.
///
/// `f` receives the raw request head and decides the reply.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_request_head(&mut socket).await;
                        let reply = f(head).await;
                        let reason = reqwest::StatusCode::from_u16(reply.status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("Unknown");

                        let response_str = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            reply.status,
                            reason,
                            reply.content_type,
                            reply.body.len(),
                            reply.body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read until the end of the request, returning the head.
async fn read_request_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let body_len = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                return head;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
