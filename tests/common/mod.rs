//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use edge_booster::config::EdgeConfig;
use edge_booster::http::HttpServer;
use edge_booster::lifecycle::Shutdown;

/// A request as the mock upstream saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start an upstream that answers `200` with `"{tag} {method} {target}"`
/// (plus the request body on a second line, if any) and, when `marker` is
/// set, an `x-pjax-url` header pointing at the requested path on an
/// internal host. Every request is reported on the returned channel.
pub async fn start_echo_upstream(
    addr: SocketAddr,
    tag: &'static str,
    marker: bool,
) -> mpsc::UnboundedReceiver<Captured> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(captured) = read_request(&mut socket).await else {
                    return;
                };

                let mut body = format!("{tag} {} {}", captured.method, captured.target);
                if !captured.body.is_empty() {
                    body.push('\n');
                    body.push_str(&String::from_utf8_lossy(&captured.body));
                }
                let path = captured.target.split('?').next().unwrap_or_default().to_string();
                let _ = tx.send(captured);

                let mut head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nX-Upstream: {tag}\r\nConnection: close\r\n",
                    body.len()
                );
                if marker {
                    head.push_str(&format!("x-pjax-url: http://upstream.internal{path}\r\n"));
                }
                head.push_str("\r\n");

                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    rx
}

/// Start an upstream that always answers with the given raw status line and
/// headers, and an empty body.
pub async fn start_fixed_upstream(addr: SocketAddr, status_line: &'static str, headers: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                let response = format!("HTTP/1.1 {status_line}\r\n{headers}Content-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Start the edge on `config.listener.bind_address`. Dropping the returned
/// coordinator stops it.
pub async fn start_edge(config: EdgeConfig) -> Shutdown {
    let shutdown = Shutdown::new();
    let (_, config_updates) = mpsc::unbounded_channel();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// A client that talks to localhost directly.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

async fn read_request(socket: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let mut captured = Captured {
        method,
        target,
        headers,
        body: Vec::new(),
    };
    let mut rest = buf[head_end + 4..].to_vec();

    if let Some(len) = captured.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while rest.len() < len {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            rest.extend_from_slice(&chunk[..n]);
        }
        rest.truncate(len);
        captured.body = rest;
    } else if captured
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        while find(&rest, b"0\r\n\r\n").is_none() {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            rest.extend_from_slice(&chunk[..n]);
        }
        captured.body = decode_chunked(&rest);
    }

    Some(captured)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_chunked(mut data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(data, b"\r\n") {
        let size_line = String::from_utf8_lossy(&data[..line_end]);
        let size = usize::from_str_radix(size_line.split(';').next().unwrap_or("0").trim(), 16).unwrap_or(0);
        data = &data[line_end + 2..];
        if size == 0 || data.len() < size {
            break;
        }
        out.extend_from_slice(&data[..size]);
        data = &data[(size + 2).min(data.len())..];
    }
    out
}
