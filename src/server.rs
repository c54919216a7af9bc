//! Local HTTP server for the dashboard.
//!
//! Uses tokio directly: one task per connection, a single request per
//! connection, and every request recomputes the dashboard from the
//! dataset loaded at startup.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::error::DashboardError;
use crate::html::{self, PageMode};
use crate::models::Dataset;
use crate::report::{self, DashboardOptions};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub dataset: Dataset,
    pub options: DashboardOptions,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(err) => {
                error!("failed to serialize response: {}", err);
                Self {
                    status: 500,
                    content_type: "application/json",
                    body: r#"{"error":"serialization failed"}"#.to_string(),
                }
            }
        }
    }

    fn error_json(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorResponse {
                error: message.into(),
            },
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            status_text(self.status),
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let state = Arc::new(state);
    let listener = TcpListener::bind(bind_addr).await?;
    info!("dashboard listening on http://{}", listener.local_addr()?);
    run(listener, state).await
}

pub async fn run(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &state).await {
                error!("error handling connection from {}: {}", addr, e);
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: &AppState) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    let read_result = timeout(READ_TIMEOUT, async {
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() > MAX_REQUEST_BYTES {
                break;
            }
        }
        Ok::<_, std::io::Error>(())
    })
    .await;

    let response = match read_result {
        Ok(Ok(())) if buffer.len() > MAX_REQUEST_BYTES => {
            Response::error_json(413, "Request too large")
        }
        Ok(Ok(())) => handle_request(&String::from_utf8_lossy(&buffer), state),
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            warn!("request read timed out");
            Response::error_json(408, "Request timeout")
        }
    };

    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Parses the request head and dispatches it.
pub fn handle_request(raw: &str, state: &AppState) -> Response {
    let Some(request_line) = raw.lines().next().filter(|line| !line.trim().is_empty()) else {
        return Response::error_json(400, "Empty request");
    };

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Response::error_json(400, "Invalid request line");
    };

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, HashMap::new()),
    };
    debug!(method, path, "request");

    match (method, path) {
        ("GET", "/") => dashboard_page(state, &query),
        ("GET", "/api/dashboard") => dashboard_json(state, &query),
        ("GET", "/health") => Response::json(
            200,
            &HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
            },
        ),
        (_, "/") | (_, "/api/dashboard") | (_, "/health") => {
            Response::error_json(405, format!("Method {method} not allowed"))
        }
        _ => Response::error_json(404, format!("Not found: {method} {path}")),
    }
}

fn options_for(state: &AppState, query: &HashMap<String, String>) -> DashboardOptions {
    DashboardOptions {
        branch: query.get("branch").cloned().or_else(|| state.options.branch.clone()),
        ..state.options.clone()
    }
}

fn dashboard_page(state: &AppState, query: &HashMap<String, String>) -> Response {
    match report::build_dashboard(&state.dataset, &options_for(state, query)) {
        Ok(dashboard) => Response::html(200, html::render_dashboard(&dashboard, PageMode::Interactive)),
        Err(err @ DashboardError::EmptySelection { .. }) => {
            Response::html(404, html::render_error_page(&err.to_string()))
        }
        Err(err) => {
            error!("failed to build dashboard: {}", err);
            Response::html(500, html::render_error_page(&err.to_string()))
        }
    }
}

fn dashboard_json(state: &AppState, query: &HashMap<String, String>) -> Response {
    match report::build_dashboard(&state.dataset, &options_for(state, query)) {
        Ok(dashboard) => Response::json(200, &dashboard),
        Err(err @ DashboardError::EmptySelection { .. }) => Response::error_json(404, err.to_string()),
        Err(err) => Response::error_json(500, err.to_string()),
    }
}

pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (url_decode(key), url_decode(value)),
            None => (url_decode(pair), String::new()),
        })
        .collect()
}

/// Form-style decoding: `+` is a space and `%XX` a byte. Malformed escapes
/// are kept as written.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        decoded.push(hi << 4 | lo);
                        i += 2;
                    }
                    _ => decoded.push(b'%'),
                }
            }
            other => decoded.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
