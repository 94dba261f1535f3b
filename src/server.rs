//! HTTP server on plain tokio sockets.
//! One request per connection; every response carries permissive CORS headers.

use crate::api::{route, status_text, ApiResponse, AppState, ErrorBody};
use std::collections::HashMap;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

const MAX_HEADER_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

pub async fn serve(listener: TcpListener, state: AppState) -> io::Result<()> {
    info!("Server listening on {}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from {}", addr);
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &state).await {
                warn!("Connection from {} failed: {}", addr, e);
            }
        });
    }
}

pub async fn handle_connection<S>(mut stream: S, state: &AppState) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match read_request(&mut stream).await? {
        Ok(request) => {
            debug!("Request: {} {}", request.method, request.path);
            route(state, &request.method, &request.path, &request.body).await
        }
        Err(rejected) => rejected,
    };

    stream.write_all(create_response(&response).as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

/// Read one request. The inner `Err` is a response to send back as is.
async fn read_request<S>(stream: &mut S) -> io::Result<Result<HttpRequest, ApiResponse>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Ok(Err(bad_request(413, "Request headers too large")));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(Err(bad_request(400, "Incomplete request")));
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Ok(Err(bad_request(400, "Malformed request line")));
    }

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        None => 0,
        Some(v) => match v.parse::<usize>() {
            Ok(n) => n,
            Err(_) => return Ok(Err(bad_request(400, "Invalid Content-Length"))),
        },
    };
    if content_length > MAX_BODY_BYTES {
        return Ok(Err(bad_request(413, "Request body too large")));
    }

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(Err(bad_request(400, "Incomplete request body")));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Ok(HttpRequest {
        method: parts[0].to_uppercase(),
        path: normalize_path(parts[1]),
        body: String::from_utf8_lossy(&body).to_string(),
    }))
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Drop the query string and any trailing slash (except for `/`).
fn normalize_path(raw: &str) -> String {
    let path = raw.split('?').next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn bad_request(status: u16, detail: &str) -> ApiResponse {
    ApiResponse::json(
        status,
        &ErrorBody {
            detail: detail.to_string(),
        },
    )
}

fn create_response(response: &ApiResponse) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        response.status,
        status_text(response.status),
        response.body.len(),
        response.body
    )
}
