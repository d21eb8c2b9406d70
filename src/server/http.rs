//! Minimal HTTP/1.1 framing over a tokio stream
//!
//! One request per connection: read until the header block is complete and
//! the `Content-Length` body has arrived, answer, close.

use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::warn;

const MAX_REQUEST_BYTES: usize = 1_000_000;
const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    Timeout,
    TooLarge,
    Malformed(String),
    Closed,
}

/// Read one request, giving up after `read_timeout`.
pub async fn read_request<S>(stream: &mut S, read_timeout: Duration) -> Result<Request, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    let read = timeout(read_timeout, async {
        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| ReadError::Malformed(e.to_string()))?;
            if n == 0 {
                return Ok::<(), ReadError>(());
            }
            buffer.extend_from_slice(&chunk[..n]);

            if let Some(headers_end) = find_header_end(&buffer) {
                let expected = extract_content_length(&buffer[..headers_end]).unwrap_or(0);
                let total = headers_end
                    .checked_add(expected)
                    .filter(|total| *total <= MAX_REQUEST_BYTES)
                    .ok_or(ReadError::TooLarge)?;
                if buffer.len() >= total {
                    return Ok(());
                }
            }
            if buffer.len() > MAX_REQUEST_BYTES {
                return Err(ReadError::TooLarge);
            }
        }
    })
    .await;

    match read {
        Err(_) => return Err(ReadError::Timeout),
        Ok(Err(e)) => return Err(e),
        Ok(Ok(())) => {}
    }

    if buffer.is_empty() {
        return Err(ReadError::Closed);
    }
    parse_request(&buffer)
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_END.len())
        .position(|w| w == HEADER_END)
        .map(|pos| pos + HEADER_END.len())
}

fn extract_content_length(head: &[u8]) -> Option<usize> {
    let head = std::str::from_utf8(head).ok()?;
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

pub fn parse_request(raw: &[u8]) -> Result<Request, ReadError> {
    let headers_end = find_header_end(raw)
        .ok_or_else(|| ReadError::Malformed("incomplete header block".to_string()))?;
    let head = std::str::from_utf8(&raw[..headers_end])
        .map_err(|_| ReadError::Malformed("header block is not UTF-8".to_string()))?;

    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method.to_ascii_uppercase(), target),
        _ => {
            return Err(ReadError::Malformed(format!(
                "bad request line '{}'",
                request_line
            )))
        }
    };

    let (raw_path, query_string) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    // Trailing slashes are ignored except on the root.
    let mut path = raw_path.trim_end_matches('/').to_string();
    if path.is_empty() {
        path = "/".to_string();
    }

    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let query = query_string.map(parse_query).unwrap_or_default();

    Ok(Request {
        method,
        path,
        query,
        headers,
        body: raw[headers_end..].to_vec(),
    })
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Every status the API answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NoContent,
    BadRequest,
    NotFound,
    RequestTimeout,
    PayloadTooLarge,
    InternalServerError,
    ServiceUnavailable,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::RequestTimeout => 408,
            Status::PayloadTooLarge => 413,
            Status::InternalServerError => 500,
            Status::ServiceUnavailable => 503,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NoContent => "No Content",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::RequestTimeout => "Request Timeout",
            Status::PayloadTooLarge => "Payload Too Large",
            Status::InternalServerError => "Internal Server Error",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json<T: serde::Serialize>(status: Status, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::error(
                Status::InternalServerError,
                &format!("failed to serialize response: {}", e),
            ),
        }
    }

    pub fn error(status: Status, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::json!({ "error": message }).to_string().into_bytes(),
        }
    }

    pub fn csv(body: String) -> Self {
        Self {
            status: Status::Ok,
            content_type: "text/csv",
            body: body.into_bytes(),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: Status::NoContent,
            content_type: "text/plain",
            body: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body.len(),
        );
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    pub async fn write_to<S>(&self, stream: &mut S)
    where
        S: AsyncWrite + Unpin,
    {
        if let Err(e) = stream.write_all(&self.to_bytes()).await {
            warn!("Failed to write response: {}", e);
            return;
        }
        if let Err(e) = stream.flush().await {
            warn!("Failed to flush response: {}", e);
        }
    }
}
