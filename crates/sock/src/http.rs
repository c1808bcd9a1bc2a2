// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Minimal HTTP/1.1 framing for the control socket.
//!
//! One request per connection, `Connection: close` on every response. Only
//! what the two control endpoints need; this is not a general HTTP stack.

use crate::SockError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const MAX_HEAD: usize = 8 * 1024;

/// Parsed request line of an incoming control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Request {
    pub method: String,
    pub path: String,
}

/// Read one request head; the body (if any) is drained and discarded.
pub(crate) async fn read_request<R>(reader: &mut R) -> Result<Request, SockError>
where
    R: AsyncRead + Unpin,
{
    let head = read_head(reader).await?;
    let line = head
        .lines()
        .next()
        .ok_or_else(|| SockError::Malformed("empty request".to_string()))?;
    let mut parts = line.split_whitespace();
    let (method, path) = match (parts.next(), parts.next()) {
        (Some(m), Some(p)) => (m.to_string(), p.to_string()),
        _ => return Err(SockError::Malformed(format!("bad request line {line:?}"))),
    };

    let body_len = content_length(&head)?;
    if body_len > 0 {
        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body).await?;
    }
    Ok(Request { method, path })
}

/// Write a response with a JSON (or empty) body and close semantics.
pub(crate) async fn write_response<W>(
    writer: &mut W,
    status: u16,
    reason: &str,
    body: &[u8],
) -> Result<(), SockError>
where
    W: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Send a request and return `(status code, body)`.
pub(crate) async fn round_trip<S>(
    stream: &mut S,
    method: &str,
    path: &str,
) -> Result<(u16, Vec<u8>), SockError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let req = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(req.as_bytes()).await?;
    stream.flush().await?;

    let head = read_head(stream).await?;
    let status = parse_status(&head)?;
    let body_len = content_length(&head)?;
    let mut body = vec![0u8; body_len];
    stream.read_exact(&mut body).await?;
    Ok((status, body))
}

async fn read_head<R>(reader: &mut R) -> Result<String, SockError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        if buf.len() >= MAX_HEAD {
            return Err(SockError::Malformed("header block too large".to_string()));
        }
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Err(SockError::Malformed("connection closed mid-header".to_string()));
        }
        buf.push(byte[0]);
    }
    String::from_utf8(buf).map_err(|_| SockError::Malformed("non-utf8 header".to_string()))
}

fn parse_status(head: &str) -> Result<u16, SockError> {
    let line = head
        .lines()
        .next()
        .ok_or_else(|| SockError::Malformed("empty response".to_string()))?;
    line.split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SockError::Malformed(format!("bad status line {line:?}")))
}

fn content_length(head: &str) -> Result<usize, SockError> {
    for line in head.lines().skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                return value
                    .trim()
                    .parse()
                    .map_err(|_| SockError::Malformed(format!("bad content-length {value:?}")));
            }
        }
    }
    Ok(0)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
