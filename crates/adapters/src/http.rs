// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP client for server probes.
//!
//! Probes only need the status line of one GET round-trip, so this speaks
//! just enough HTTP/1.1 over a plain TCP stream instead of pulling in a
//! full client stack.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// HTTP GET returning the response status code.
pub async fn get_status(
    addr: &str,
    host: &str,
    path: &str,
    timeout: Duration,
) -> std::io::Result<u16> {
    tokio::time::timeout(timeout, send_request(addr, host, path))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "HTTP probe timed out"))?
}

/// TCP connect without sending anything; enough for opaque protocols.
pub async fn connect(addr: &str, timeout: Duration) -> std::io::Result<()> {
    tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "TCP probe timed out"))?
        .map(|_| ())
}

async fn send_request(addr: &str, host: &str, path: &str) -> std::io::Result<u16> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        if path.is_empty() { "/" } else { path },
        host
    );
    stream.write_all(request.as_bytes()).await?;

    let mut reader = BufReader::new(&mut stream);
    let mut status_line = String::new();
    reader.read_line(&mut status_line).await?;
    parse_status_line(&status_line).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("malformed status line: {:?}", status_line),
        )
    })
}

/// Extract the status code from "HTTP/1.1 200 OK".
fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let proto = parts.next()?;
    if !proto.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
