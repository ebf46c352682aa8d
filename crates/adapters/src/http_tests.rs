// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[test]
fn parses_status_lines() {
    assert_eq!(parse_status_line("HTTP/1.1 200 OK\r\n"), Some(200));
    assert_eq!(parse_status_line("HTTP/1.0 404 Not Found\r\n"), Some(404));
    assert_eq!(parse_status_line("not-http\r\n"), None);
    assert_eq!(parse_status_line(""), None);
}

#[tokio::test]
async fn probes_a_live_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
    });

    let code = get_status(&addr, "localhost", "/healthz", Duration::from_secs(2)).await.unwrap();
    assert_eq!(code, 200);
}

#[tokio::test]
async fn connect_fails_on_closed_port() {
    // bind then drop to get a port that is very likely closed
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    assert!(connect(&addr, Duration::from_millis(500)).await.is_err());
}
