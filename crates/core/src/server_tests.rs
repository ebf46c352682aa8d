// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_server_starts_in_starting() {
    let server = Server::new("http://ws-1.example.org/ide");
    assert_eq!(server.status, ServerStatus::Starting);
    assert_eq!(server.url, "http://ws-1.example.org/ide");
}

#[test]
fn status_serde_round_trip() {
    for status in
        [ServerStatus::Unknown, ServerStatus::Starting, ServerStatus::Running, ServerStatus::Stopped]
    {
        let json = serde_json::to_string(&status).unwrap();
        let parsed: ServerStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }
}
