// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime state of a network server exposed by a machine.
//!
//! Server status is driven by two independent signals: a one-shot readiness
//! check during start (`Starting → Running`/`Stopped`) and the recurring
//! liveness probe afterwards (`Running ↔ Stopped`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an exposed server endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Unknown,
    Starting,
    Running,
    Stopped,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Unknown => write!(f, "unknown"),
            ServerStatus::Starting => write!(f, "starting"),
            ServerStatus::Running => write!(f, "running"),
            ServerStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// A named network endpoint exposed by a machine, with its resolved URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), status: ServerStatus::Starting, attributes: IndexMap::new() }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
