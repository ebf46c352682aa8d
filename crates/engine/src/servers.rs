// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot server readiness checks.
//!
//! After a machine's container runs and its installers finished, each
//! declared server must answer before the machine counts as ready. The
//! checker polls until the configured deadline; the caller races it
//! against the start attempt's cancellation token.

use bv_adapters::ServerChecker;
use bv_core::{InfraConfig, RuntimeError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Polls servers until they answer or the deadline passes.
#[derive(Clone)]
pub struct ServersChecker {
    checker: Arc<dyn ServerChecker>,
    deadline: Duration,
    interval: Duration,
}

impl ServersChecker {
    pub fn new(checker: Arc<dyn ServerChecker>, config: &InfraConfig) -> Self {
        Self {
            checker,
            deadline: config.server_check_deadline(),
            interval: config.server_check_interval(),
        }
    }

    /// Suspend until the server answers; fail past the deadline.
    pub async fn await_ready(&self, server_ref: &str, url: &str) -> Result<(), RuntimeError> {
        let give_up = Instant::now() + self.deadline;
        loop {
            if self.checker.available(url).await {
                return Ok(());
            }
            if Instant::now() >= give_up {
                return Err(RuntimeError::infrastructure(format!(
                    "server '{}' at {} did not become ready within {}s",
                    server_ref,
                    url,
                    self.deadline.as_secs()
                )));
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
#[path = "servers_tests.rs"]
mod tests;
