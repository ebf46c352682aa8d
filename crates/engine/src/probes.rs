// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness probe scheduling.
//!
//! Once a workspace's servers passed their one-shot readiness check they
//! are probed on a recurring interval. All probes run as lightweight tasks
//! on the shared runtime (no thread per probe); results flow through an
//! mpsc callback channel, and the receiver maps them onto server status.
//!
//! `cancel` drops every probe of a workspace and is safe to call again or
//! for workspaces that never scheduled any.

use bv_adapters::ServerChecker;
use bv_core::{RuntimeIdentity, WorkspaceId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Outcome of one probe round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Passed,
    Failed,
}

/// Delivered to the callback channel on every probe completion.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub identity: RuntimeIdentity,
    pub machine: String,
    pub server: String,
    pub status: ProbeStatus,
}

/// One server to probe.
#[derive(Debug, Clone)]
pub struct WorkspaceProbe {
    pub machine: String,
    pub server: String,
    pub url: String,
}

struct ProbeSet {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Schedules recurring liveness probes per workspace.
pub struct ProbeScheduler {
    checker: Arc<dyn ServerChecker>,
    interval: Duration,
    sets: Mutex<HashMap<WorkspaceId, ProbeSet>>,
}

impl ProbeScheduler {
    pub fn new(checker: Arc<dyn ServerChecker>, interval: Duration) -> Self {
        Self { checker, interval, sets: Mutex::new(HashMap::new()) }
    }

    /// Add probes for a workspace. Results go to `tx` until cancelled.
    pub fn schedule(
        &self,
        identity: &RuntimeIdentity,
        probes: Vec<WorkspaceProbe>,
        tx: mpsc::UnboundedSender<ProbeResult>,
    ) {
        if probes.is_empty() {
            return;
        }
        let mut sets = self.sets.lock();
        let set = sets
            .entry(identity.workspace_id.clone())
            .or_insert_with(|| ProbeSet { cancel: CancellationToken::new(), tasks: Vec::new() });
        for probe in probes {
            let task = probe_loop(
                self.checker.clone(),
                self.interval,
                identity.clone(),
                probe,
                set.cancel.clone(),
                tx.clone(),
            );
            set.tasks.push(tokio::spawn(task));
        }
    }

    /// Stop and discard all probes of a workspace. Idempotent.
    pub fn cancel(&self, workspace_id: &WorkspaceId) {
        let set = self.sets.lock().remove(workspace_id);
        if let Some(set) = set {
            set.cancel.cancel();
            for task in set.tasks {
                task.abort();
            }
            tracing::debug!(workspace = %workspace_id, "cancelled liveness probes");
        }
    }

    /// Whether any probes are scheduled for the workspace.
    pub fn is_probing(&self, workspace_id: &WorkspaceId) -> bool {
        self.sets.lock().contains_key(workspace_id)
    }
}

async fn probe_loop(
    checker: Arc<dyn ServerChecker>,
    interval: Duration,
    identity: RuntimeIdentity,
    probe: WorkspaceProbe,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<ProbeResult>,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                let status = if checker.available(&probe.url).await {
                    ProbeStatus::Passed
                } else {
                    ProbeStatus::Failed
                };
                let result = ProbeResult {
                    identity: identity.clone(),
                    machine: probe.machine.clone(),
                    server: probe.server.clone(),
                    status,
                };
                if tx.send(result).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "probes_tests.rs"]
mod tests;
