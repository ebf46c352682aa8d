// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime record of one container within a workspace.
//!
//! A machine is created when its pod object is submitted to the platform
//! and removed together with the workspace's runtime state. Status
//! transitions are append-only within a start attempt: a machine never
//! regresses from `Running` back to `Starting`, and `Failed` is terminal.

use crate::identity::{RuntimeIdentity, WorkspaceId};
use crate::server::Server;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a machine within a start attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Starting,
    Running,
    Failed,
}

impl MachineStatus {
    /// Whether moving to `next` respects the monotonic lifecycle.
    pub fn can_transition_to(self, next: MachineStatus) -> bool {
        matches!(
            (self, next),
            (MachineStatus::Starting, MachineStatus::Running)
                | (MachineStatus::Starting, MachineStatus::Failed)
                | (MachineStatus::Running, MachineStatus::Failed)
        )
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineStatus::Starting => write!(f, "starting"),
            MachineStatus::Running => write!(f, "running"),
            MachineStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Composite key addressing one machine of one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineKey {
    pub workspace_id: WorkspaceId,
    pub machine_name: String,
}

impl MachineKey {
    pub fn new(identity: &RuntimeIdentity, machine_name: impl Into<String>) -> Self {
        Self { workspace_id: identity.workspace_id.clone(), machine_name: machine_name.into() }
    }
}

impl fmt::Display for MachineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workspace_id, self.machine_name)
    }
}

/// One container of a workspace pod, independently tracked for status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,
    pub pod_name: String,
    pub container_name: String,
    pub status: MachineStatus,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    /// Exposed servers keyed by server reference.
    #[serde(default)]
    pub servers: IndexMap<String, Server>,
}

impl Machine {
    /// A machine record in its initial `Starting` state.
    pub fn starting(
        name: impl Into<String>,
        pod_name: impl Into<String>,
        container_name: impl Into<String>,
        servers: IndexMap<String, Server>,
    ) -> Self {
        Self {
            name: name.into(),
            pod_name: pod_name.into(),
            container_name: container_name.into(),
            status: MachineStatus::Starting,
            attributes: IndexMap::new(),
            servers,
        }
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
