// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace runtime lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a workspace runtime.
///
/// The state machine is `Stopped → Starting → Running → Stopping → Stopped`.
/// A failed start folds back to `Stopped` after cleanup; there is no
/// persisted failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl WorkspaceStatus {
    /// True for statuses that indicate an operation died mid-flight when
    /// found in the store after a process restart.
    pub fn is_in_progress(self) -> bool {
        matches!(self, WorkspaceStatus::Starting | WorkspaceStatus::Stopping)
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceStatus::Starting => write!(f, "starting"),
            WorkspaceStatus::Running => write!(f, "running"),
            WorkspaceStatus::Stopping => write!(f, "stopping"),
            WorkspaceStatus::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
