// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted lifecycle state of one workspace runtime.

use bv_core::{RuntimeIdentity, WorkspaceStatus};
use serde::{Deserialize, Serialize};

/// One row of the runtime-state table.
///
/// At most one exists per workspace id; creating a second is a conflict.
/// Rows left in `Starting`/`Stopping` after a process restart mark
/// operations that died mid-flight and are surfaced via `in_progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub identity: RuntimeIdentity,
    pub namespace: String,
    pub status: WorkspaceStatus,
}

impl RuntimeState {
    pub fn starting(identity: RuntimeIdentity, namespace: impl Into<String>) -> Self {
        Self { identity, namespace: namespace.into(), status: WorkspaceStatus::Starting }
    }
}
