// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store contracts consumed by the runtime.
//!
//! Implementations must make every method an atomic operation with respect
//! to concurrent callers; the runtime never takes an external lock around
//! them.

use crate::runtime_state::RuntimeState;
use async_trait::async_trait;
use bv_core::{
    Machine, MachineKey, MachineStatus, OwnerId, RuntimeError, RuntimeIdentity, Server,
    ServerStatus, WorkspaceId, WorkspaceStatus,
};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Runtime-state table keyed by workspace id.
#[async_trait]
pub trait RuntimeStateStore: Send + Sync {
    /// Insert the initial state. Returns `false` when a state already
    /// exists for the workspace — the caller maps that to a conflict.
    async fn init(&self, state: RuntimeState) -> Result<bool, RuntimeError>;

    async fn get(&self, workspace_id: &WorkspaceId)
        -> Result<Option<RuntimeState>, RuntimeError>;

    async fn status(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<WorkspaceStatus>, RuntimeError>;

    /// Unconditionally set the status of an existing state.
    async fn update_status(
        &self,
        workspace_id: &WorkspaceId,
        status: WorkspaceStatus,
    ) -> Result<(), RuntimeError>;

    /// Compare-and-set: move to `next` only while `expect` holds for the
    /// current status. Returns whether the replacement happened.
    async fn replace_status(
        &self,
        workspace_id: &WorkspaceId,
        expect: fn(WorkspaceStatus) -> bool,
        next: WorkspaceStatus,
    ) -> Result<bool, RuntimeError>;

    /// Remove the state row; absent rows are a no-op.
    async fn remove(&self, workspace_id: &WorkspaceId) -> Result<(), RuntimeError>;

    async fn identities(&self) -> Result<Vec<RuntimeIdentity>, RuntimeError>;

    /// States left in `Starting`/`Stopping`, e.g. by a process that died
    /// mid-operation. The supervising layer decides what to do with them.
    async fn in_progress(&self) -> Result<Vec<RuntimeState>, RuntimeError>;
}

/// Machine table keyed by (workspace id, machine name).
#[async_trait]
pub trait MachineStore: Send + Sync {
    async fn put(&self, key: MachineKey, machine: Machine) -> Result<(), RuntimeError>;

    /// Monotonic status update. Regressions (e.g. `Running → Starting`)
    /// are ignored; returns whether the status actually moved.
    async fn update_machine_status(
        &self,
        key: &MachineKey,
        status: MachineStatus,
    ) -> Result<bool, RuntimeError>;

    /// Compare-and-set on one server's status. Returns `true` only when
    /// the stored status changed, so racing probe callbacks publish each
    /// transition exactly once.
    async fn update_server_status(
        &self,
        key: &MachineKey,
        server: &str,
        status: ServerStatus,
    ) -> Result<bool, RuntimeError>;

    async fn get_server(
        &self,
        key: &MachineKey,
        server: &str,
    ) -> Result<Option<Server>, RuntimeError>;

    async fn machines(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<IndexMap<String, Machine>, RuntimeError>;

    /// Remove all machines of a workspace; absent rows are a no-op.
    async fn remove(&self, workspace_id: &WorkspaceId) -> Result<(), RuntimeError>;
}

/// Per-user preference map.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn find(&self, owner: &OwnerId) -> Result<HashMap<String, String>, RuntimeError>;

    /// Merge `entries` into the user's preference map.
    async fn update(
        &self,
        owner: &OwnerId,
        entries: HashMap<String, String>,
    ) -> Result<(), RuntimeError>;
}
