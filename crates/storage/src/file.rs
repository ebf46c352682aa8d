// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed store implementation.
//!
//! All three tables live in one JSON document, rewritten atomically
//! (write-temp-then-rename) after every mutation while the in-process lock
//! is held. The document is small — a handful of workspaces — so full
//! rewrites beat the complexity of an append log here.

use crate::runtime_state::RuntimeState;
use crate::store::{MachineStore, PreferenceStore, RuntimeStateStore};
use async_trait::async_trait;
use bv_core::{
    Machine, MachineKey, MachineStatus, OwnerId, RuntimeError, RuntimeIdentity, Server,
    ServerStatus, WorkspaceId, WorkspaceStatus,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    /// workspace id → runtime state
    #[serde(default)]
    runtimes: HashMap<String, RuntimeState>,
    /// workspace id → machine name → machine
    #[serde(default)]
    machines: HashMap<String, IndexMap<String, Machine>>,
    /// owner id → preference key → value
    #[serde(default)]
    preferences: HashMap<String, HashMap<String, String>>,
}

/// Durable store holding runtime states, machines and user preferences.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl FileStore {
    /// Open (or create) the store at `path`, loading any existing content.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RuntimeError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                RuntimeError::infrastructure(format!(
                    "corrupt state file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => {
                return Err(RuntimeError::infrastructure(format!(
                    "cannot read state file {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Ok(Self { path, state: Mutex::new(state) })
    }

    /// Write the current state to disk. Called with the lock held so
    /// concurrent mutations serialize through one writer.
    fn persist(&self, state: &PersistedState) -> Result<(), RuntimeError> {
        let raw = serde_json::to_vec_pretty(state)
            .map_err(|e| RuntimeError::infrastructure(format!("state encoding failed: {}", e)))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw).map_err(|e| {
            RuntimeError::infrastructure(format!("cannot write {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            RuntimeError::infrastructure(format!("cannot replace {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl RuntimeStateStore for FileStore {
    async fn init(&self, state: RuntimeState) -> Result<bool, RuntimeError> {
        let mut guard = self.state.lock();
        let key = state.identity.workspace_id.to_string();
        if guard.runtimes.contains_key(&key) {
            return Ok(false);
        }
        guard.runtimes.insert(key, state);
        self.persist(&guard)?;
        Ok(true)
    }

    async fn get(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<RuntimeState>, RuntimeError> {
        Ok(self.state.lock().runtimes.get(workspace_id.as_str()).cloned())
    }

    async fn status(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<WorkspaceStatus>, RuntimeError> {
        Ok(self.state.lock().runtimes.get(workspace_id.as_str()).map(|s| s.status))
    }

    async fn update_status(
        &self,
        workspace_id: &WorkspaceId,
        status: WorkspaceStatus,
    ) -> Result<(), RuntimeError> {
        let mut guard = self.state.lock();
        let state = guard.runtimes.get_mut(workspace_id.as_str()).ok_or_else(|| {
            RuntimeError::infrastructure(format!(
                "no runtime state recorded for workspace '{}'",
                workspace_id
            ))
        })?;
        state.status = status;
        self.persist(&guard)
    }

    async fn replace_status(
        &self,
        workspace_id: &WorkspaceId,
        expect: fn(WorkspaceStatus) -> bool,
        next: WorkspaceStatus,
    ) -> Result<bool, RuntimeError> {
        let mut guard = self.state.lock();
        let Some(state) = guard.runtimes.get_mut(workspace_id.as_str()) else {
            return Ok(false);
        };
        if !expect(state.status) {
            return Ok(false);
        }
        state.status = next;
        self.persist(&guard)?;
        Ok(true)
    }

    async fn remove(&self, workspace_id: &WorkspaceId) -> Result<(), RuntimeError> {
        let mut guard = self.state.lock();
        if guard.runtimes.remove(workspace_id.as_str()).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }

    async fn identities(&self) -> Result<Vec<RuntimeIdentity>, RuntimeError> {
        Ok(self.state.lock().runtimes.values().map(|s| s.identity.clone()).collect())
    }

    async fn in_progress(&self) -> Result<Vec<RuntimeState>, RuntimeError> {
        Ok(self
            .state
            .lock()
            .runtimes
            .values()
            .filter(|s| s.status.is_in_progress())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MachineStore for FileStore {
    async fn put(&self, key: MachineKey, machine: Machine) -> Result<(), RuntimeError> {
        let mut guard = self.state.lock();
        guard
            .machines
            .entry(key.workspace_id.to_string())
            .or_default()
            .insert(key.machine_name, machine);
        self.persist(&guard)
    }

    async fn update_machine_status(
        &self,
        key: &MachineKey,
        status: MachineStatus,
    ) -> Result<bool, RuntimeError> {
        let mut guard = self.state.lock();
        let Some(machine) = guard
            .machines
            .get_mut(key.workspace_id.as_str())
            .and_then(|m| m.get_mut(&key.machine_name))
        else {
            return Err(RuntimeError::infrastructure(format!("unknown machine '{}'", key)));
        };
        if !machine.status.can_transition_to(status) {
            tracing::debug!(machine = %key, from = %machine.status, to = %status,
                "ignoring machine status regression");
            return Ok(false);
        }
        machine.status = status;
        self.persist(&guard)?;
        Ok(true)
    }

    async fn update_server_status(
        &self,
        key: &MachineKey,
        server: &str,
        status: ServerStatus,
    ) -> Result<bool, RuntimeError> {
        let mut guard = self.state.lock();
        let Some(entry) = guard
            .machines
            .get_mut(key.workspace_id.as_str())
            .and_then(|m| m.get_mut(&key.machine_name))
            .and_then(|m| m.servers.get_mut(server))
        else {
            return Err(RuntimeError::infrastructure(format!(
                "unknown server '{}' on machine '{}'",
                server, key
            )));
        };
        if entry.status == status {
            return Ok(false);
        }
        entry.status = status;
        self.persist(&guard)?;
        Ok(true)
    }

    async fn get_server(
        &self,
        key: &MachineKey,
        server: &str,
    ) -> Result<Option<Server>, RuntimeError> {
        Ok(self
            .state
            .lock()
            .machines
            .get(key.workspace_id.as_str())
            .and_then(|m| m.get(&key.machine_name))
            .and_then(|m| m.servers.get(server))
            .cloned())
    }

    async fn machines(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<IndexMap<String, Machine>, RuntimeError> {
        Ok(self.state.lock().machines.get(workspace_id.as_str()).cloned().unwrap_or_default())
    }

    async fn remove(&self, workspace_id: &WorkspaceId) -> Result<(), RuntimeError> {
        let mut guard = self.state.lock();
        if guard.machines.remove(workspace_id.as_str()).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for FileStore {
    async fn find(&self, owner: &OwnerId) -> Result<HashMap<String, String>, RuntimeError> {
        Ok(self.state.lock().preferences.get(owner.as_str()).cloned().unwrap_or_default())
    }

    async fn update(
        &self,
        owner: &OwnerId,
        entries: HashMap<String, String>,
    ) -> Result<(), RuntimeError> {
        let mut guard = self.state.lock();
        guard.preferences.entry(owner.to_string()).or_default().extend(entries);
        self.persist(&guard)
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
