// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runtime_state::RuntimeState;
use crate::store::{MachineStore, PreferenceStore, RuntimeStateStore};
use bv_core::{
    Machine, MachineKey, MachineStatus, OwnerId, RuntimeIdentity, Server, ServerStatus,
    WorkspaceId, WorkspaceStatus,
};
use indexmap::IndexMap;
use std::collections::HashMap;

fn identity(workspace: &str) -> RuntimeIdentity {
    RuntimeIdentity::new(workspace, "default", "user-1").with_namespace("bv-bob")
}

fn store() -> (FileStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("state.json")).unwrap();
    (store, dir)
}

#[tokio::test]
async fn init_is_exclusive_per_workspace() {
    let (store, _dir) = store();
    let state = RuntimeState::starting(identity("wksp-1"), "bv-bob");

    assert!(store.init(state.clone()).await.unwrap());
    assert!(!store.init(state).await.unwrap());

    // removal makes the workspace startable again
    RuntimeStateStore::remove(&store, &WorkspaceId::new("wksp-1")).await.unwrap();
    let state = RuntimeState::starting(identity("wksp-1"), "bv-bob");
    assert!(store.init(state).await.unwrap());
}

#[tokio::test]
async fn replace_status_is_compare_and_set() {
    let (store, _dir) = store();
    let ws = WorkspaceId::new("wksp-1");
    store.init(RuntimeState::starting(identity("wksp-1"), "bv-bob")).await.unwrap();

    // guard fails: status is Starting, not Running
    let moved = store
        .replace_status(&ws, |s| s == WorkspaceStatus::Running, WorkspaceStatus::Stopping)
        .await
        .unwrap();
    assert!(!moved);

    store.update_status(&ws, WorkspaceStatus::Running).await.unwrap();
    let moved = store
        .replace_status(&ws, |s| s == WorkspaceStatus::Running, WorkspaceStatus::Stopping)
        .await
        .unwrap();
    assert!(moved);
    assert_eq!(store.status(&ws).await.unwrap(), Some(WorkspaceStatus::Stopping));
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let store = FileStore::open(&path).unwrap();
        store.init(RuntimeState::starting(identity("wksp-1"), "bv-bob")).await.unwrap();
        let key = MachineKey::new(&identity("wksp-1"), "dev");
        MachineStore::put(
            &store,
            key,
            Machine::starting("dev", "wksp-1-main", "dev", IndexMap::new()),
        )
        .await
        .unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    let ws = WorkspaceId::new("wksp-1");
    assert_eq!(store.status(&ws).await.unwrap(), Some(WorkspaceStatus::Starting));
    assert_eq!(store.in_progress().await.unwrap().len(), 1);
    assert_eq!(store.machines(&ws).await.unwrap().len(), 1);
}

#[tokio::test]
async fn machine_status_never_regresses() {
    let (store, _dir) = store();
    let id = identity("wksp-1");
    let key = MachineKey::new(&id, "dev");
    MachineStore::put(
        &store,
        key.clone(),
        Machine::starting("dev", "wksp-1-main", "dev", IndexMap::new()),
    )
    .await
    .unwrap();

    assert!(store.update_machine_status(&key, MachineStatus::Running).await.unwrap());
    // regression is ignored
    assert!(!store.update_machine_status(&key, MachineStatus::Starting).await.unwrap());
    let machines = store.machines(&key.workspace_id).await.unwrap();
    assert_eq!(machines["dev"].status, MachineStatus::Running);
}

#[tokio::test]
async fn server_status_update_reports_change_once() {
    let (store, _dir) = store();
    let id = identity("wksp-1");
    let key = MachineKey::new(&id, "dev");
    let mut servers = IndexMap::new();
    servers.insert("ide".to_string(), Server::new("http://ide.test"));
    MachineStore::put(&store, key.clone(), Machine::starting("dev", "wksp-1-main", "dev", servers))
        .await
        .unwrap();

    assert!(store.update_server_status(&key, "ide", ServerStatus::Running).await.unwrap());
    // same status again: no change, no event
    assert!(!store.update_server_status(&key, "ide", ServerStatus::Running).await.unwrap());
    assert_eq!(
        store.get_server(&key, "ide").await.unwrap().unwrap().status,
        ServerStatus::Running
    );
}

#[tokio::test]
async fn unknown_machine_is_an_infrastructure_error() {
    let (store, _dir) = store();
    let key = MachineKey::new(&identity("wksp-9"), "ghost");
    let err = store.update_machine_status(&key, MachineStatus::Running).await.unwrap_err();
    assert!(err.is_infrastructure());
}

#[tokio::test]
async fn preferences_merge_on_update() {
    let (store, _dir) = store();
    let owner = OwnerId::new("user-1");

    let mut first = HashMap::new();
    first.insert("infra.namespace".to_string(), "bv-bob".to_string());
    store.update(&owner, first).await.unwrap();

    let mut second = HashMap::new();
    second.insert("git.username".to_string(), "bob".to_string());
    store.update(&owner, second).await.unwrap();

    let prefs = store.find(&owner).await.unwrap();
    assert_eq!(prefs.get("infra.namespace").map(String::as_str), Some("bv-bob"));
    assert_eq!(prefs.get("git.username").map(String::as_str), Some("bob"));
}
