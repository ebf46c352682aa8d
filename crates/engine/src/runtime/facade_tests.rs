// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::namespace::resolver::ResolutionContext;
use crate::runtime::test_support::*;
use bv_adapters::DriverCall;
use bv_core::{
    Machine, MachineKey, RuntimeError, RuntimeEvent, Server, ServerStatus, WorkspaceStatus,
};
use bv_storage::{MachineStore, RuntimeState, RuntimeStateStore};
use indexmap::IndexMap;
use std::time::Duration;

fn ctx() -> ResolutionContext {
    ResolutionContext::new("wksp-1", "user-1", "bob")
}

async fn seed_running_workspace(fix: &Fixture) {
    let state = RuntimeState {
        identity: identity(),
        namespace: "bv-bob".to_string(),
        status: WorkspaceStatus::Running,
    };
    assert!(fix.store.init(state).await.unwrap());

    let mut servers = IndexMap::new();
    servers.insert("ide".to_string(), Server::new("http://wksp-1-dev-ide.ws.example.org"));
    let mut machine = Machine::starting("dev", "wksp-1-main", "dev", servers);
    machine.status = bv_core::MachineStatus::Running;
    MachineStore::put(&*fix.store, MachineKey::new(&identity(), "dev"), machine)
        .await
        .unwrap();
}

#[tokio::test]
async fn prepare_resolves_and_provisions_the_namespace() {
    let fix = fixture();
    let bare = bv_core::RuntimeIdentity::new("wksp-1", "default", "user-1");

    let prepared = fix.runtime.prepare(&ctx(), bare).await.unwrap();
    assert_eq!(prepared.namespace().unwrap(), "bv-bob");
    assert!(fix.driver.has_namespace("bv-bob"));
}

#[tokio::test]
async fn prepare_rejects_foreign_user_supplied_namespaces() {
    let fix = fixture();
    let bare = bv_core::RuntimeIdentity::new("wksp-1", "default", "user-1")
        .with_namespace("somebody-elses");

    let err = fix.runtime.prepare(&ctx(), bare).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Validation(_)));
}

#[tokio::test]
async fn stop_of_a_stopped_workspace_is_a_noop() {
    let fix = fixture();

    fix.runtime.stop(&identity()).await.unwrap();

    // no teardown work was issued
    assert!(fix.driver.calls().is_empty());
}

#[tokio::test]
async fn stop_of_a_starting_workspace_is_a_conflict() {
    let fix = fixture();
    let state = RuntimeState::starting(identity(), "bv-bob");
    assert!(fix.store.init(state).await.unwrap());

    let err = fix.runtime.stop(&identity()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Conflict(_)));
}

#[tokio::test]
async fn stop_tears_down_objects_state_and_probes() {
    let mut fix = fixture();
    seed_running_workspace(&fix).await;
    fix.runtime.start_servers_checkers(&identity()).await.unwrap();
    assert!(fix.runtime.probes.is_probing(&identity().workspace_id));

    fix.runtime.stop(&identity()).await.unwrap();

    assert!(fix.driver.calls().iter().any(|c| matches!(
        c,
        DriverCall::DeleteWorkspaceObjects { namespace, workspace_id }
            if namespace == "bv-bob" && workspace_id == "wksp-1"
    )));
    assert_eq!(
        fix.runtime.get_status(&identity().workspace_id).await.unwrap(),
        WorkspaceStatus::Stopped
    );
    assert!(fix.runtime.get_machines(&identity().workspace_id).await.unwrap().is_empty());
    assert!(!fix.runtime.probes.is_probing(&identity().workspace_id));

    let events = drain_events(&mut fix.events);
    assert!(events.iter().any(|e| matches!(e, RuntimeEvent::RuntimeStopped { .. })));
}

#[tokio::test]
async fn in_progress_surfaces_interrupted_operations() {
    let fix = fixture();
    assert!(fix.runtime.in_progress().await.unwrap().is_empty());

    let state = RuntimeState::starting(identity(), "bv-bob");
    assert!(fix.store.init(state).await.unwrap());

    let stuck = fix.runtime.in_progress().await.unwrap();
    assert_eq!(stuck.len(), 1);
    assert_eq!(stuck[0].status, WorkspaceStatus::Starting);
    assert_eq!(stuck[0].identity.workspace_id, identity().workspace_id);
}

#[tokio::test]
async fn liveness_probe_failure_flips_server_status_and_publishes() {
    let mut fix = fixture();
    seed_running_workspace(&fix).await;

    // server was healthy at readiness time, then the probe finds it dead
    fix.checker.set_available("http://wksp-1-dev-ide.ws.example.org", false);
    fix.runtime.start_servers_checkers(&identity()).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(event) = fix.events.recv().await {
                if matches!(event, RuntimeEvent::ServerStatusChanged { .. }) {
                    return event;
                }
            }
        }
    })
    .await
    .unwrap();

    assert!(matches!(
        event,
        RuntimeEvent::ServerStatusChanged { status: ServerStatus::Stopped, ref server, .. }
            if server == "ide"
    ));

    let machines = fix.runtime.get_machines(&identity().workspace_id).await.unwrap();
    assert_eq!(machines["dev"].servers["ide"].status, ServerStatus::Stopped);

    fix.runtime.probes.cancel(&identity().workspace_id);
}

#[tokio::test]
async fn probe_cancel_is_idempotent_through_the_facade() {
    let fix = fixture();
    fix.runtime.probes.cancel(&identity().workspace_id);
    fix.runtime.probes.cancel(&identity().workspace_id);
}
