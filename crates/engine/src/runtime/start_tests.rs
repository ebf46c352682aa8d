// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::runtime::test_support::*;
use bv_adapters::{DriverCall, FakeDriver, FakeServerChecker};
use bv_core::{
    MachineConfig, MachineStatus, Recipe, RecipeKind, RuntimeError, RuntimeEvent, ServerStatus,
    WorkspaceStatus,
};
use bv_core::{Environment, Installer};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn two_machines_with_servers_start_successfully() {
    let mut fix = fixture();
    fix.driver.set_pod_phase("wksp-1-main", "Running");

    fix.runtime.start(&identity(), &two_machine_env()).await.unwrap();

    assert_eq!(
        fix.runtime.get_status(&identity().workspace_id).await.unwrap(),
        WorkspaceStatus::Running
    );

    let machines = fix.runtime.get_machines(&identity().workspace_id).await.unwrap();
    assert_eq!(machines.len(), 2);
    assert_eq!(machines["dev"].status, MachineStatus::Running);
    assert_eq!(machines["db"].status, MachineStatus::Running);
    assert_eq!(machines["dev"].servers["ide"].status, ServerStatus::Running);
    assert_eq!(machines["db"].servers["sql"].status, ServerStatus::Running);

    // installers ran only for the machine that declares them
    assert_eq!(fix.bootstrapper.invocations(), vec!["dev".to_string()]);

    let events = drain_events(&mut fix.events);
    let dev_events: Vec<&RuntimeEvent> = events
        .iter()
        .filter(|e| match e {
            RuntimeEvent::MachineStarting { machine, .. }
            | RuntimeEvent::MachineRunning { machine, .. }
            | RuntimeEvent::ServerStatusChanged { machine, .. } => machine == "dev",
            _ => false,
        })
        .collect();
    // per-machine order: starting → running → server running
    assert!(matches!(dev_events[0], RuntimeEvent::MachineStarting { .. }));
    assert!(matches!(dev_events[1], RuntimeEvent::MachineRunning { .. }));
    assert!(matches!(
        dev_events[2],
        RuntimeEvent::ServerStatusChanged { status: ServerStatus::Running, .. }
    ));
}

#[tokio::test]
async fn failing_machine_cancels_the_others_before_bootstrap() {
    let mut fix = fixture();

    // two pods so the phases can diverge
    let mut a = MachineConfig::new("img-a");
    a.attributes.insert("pod".to_string(), "a-pod".to_string());
    let mut b = MachineConfig::new("img-b");
    b.attributes.insert("pod".to_string(), "b-pod".to_string());
    b.installers.push(Installer::new("editor"));
    let env = Environment::new(Recipe { kind: RecipeKind::Compose, content: String::new() })
        .with_machine("a", a)
        .with_machine("b", b);

    // machine a fails; machine b never leaves Pending
    fix.driver.set_pod_phase("wksp-1-a-pod", "Failed");

    let err = fix.runtime.start(&identity(), &env).await.unwrap_err();
    assert!(err.is_infrastructure());
    assert!(err.to_string().contains("Failed phase"));

    // b's pipeline was cancelled before its bootstrap step ran
    assert!(fix.bootstrapper.invocations().is_empty());

    // all machine rows and the runtime state are gone
    assert!(fix.runtime.get_machines(&identity().workspace_id).await.unwrap().is_empty());
    assert_eq!(
        fix.runtime.get_status(&identity().workspace_id).await.unwrap(),
        WorkspaceStatus::Stopped
    );

    // cleanup deleted the workspace objects
    assert!(fix.driver.calls().iter().any(|c| matches!(
        c,
        DriverCall::DeleteWorkspaceObjects { workspace_id, .. } if workspace_id == "wksp-1"
    )));

    // exactly one failed event, for the machine that caused it
    let events = drain_events(&mut fix.events);
    let failed: Vec<&RuntimeEvent> = events
        .iter()
        .filter(|e| matches!(e, RuntimeEvent::MachineFailed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(failed[0], RuntimeEvent::MachineFailed { machine, .. } if machine == "a"));
}

#[tokio::test]
async fn start_timeout_cleans_up_and_reports_timeout() {
    let mut config = fast_config();
    config.timeouts.workspace_start_min = 0;
    let fix = fixture_with(config, FakeDriver::new(), FakeServerChecker::all_available());

    // pods never leave Pending
    let err = fix.runtime.start(&identity(), &two_machine_env()).await.unwrap_err();
    assert!(err.is_infrastructure());
    assert!(err.to_string().contains("timeout"));

    assert!(fix.runtime.get_machines(&identity().workspace_id).await.unwrap().is_empty());
    assert_eq!(
        fix.runtime.get_status(&identity().workspace_id).await.unwrap(),
        WorkspaceStatus::Stopped
    );
}

#[tokio::test]
async fn second_start_is_a_conflict() {
    let fix = fixture();
    fix.driver.set_pod_phase("wksp-1-main", "Running");
    fix.runtime.start(&identity(), &two_machine_env()).await.unwrap();

    let err = fix.runtime.start(&identity(), &two_machine_env()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Conflict(_)));

    // the running workspace is untouched by the refused second start
    assert_eq!(
        fix.runtime.get_status(&identity().workspace_id).await.unwrap(),
        WorkspaceStatus::Running
    );
}

#[tokio::test]
async fn cancelling_the_start_interrupts_and_cleans_up() {
    let fix = fixture();
    let cancel = CancellationToken::new();
    let runtime = fix.runtime.clone();
    let token = cancel.clone();

    // pods stay Pending: the pipelines suspend in wait-running
    let handle = tokio::spawn(async move {
        runtime.start_cancellable(&identity(), &two_machine_env(), token).await
    });

    // wait until the start is underway, then cancel it
    loop {
        if fix.runtime.get_status(&identity().workspace_id).await.unwrap()
            == WorkspaceStatus::Starting
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_interrupted());
    assert_eq!(
        fix.runtime.get_status(&identity().workspace_id).await.unwrap(),
        WorkspaceStatus::Stopped
    );
    assert!(fix.runtime.get_machines(&identity().workspace_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn ingress_without_address_times_out_before_pods_exist() {
    let mut config = fast_config();
    config.timeouts.ingress_start_min = 0;
    let fix = fixture_with(
        config,
        FakeDriver::new().without_auto_ingress(),
        FakeServerChecker::all_available(),
    );

    let err = fix.runtime.start(&identity(), &two_machine_env()).await.unwrap_err();
    assert!(err.is_infrastructure());

    // failed while waiting for wiring: no pod was ever submitted
    let calls = fix.driver.calls();
    assert!(!calls.iter().any(|c| matches!(c, DriverCall::CreatePod { .. })));
    assert!(calls.iter().any(|c| matches!(c, DriverCall::DeleteWorkspaceObjects { .. })));
}

#[tokio::test]
async fn cyclic_start_order_fails_validation_before_any_submission() {
    let fix = fixture();

    let mut a = MachineConfig::new("img-a");
    a.depends_on.push("b".to_string());
    let mut b = MachineConfig::new("img-b");
    b.depends_on.push("a".to_string());
    let env = Environment::new(Recipe { kind: RecipeKind::Compose, content: String::new() })
        .with_machine("a", a)
        .with_machine("b", b);

    let err = fix.runtime.start(&identity(), &env).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Validation(_)));

    let calls = fix.driver.calls();
    assert!(!calls.iter().any(|c| matches!(
        c,
        DriverCall::CreatePod { .. }
            | DriverCall::CreateService { .. }
            | DriverCall::CreateIngress { .. }
            | DriverCall::CreatePvc { .. }
    )));
}

#[tokio::test]
async fn unready_server_fails_the_start_and_marks_it_stopped() {
    let mut fix = fixture_with(
        fast_config(),
        FakeDriver::new(),
        FakeServerChecker::all_unavailable(),
    );
    // only dev's IDE server stays dead, so the failure is deterministic
    fix.checker.set_available("http://wksp-1-db.bv-bob.svc:5432", true);
    fix.driver.set_pod_phase("wksp-1-main", "Running");

    let err = fix.runtime.start(&identity(), &two_machine_env()).await.unwrap_err();
    assert!(err.is_infrastructure());
    assert!(err.to_string().contains("did not become ready"));

    let events = drain_events(&mut fix.events);
    assert!(events.iter().any(|e| matches!(
        e,
        RuntimeEvent::ServerStatusChanged { server, status: ServerStatus::Stopped, .. }
            if server == "ide"
    )));

    assert!(fix.runtime.get_machines(&identity().workspace_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn start_requires_a_resolved_namespace() {
    let fix = fixture();
    let bare = bv_core::RuntimeIdentity::new("wksp-1", "default", "user-1");
    let err = fix.runtime.start(&bare, &two_machine_env()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Validation(_)));
}
