// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for runtime tests.

use super::WorkspaceRuntime;
use crate::events::EventPublisher;
use bv_adapters::{FakeBootstrapper, FakeDriver, FakeServerChecker};
use bv_core::{
    Environment, InfraConfig, Installer, MachineConfig, Recipe, RecipeKind, RuntimeEvent,
    RuntimeIdentity, ServerConfig,
};
use bv_storage::FileStore;
use std::sync::Arc;
use tokio::sync::mpsc;

pub(crate) struct Fixture {
    pub runtime: Arc<WorkspaceRuntime>,
    pub driver: Arc<FakeDriver>,
    pub bootstrapper: Arc<FakeBootstrapper>,
    pub checker: Arc<FakeServerChecker>,
    pub store: Arc<FileStore>,
    pub events: mpsc::UnboundedReceiver<RuntimeEvent>,
    pub _dir: tempfile::TempDir,
}

/// Timeouts tightened so failing waits resolve in test time.
pub(crate) fn fast_config() -> InfraConfig {
    let mut config =
        InfraConfig { ingress_domain: "ws.example.org".to_string(), ..Default::default() };
    config.timeouts.workspace_start_min = 1;
    config.timeouts.ingress_start_min = 1;
    config.timeouts.server_check_sec = 2;
    config.timeouts.server_check_interval_sec = 0;
    config.probes.interval_sec = 1;
    config
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(fast_config(), FakeDriver::new(), FakeServerChecker::all_available())
}

pub(crate) fn fixture_with(
    config: InfraConfig,
    driver: FakeDriver,
    checker: FakeServerChecker,
) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path().join("state.json")).unwrap());
    let driver = Arc::new(driver);
    let bootstrapper = Arc::new(FakeBootstrapper::new());
    let checker = Arc::new(checker);
    let (publisher, events) = EventPublisher::channel();
    let runtime = Arc::new(WorkspaceRuntime::new(
        config,
        driver.clone(),
        bootstrapper.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        checker.clone(),
        publisher,
    ));
    Fixture { runtime, driver, bootstrapper, checker, store, events, _dir: dir }
}

pub(crate) fn identity() -> RuntimeIdentity {
    RuntimeIdentity::new("wksp-1", "default", "user-1").with_namespace("bv-bob")
}

/// "dev" (public IDE server + one installer) and "db" (internal server).
pub(crate) fn two_machine_env() -> Environment {
    let mut dev = MachineConfig::new("quay.io/bivouac/dev");
    dev.servers.insert("ide".to_string(), ServerConfig::http(8080).exposed());
    dev.installers.push(Installer::new("editor"));

    let mut db = MachineConfig::new("postgres:16");
    db.servers.insert("sql".to_string(), ServerConfig::http(5432));

    Environment::new(Recipe { kind: RecipeKind::Compose, content: String::new() })
        .with_machine("dev", dev)
        .with_machine("db", db)
}

/// Collect everything currently buffered in the event channel.
pub(crate) fn drain_events(rx: &mut mpsc::UnboundedReceiver<RuntimeEvent>) -> Vec<RuntimeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
