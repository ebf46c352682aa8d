// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::namespace::resolver::{NamespaceResolver, ResolutionContext};
use bv_adapters::{DriverCall, FakeDriver};
use bv_core::{NamespaceConfig, WorkspaceId};
use bv_storage::FileStore;
use std::sync::Arc;

struct Fixture {
    driver: Arc<FakeDriver>,
    provisioner: NamespaceProvisioner,
    _dir: tempfile::TempDir,
}

fn fixture(config: NamespaceConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(FakeDriver::new());
    let prefs = Arc::new(FileStore::open(dir.path().join("state.json")).unwrap());
    let resolver =
        Arc::new(NamespaceResolver::new(config.clone(), driver.clone(), prefs));
    let provisioner = NamespaceProvisioner::new(config, driver.clone(), resolver);
    Fixture { driver, provisioner, _dir: dir }
}

fn ctx() -> ResolutionContext {
    ResolutionContext::new("wksp-1", "123", "bob")
}

fn config() -> NamespaceConfig {
    NamespaceConfig { default_template: "dev-<username>".to_string(), ..Default::default() }
}

#[tokio::test]
async fn creates_absent_default_namespace() {
    let fix = fixture(config());
    let ws = WorkspaceId::new("wksp-1");

    let ns = fix.provisioner.get_or_create(&ws, "dev-bob", &ctx()).await.unwrap();
    assert_eq!(ns.name, "dev-bob");
    assert!(fix.driver.has_namespace("dev-bob"));
    assert!(fix
        .driver
        .calls()
        .contains(&DriverCall::CreateNamespace { name: "dev-bob".to_string() }));
}

#[tokio::test]
async fn reuses_existing_namespace_without_creating() {
    let fix = fixture(config());
    fix.driver.insert_namespace("dev-bob");
    let ws = WorkspaceId::new("wksp-1");

    fix.provisioner.get_or_create(&ws, "dev-bob", &ctx()).await.unwrap();
    assert!(!fix
        .driver
        .calls()
        .iter()
        .any(|c| matches!(c, DriverCall::CreateNamespace { .. })));
}

#[tokio::test]
async fn get_or_create_is_idempotent() {
    let fix = fixture(config());
    let ws = WorkspaceId::new("wksp-1");

    fix.provisioner.get_or_create(&ws, "dev-bob", &ctx()).await.unwrap();
    fix.provisioner.get_or_create(&ws, "dev-bob", &ctx()).await.unwrap();
    assert!(fix.driver.has_namespace("dev-bob"));
}

#[tokio::test]
async fn absent_namespace_with_creation_disabled_fails() {
    let mut config = config();
    config.auto_create = false;
    let fix = fixture(config);
    let ws = WorkspaceId::new("wksp-1");

    let err = fix.provisioner.get_or_create(&ws, "dev-bob", &ctx()).await.unwrap_err();
    assert!(err.is_infrastructure());
    assert!(err.to_string().contains("pre-exist"));
}

#[tokio::test]
async fn foreign_name_is_not_created_unless_user_defined_allowed() {
    let fix = fixture(config());
    let ws = WorkspaceId::new("wksp-1");

    let err = fix.provisioner.get_or_create(&ws, "other-ns", &ctx()).await.unwrap_err();
    assert!(err.is_infrastructure());

    let mut permissive = config();
    permissive.allow_user_defined = true;
    let fix = fixture(permissive);
    fix.provisioner.get_or_create(&ws, "other-ns", &ctx()).await.unwrap();
    assert!(fix.driver.has_namespace("other-ns"));
}

#[tokio::test]
async fn prepares_service_account_and_role_binding_when_configured() {
    let mut config = config();
    config.service_account = Some("workspace".to_string());
    config.cluster_role = Some("workspace-role".to_string());
    let fix = fixture(config);
    let ws = WorkspaceId::new("wksp-1");

    fix.provisioner.get_or_create(&ws, "dev-bob", &ctx()).await.unwrap();

    let calls = fix.driver.calls();
    assert!(calls.contains(&DriverCall::EnsureServiceAccount {
        namespace: "dev-bob".to_string(),
        name: "workspace".to_string(),
    }));
    assert!(calls.contains(&DriverCall::EnsureRoleBinding {
        namespace: "dev-bob".to_string(),
        service_account: "workspace".to_string(),
    }));
}

#[tokio::test]
async fn delete_if_managed_round_trip() {
    let fix = fixture(config());
    let ws = WorkspaceId::new("wksp-1");
    fix.driver.insert_namespace("dev-wksp-1");
    fix.driver.insert_namespace("dev-bob");

    // name contains the workspace id: deleted
    fix.provisioner.delete_if_managed(&ws, "dev-wksp-1").await.unwrap();
    assert!(!fix.driver.has_namespace("dev-wksp-1"));

    // shared name: never deleted, no driver delete call for it
    fix.provisioner.delete_if_managed(&ws, "dev-bob").await.unwrap();
    assert!(fix.driver.has_namespace("dev-bob"));
    assert!(!fix
        .driver
        .calls()
        .contains(&DriverCall::DeleteNamespace { name: "dev-bob".to_string() }));
}
