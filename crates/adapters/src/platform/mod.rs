// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform driver capability.
//!
//! The runtime engine never talks to Kubernetes directly; it consumes this
//! trait. Waits are genuine async suspensions that the caller cancels by
//! dropping the future (the engine races them against a cancellation
//! token). The driver is a thread-safe collaborator — the engine never
//! assumes exclusive access.

mod kube_driver;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use kube_driver::KubeDriver;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{DriverCall, FakeDriver};

use async_trait::async_trait;
use bv_core::{RuntimeError, WorkspaceId};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use std::collections::BTreeMap;
use std::time::Duration;

/// Label carrying the owning workspace id on every created object.
pub const LABEL_WORKSPACE_ID: &str = "bivouac.io/workspace-id";
/// Label marking namespaces created (and therefore deletable) by bivouac.
pub const LABEL_MANAGED_BY: &str = "bivouac.io/managed-by";

/// Injected platform capability (Kubernetes object CRUD and waits).
#[async_trait]
pub trait PlatformDriver: Send + Sync + 'static {
    async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, RuntimeError>;

    async fn create_service(
        &self,
        namespace: &str,
        service: Service,
    ) -> Result<Service, RuntimeError>;

    async fn create_ingress(
        &self,
        namespace: &str,
        ingress: Ingress,
    ) -> Result<Ingress, RuntimeError>;

    /// Idempotent: an already-existing claim is not an error.
    async fn create_pvc(
        &self,
        namespace: &str,
        pvc: PersistentVolumeClaim,
    ) -> Result<(), RuntimeError>;

    async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<(), RuntimeError>;

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: ConfigMap,
    ) -> Result<(), RuntimeError>;

    /// Suspend until `cond` holds for the named pod, bounded by `timeout`.
    async fn wait_pod(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
        cond: for<'a> fn(&'a Pod) -> bool,
    ) -> Result<Pod, RuntimeError>;

    /// Suspend until `cond` holds for the named ingress, bounded by
    /// `timeout`.
    async fn wait_ingress(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
        cond: for<'a> fn(&'a Ingress) -> bool,
    ) -> Result<Ingress, RuntimeError>;

    /// Delete every workspace-labeled object in the namespace. Persistent
    /// volume claims are kept; the volume strategy owns their lifecycle.
    async fn delete_workspace_objects(
        &self,
        namespace: &str,
        workspace_id: &WorkspaceId,
    ) -> Result<(), RuntimeError>;

    /// `Ok(None)` when the namespace does not exist or is not visible to
    /// the service account (the platform reports both as forbidden).
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, RuntimeError>;

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, RuntimeError>;

    /// Idempotent namespace creation.
    async fn create_namespace(
        &self,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<(), RuntimeError>;

    async fn delete_namespace(&self, name: &str) -> Result<(), RuntimeError>;

    /// Idempotent service-account preparation.
    async fn ensure_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), RuntimeError>;

    /// Idempotent role-binding preparation for the workspace service
    /// account.
    async fn ensure_role_binding(
        &self,
        namespace: &str,
        service_account: &str,
        cluster_role: &str,
    ) -> Result<(), RuntimeError>;
}

/// Pod phase accessor shared by driver implementations and the engine.
pub fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

/// True once the pod reached a settled phase (Running or Failed).
pub fn pod_settled(pod: &Pod) -> bool {
    matches!(pod_phase(pod), Some("Running") | Some("Failed"))
}

/// True once the ingress has an externally reachable address.
pub fn ingress_has_address(ingress: &Ingress) -> bool {
    ingress
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .is_some_and(|entries| !entries.is_empty())
}
