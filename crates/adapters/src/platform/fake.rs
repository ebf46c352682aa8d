// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake platform driver for deterministic testing.
//!
//! Records every call and lets tests drive pod phases and ingress
//! addresses through watch channels, so engine waits suspend and resume
//! exactly like against a real API server.

use super::{PlatformDriver, LABEL_MANAGED_BY};
use async_trait::async_trait;
use bv_core::{RuntimeError, WorkspaceId};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, NamespaceStatus, PersistentVolumeClaim, Pod, PodStatus, Secret, Service,
};
use k8s_openapi::api::networking::v1::{
    Ingress, IngressLoadBalancerIngress, IngressLoadBalancerStatus, IngressStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Recorded call to [`FakeDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    CreatePod { name: String },
    CreateService { name: String },
    CreateIngress { name: String },
    CreatePvc { name: String },
    CreateSecret { name: String },
    CreateConfigMap { name: String },
    CreateNamespace { name: String },
    DeleteNamespace { name: String },
    DeleteWorkspaceObjects { namespace: String, workspace_id: String },
    EnsureServiceAccount { namespace: String, name: String },
    EnsureRoleBinding { namespace: String, service_account: String },
}

struct FakeState {
    calls: Vec<DriverCall>,
    /// Existing namespaces, name → managed label value (if any).
    namespaces: HashMap<String, Option<String>>,
    /// Pod name → phase channel ("Pending", "Running", "Failed").
    pod_phases: HashMap<String, watch::Sender<String>>,
    /// Ingress name → assigned address channel.
    ingress_hosts: HashMap<String, watch::Sender<Option<String>>>,
    /// When set, namespace lookup/list calls fail with this message.
    namespace_error: Option<String>,
    /// Count of get/list namespace calls, for caching assertions.
    namespace_lookups: usize,
}

/// Fake platform driver: programmable phases, recorded calls.
#[derive(Clone)]
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
    /// Assign ingress addresses immediately on creation (default true).
    auto_ingress: bool,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                namespaces: HashMap::new(),
                pod_phases: HashMap::new(),
                ingress_hosts: HashMap::new(),
                namespace_error: None,
                namespace_lookups: 0,
            })),
            auto_ingress: true,
        }
    }

    /// Fake where created ingresses never receive an address until
    /// [`FakeDriver::set_ingress_host`] is called.
    pub fn without_auto_ingress(mut self) -> Self {
        self.auto_ingress = false;
        self
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Pre-populate an existing namespace.
    pub fn insert_namespace(&self, name: &str) {
        self.state.lock().namespaces.insert(name.to_string(), None);
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.state.lock().namespaces.contains_key(name)
    }

    /// Make namespace lookup/listing fail with `message`.
    pub fn set_namespace_error(&self, message: &str) {
        self.state.lock().namespace_error = Some(message.to_string());
    }

    /// How many namespace get/list calls were made.
    pub fn namespace_lookups(&self) -> usize {
        self.state.lock().namespace_lookups
    }

    /// Drive the named pod to `phase`, waking any waiters.
    pub fn set_pod_phase(&self, pod: &str, phase: &str) {
        let tx = self.phase_channel(pod);
        let _ = tx.send(phase.to_string());
    }

    /// Assign an address to the named ingress, waking any waiters.
    pub fn set_ingress_host(&self, ingress: &str, host: &str) {
        let tx = self.host_channel(ingress);
        let _ = tx.send(Some(host.to_string()));
    }

    fn phase_channel(&self, pod: &str) -> watch::Sender<String> {
        let mut state = self.state.lock();
        state
            .pod_phases
            .entry(pod.to_string())
            .or_insert_with(|| watch::channel("Pending".to_string()).0)
            .clone()
    }

    fn host_channel(&self, ingress: &str) -> watch::Sender<Option<String>> {
        let mut state = self.state.lock();
        state
            .ingress_hosts
            .entry(ingress.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .clone()
    }

    fn record(&self, call: DriverCall) {
        self.state.lock().calls.push(call);
    }

    fn namespace_guard(&self) -> Result<(), RuntimeError> {
        if let Some(message) = self.state.lock().namespace_error.clone() {
            return Err(RuntimeError::infrastructure(message));
        }
        Ok(())
    }
}

fn name_of(meta: &ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

fn pod_with_phase(name: &str, phase: &str) -> Pod {
    Pod {
        metadata: ObjectMeta { name: Some(name.to_string()), ..Default::default() },
        status: Some(PodStatus { phase: Some(phase.to_string()), ..Default::default() }),
        ..Default::default()
    }
}

fn ingress_with_host(name: &str, host: Option<&str>) -> Ingress {
    let status = host.map(|h| IngressStatus {
        load_balancer: Some(IngressLoadBalancerStatus {
            ingress: Some(vec![IngressLoadBalancerIngress {
                hostname: Some(h.to_string()),
                ..Default::default()
            }]),
        }),
    });
    Ingress {
        metadata: ObjectMeta { name: Some(name.to_string()), ..Default::default() },
        status,
        ..Default::default()
    }
}

#[async_trait]
impl PlatformDriver for FakeDriver {
    async fn create_pod(&self, _namespace: &str, pod: Pod) -> Result<Pod, RuntimeError> {
        let name = name_of(&pod.metadata);
        self.phase_channel(&name);
        self.record(DriverCall::CreatePod { name });
        Ok(pod)
    }

    async fn create_service(
        &self,
        _namespace: &str,
        service: Service,
    ) -> Result<Service, RuntimeError> {
        self.record(DriverCall::CreateService { name: name_of(&service.metadata) });
        Ok(service)
    }

    async fn create_ingress(
        &self,
        _namespace: &str,
        ingress: Ingress,
    ) -> Result<Ingress, RuntimeError> {
        let name = name_of(&ingress.metadata);
        let tx = self.host_channel(&name);
        if self.auto_ingress {
            let _ = tx.send(Some(format!("{}.fake.local", name)));
        }
        self.record(DriverCall::CreateIngress { name });
        Ok(ingress)
    }

    async fn create_pvc(
        &self,
        _namespace: &str,
        pvc: PersistentVolumeClaim,
    ) -> Result<(), RuntimeError> {
        self.record(DriverCall::CreatePvc { name: name_of(&pvc.metadata) });
        Ok(())
    }

    async fn create_secret(&self, _namespace: &str, secret: Secret) -> Result<(), RuntimeError> {
        self.record(DriverCall::CreateSecret { name: name_of(&secret.metadata) });
        Ok(())
    }

    async fn create_config_map(
        &self,
        _namespace: &str,
        config_map: ConfigMap,
    ) -> Result<(), RuntimeError> {
        self.record(DriverCall::CreateConfigMap { name: name_of(&config_map.metadata) });
        Ok(())
    }

    async fn wait_pod(
        &self,
        _namespace: &str,
        name: &str,
        timeout: Duration,
        cond: for<'a> fn(&'a Pod) -> bool,
    ) -> Result<Pod, RuntimeError> {
        let mut rx = self.phase_channel(name).subscribe();
        let wait = async {
            loop {
                let pod = pod_with_phase(name, &rx.borrow_and_update().clone());
                if cond(&pod) {
                    return pod;
                }
                if rx.changed().await.is_err() {
                    // channel dropped: suspend forever, the timeout decides
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            RuntimeError::infrastructure(format!(
                "pod '{}' was not ready within {}s",
                name,
                timeout.as_secs()
            ))
        })
    }

    async fn wait_ingress(
        &self,
        _namespace: &str,
        name: &str,
        timeout: Duration,
        cond: for<'a> fn(&'a Ingress) -> bool,
    ) -> Result<Ingress, RuntimeError> {
        let mut rx = self.host_channel(name).subscribe();
        let wait = async {
            loop {
                let host = rx.borrow_and_update().clone();
                let ingress = ingress_with_host(name, host.as_deref());
                if cond(&ingress) {
                    return ingress;
                }
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            RuntimeError::infrastructure(format!(
                "ingress '{}' was not ready within {}s",
                name,
                timeout.as_secs()
            ))
        })
    }

    async fn delete_workspace_objects(
        &self,
        namespace: &str,
        workspace_id: &WorkspaceId,
    ) -> Result<(), RuntimeError> {
        self.record(DriverCall::DeleteWorkspaceObjects {
            namespace: namespace.to_string(),
            workspace_id: workspace_id.to_string(),
        });
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, RuntimeError> {
        self.namespace_guard()?;
        let mut state = self.state.lock();
        state.namespace_lookups += 1;
        Ok(state.namespaces.get(name).map(|managed| Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: managed.as_ref().map(|v| {
                    let mut labels = BTreeMap::new();
                    labels.insert(LABEL_MANAGED_BY.to_string(), v.clone());
                    labels
                }),
                ..Default::default()
            },
            status: Some(NamespaceStatus {
                phase: Some("Active".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }))
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, RuntimeError> {
        self.namespace_guard()?;
        let names: Vec<String> = self.state.lock().namespaces.keys().cloned().collect();
        let mut namespaces = Vec::new();
        for name in names {
            if let Some(ns) = self.get_namespace(&name).await? {
                namespaces.push(ns);
            }
        }
        Ok(namespaces)
    }

    async fn create_namespace(
        &self,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        let managed = labels.get(LABEL_MANAGED_BY).cloned();
        state.namespaces.entry(name.to_string()).or_insert(managed);
        state.calls.push(DriverCall::CreateNamespace { name: name.to_string() });
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.namespaces.remove(name);
        state.calls.push(DriverCall::DeleteNamespace { name: name.to_string() });
        Ok(())
    }

    async fn ensure_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), RuntimeError> {
        self.record(DriverCall::EnsureServiceAccount {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn ensure_role_binding(
        &self,
        namespace: &str,
        service_account: &str,
        _cluster_role: &str,
    ) -> Result<(), RuntimeError> {
        self.record(DriverCall::EnsureRoleBinding {
            namespace: namespace.to_string(),
            service_account: service_account.to_string(),
        });
        Ok(())
    }
}
