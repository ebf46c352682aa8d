// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes driver — implements [`PlatformDriver`] via `kube-rs`.
//!
//! Waits are polling loops (the same shape the platform watch degrades to
//! on reconnect) bounded by the caller's timeout; each iteration is one
//! `get` against the API server.

use super::{PlatformDriver, LABEL_WORKSPACE_ID};
use async_trait::async_trait;
use bv_core::{RuntimeError, WorkspaceId};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolumeClaim, Pod, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Client, Resource};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `PlatformDriver` backed by a shared `kube` client.
#[derive(Clone)]
pub struct KubeDriver {
    client: Client,
}

impl KubeDriver {
    /// Connect using the ambient kubeconfig/in-cluster environment.
    pub async fn connect() -> Result<Self, RuntimeError> {
        let client = Client::try_default()
            .await
            .map_err(|e| infra("failed to create kube client", e))?;
        Ok(Self { client })
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn workspace_selector(workspace_id: &WorkspaceId) -> ListParams {
        ListParams::default().labels(&format!("{}={}", LABEL_WORKSPACE_ID, workspace_id))
    }
}

fn infra(context: &str, err: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::infrastructure(format!("{}: {}", context, err))
}

fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

fn is_forbidden(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 403)
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Poll `api` until `cond` holds for `name`, bounded by `timeout`.
async fn wait_until<K>(
    api: &Api<K>,
    name: &str,
    timeout: Duration,
    cond: fn(&K) -> bool,
    what: &str,
) -> Result<K, RuntimeError>
where
    K: Clone + serde::de::DeserializeOwned + Debug,
{
    let poll = async {
        loop {
            let found = api
                .get_opt(name)
                .await
                .map_err(|e| infra(&format!("{} '{}' lookup failed", what, name), e))?;
            if let Some(obj) = found {
                if cond(&obj) {
                    return Ok(obj);
                }
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.map_err(|_| {
        RuntimeError::infrastructure(format!(
            "{} '{}' was not ready within {}s",
            what,
            name,
            timeout.as_secs()
        ))
    })?
}

#[async_trait]
impl PlatformDriver for KubeDriver {
    async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, RuntimeError> {
        self.api::<Pod>(namespace)
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| infra("pod creation failed", e))
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: Service,
    ) -> Result<Service, RuntimeError> {
        self.api::<Service>(namespace)
            .create(&PostParams::default(), &service)
            .await
            .map_err(|e| infra("service creation failed", e))
    }

    async fn create_ingress(
        &self,
        namespace: &str,
        ingress: Ingress,
    ) -> Result<Ingress, RuntimeError> {
        self.api::<Ingress>(namespace)
            .create(&PostParams::default(), &ingress)
            .await
            .map_err(|e| infra("ingress creation failed", e))
    }

    async fn create_pvc(
        &self,
        namespace: &str,
        pvc: PersistentVolumeClaim,
    ) -> Result<(), RuntimeError> {
        match self.api::<PersistentVolumeClaim>(namespace).create(&PostParams::default(), &pvc).await
        {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(infra("volume claim creation failed", e)),
        }
    }

    async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<(), RuntimeError> {
        match self.api::<Secret>(namespace).create(&PostParams::default(), &secret).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(infra("secret creation failed", e)),
        }
    }

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: ConfigMap,
    ) -> Result<(), RuntimeError> {
        match self.api::<ConfigMap>(namespace).create(&PostParams::default(), &config_map).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(infra("config map creation failed", e)),
        }
    }

    async fn wait_pod(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
        cond: for<'a> fn(&'a Pod) -> bool,
    ) -> Result<Pod, RuntimeError> {
        wait_until(&self.api::<Pod>(namespace), name, timeout, cond, "pod").await
    }

    async fn wait_ingress(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
        cond: for<'a> fn(&'a Ingress) -> bool,
    ) -> Result<Ingress, RuntimeError> {
        wait_until(&self.api::<Ingress>(namespace), name, timeout, cond, "ingress").await
    }

    async fn delete_workspace_objects(
        &self,
        namespace: &str,
        workspace_id: &WorkspaceId,
    ) -> Result<(), RuntimeError> {
        let dp = DeleteParams::default();
        let lp = Self::workspace_selector(workspace_id);

        self.api::<Pod>(namespace)
            .delete_collection(&dp, &lp)
            .await
            .map_err(|e| infra("pod deletion failed", e))?;
        self.api::<Service>(namespace)
            .delete_collection(&dp, &lp)
            .await
            .map_err(|e| infra("service deletion failed", e))?;
        self.api::<Ingress>(namespace)
            .delete_collection(&dp, &lp)
            .await
            .map_err(|e| infra("ingress deletion failed", e))?;
        self.api::<Secret>(namespace)
            .delete_collection(&dp, &lp)
            .await
            .map_err(|e| infra("secret deletion failed", e))?;
        self.api::<ConfigMap>(namespace)
            .delete_collection(&dp, &lp)
            .await
            .map_err(|e| infra("config map deletion failed", e))?;
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, RuntimeError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.get_opt(name).await {
            Ok(ns) => Ok(ns),
            // forbidden means the namespace is invisible to us; callers
            // treat that the same as absent
            Err(e) if is_forbidden(&e) => Ok(None),
            Err(e) => Err(infra("namespace lookup failed", e)),
        }
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, RuntimeError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| infra("namespace listing failed", e))?;
        Ok(list.items)
    }

    async fn create_namespace(
        &self,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<(), RuntimeError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            ..Default::default()
        };
        match api.create(&PostParams::default(), &namespace).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(infra("namespace creation failed", e)),
        }
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), RuntimeError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(infra("namespace deletion failed", e)),
        }
    }

    async fn ensure_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), RuntimeError> {
        let account = ServiceAccount {
            metadata: ObjectMeta { name: Some(name.to_string()), ..Default::default() },
            ..Default::default()
        };
        match self.api::<ServiceAccount>(namespace).create(&PostParams::default(), &account).await
        {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(infra("service account creation failed", e)),
        }
    }

    async fn ensure_role_binding(
        &self,
        namespace: &str,
        service_account: &str,
        cluster_role: &str,
    ) -> Result<(), RuntimeError> {
        let binding = RoleBinding {
            metadata: ObjectMeta {
                name: Some(format!("{}-binding", service_account)),
                ..Default::default()
            },
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "ClusterRole".to_string(),
                name: cluster_role.to_string(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: service_account.to_string(),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            }]),
        };
        match self.api::<RoleBinding>(namespace).create(&PostParams::default(), &binding).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(infra("role binding creation failed", e)),
        }
    }
}
