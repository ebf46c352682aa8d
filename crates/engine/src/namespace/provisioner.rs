// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace provisioning.
//!
//! Creates (or validates) the namespace a workspace runs in, prepares the
//! workspace service account when configured, and deletes namespaces that
//! were created exclusively for one workspace.

use super::resolver::{NamespaceResolver, ResolutionContext};
use bv_adapters::{PlatformDriver, LABEL_MANAGED_BY};
use bv_core::{RuntimeError, WorkspaceId};
use std::collections::BTreeMap;
use std::sync::Arc;

const MANAGED_BY_VALUE: &str = "bivouac";

/// A namespace bound to one workspace for the duration of a runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceNamespace {
    pub name: String,
    pub workspace_id: WorkspaceId,
}

/// Creates and prepares workspace namespaces; idempotent throughout.
pub struct NamespaceProvisioner {
    config: bv_core::NamespaceConfig,
    driver: Arc<dyn PlatformDriver>,
    resolver: Arc<NamespaceResolver>,
}

impl NamespaceProvisioner {
    pub fn new(
        config: bv_core::NamespaceConfig,
        driver: Arc<dyn PlatformDriver>,
        resolver: Arc<NamespaceResolver>,
    ) -> Self {
        Self { config, driver, resolver }
    }

    /// Reuse the namespace if it exists; create and prepare it when
    /// creation is allowed; fail otherwise.
    pub async fn get_or_create(
        &self,
        workspace_id: &WorkspaceId,
        name: &str,
        ctx: &ResolutionContext,
    ) -> Result<WorkspaceNamespace, RuntimeError> {
        let existing = self.driver.get_namespace(name).await?;

        if existing.is_none() {
            if !self.can_create(name, ctx).await? {
                return Err(RuntimeError::infrastructure(format!(
                    "namespace '{}' is expected to pre-exist, but was not found",
                    name
                )));
            }
            let mut labels = BTreeMap::new();
            labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
            self.driver.create_namespace(name, labels).await?;
            tracing::info!(namespace = %name, workspace = %workspace_id, "created namespace");
        }

        if let Some(account) = &self.config.service_account {
            self.driver.ensure_service_account(name, account).await?;
            if let Some(role) = &self.config.cluster_role {
                self.driver.ensure_role_binding(name, account, role).await?;
            }
        }

        Ok(WorkspaceNamespace { name: name.to_string(), workspace_id: workspace_id.clone() })
    }

    /// Creation is allowed only when auto-creation is enabled and the name
    /// is either user-defined-permitted or the user's freshly-resolved
    /// default.
    async fn can_create(&self, name: &str, ctx: &ResolutionContext) -> Result<bool, RuntimeError> {
        if !self.config.auto_create {
            return Ok(false);
        }
        if self.config.allow_user_defined {
            return Ok(true);
        }
        Ok(name == self.resolver.resolve(ctx).await?)
    }

    /// Delete the namespace only when its name contains the workspace id,
    /// i.e. it was created exclusively for this workspace. Pre-existing or
    /// shared namespaces are never deleted.
    pub async fn delete_if_managed(
        &self,
        workspace_id: &WorkspaceId,
        namespace: &str,
    ) -> Result<(), RuntimeError> {
        if !namespace.contains(workspace_id.as_str()) {
            tracing::debug!(namespace, workspace = %workspace_id,
                "namespace not workspace-scoped, keeping it");
            return Ok(());
        }
        tracing::info!(namespace, workspace = %workspace_id, "deleting workspace namespace");
        self.driver.delete_namespace(namespace).await
    }
}

#[cfg(test)]
#[path = "provisioner_tests.rs"]
mod tests;
