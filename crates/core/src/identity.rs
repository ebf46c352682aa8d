// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime identity — the primary key of a workspace runtime.
//!
//! A `RuntimeIdentity` names one start attempt of one workspace environment:
//! which workspace, which environment within it, who owns it, and which
//! isolated namespace hosts its platform objects. The namespace is `None`
//! until resolution; every component downstream of `prepare` requires it.

use crate::error::RuntimeError;
use serde::{Deserialize, Serialize};

crate::define_str_id! {
    /// Unique identifier of a workspace, assigned by the calling layer.
    pub struct WorkspaceId;
}

crate::define_str_id! {
    /// Unique identifier of the user owning a workspace.
    pub struct OwnerId;
}

/// Identity of a single workspace runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeIdentity {
    pub workspace_id: WorkspaceId,
    /// Name of the environment within the workspace definition.
    pub env_name: String,
    pub owner_id: OwnerId,
    /// Resolved infrastructure namespace. `None` until `prepare` ran.
    pub namespace: Option<String>,
}

impl RuntimeIdentity {
    pub fn new(
        workspace_id: impl Into<WorkspaceId>,
        env_name: impl Into<String>,
        owner_id: impl Into<OwnerId>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            env_name: env_name.into(),
            owner_id: owner_id.into(),
            namespace: None,
        }
    }

    /// Same identity with the infrastructure namespace filled in.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The resolved namespace, or a validation error when `prepare` was
    /// skipped.
    pub fn namespace(&self) -> Result<&str, RuntimeError> {
        self.namespace.as_deref().ok_or_else(|| {
            RuntimeError::validation(format!(
                "workspace '{}' has no resolved infrastructure namespace",
                self.workspace_id
            ))
        })
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
