// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment provisioning pipeline.
//!
//! A linear chain of provisioners, each mutating the in-memory environment
//! before any platform object is submitted: volumes → secrets → TLS →
//! preview URLs → sidecar tooling → git config. A failing provisioner
//! aborts the rest of the chain; partial mutation of the copy is fine since
//! nothing has reached the platform yet.
//!
//! The container start order is computed from the declared `depends_on`
//! links *before* the chain runs, so no provisioner can erase the link
//! metadata it needs.

pub mod gitconfig;
pub mod objects;
pub mod order;
pub mod preview;
pub mod secrets;
pub mod tls;
pub mod tooling;
pub mod volumes;

pub use objects::{MachinePlacement, ObjectsPlan};

use async_trait::async_trait;
use bv_core::{Environment, InfraConfig, RuntimeError, RuntimeIdentity};
use bv_storage::PreferenceStore;
use std::sync::Arc;

/// One step of the provisioning chain.
#[async_trait]
pub trait Provisioner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Mutate the environment in place. No platform objects may be
    /// created here; platform I/O is limited to lookups.
    async fn provision(
        &self,
        env: &mut Environment,
        identity: &RuntimeIdentity,
    ) -> Result<(), RuntimeError>;
}

/// The fixed, ordered provisioner chain.
pub struct ProvisioningPipeline {
    provisioners: Vec<Box<dyn Provisioner>>,
}

impl ProvisioningPipeline {
    /// The standard chain in its documented order.
    pub fn standard(config: Arc<InfraConfig>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            provisioners: vec![
                Box::new(volumes::VolumesProvisioner::new(config.clone())),
                Box::new(secrets::SecretsProvisioner),
                Box::new(tls::TlsProvisioner::new(config.clone())),
                Box::new(preview::PreviewUrlProvisioner::new(config)),
                Box::new(tooling::ToolingProvisioner),
                Box::new(gitconfig::GitConfigProvisioner::new(prefs)),
            ],
        }
    }

    /// A pipeline with an explicit chain (tests, special deployments).
    pub fn with_provisioners(provisioners: Vec<Box<dyn Provisioner>>) -> Self {
        Self { provisioners }
    }

    /// Resolve the start order, then run the chain. Returns the machine
    /// start order.
    pub async fn apply(
        &self,
        env: &mut Environment,
        identity: &RuntimeIdentity,
    ) -> Result<Vec<String>, RuntimeError> {
        let start_order = order::resolve_start_order(env)?;

        for provisioner in &self.provisioners {
            tracing::debug!(provisioner = provisioner.name(),
                workspace = %identity.workspace_id, "applying provisioner");
            provisioner.provision(env, identity).await.map_err(|err| match err {
                RuntimeError::Provisioning(_) | RuntimeError::Validation(_) => err,
                other => RuntimeError::provisioning(format!(
                    "{} provisioner failed: {}",
                    provisioner.name(),
                    other
                )),
            })?;
        }

        Ok(start_order)
    }
}
