// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Volume provisioning.
//!
//! Every machine gets the shared `projects` volume at `/projects` unless it
//! declares one itself; declared volumes are validated. The claim backing
//! them (per-workspace strategy) is created later by the orchestrator,
//! before any other object is submitted.

use super::Provisioner;
use crate::namespace::resolver::is_valid_label;
use async_trait::async_trait;
use bv_core::{Environment, InfraConfig, RuntimeError, RuntimeIdentity, VolumeConfig};
use std::sync::Arc;

/// Mount path of the implicit shared volume.
pub const PROJECTS_MOUNT_PATH: &str = "/projects";
/// Name of the implicit shared volume.
pub const PROJECTS_VOLUME: &str = "projects";

pub struct VolumesProvisioner {
    _config: Arc<InfraConfig>,
}

impl VolumesProvisioner {
    pub fn new(config: Arc<InfraConfig>) -> Self {
        Self { _config: config }
    }
}

#[async_trait]
impl Provisioner for VolumesProvisioner {
    fn name(&self) -> &'static str {
        "volumes"
    }

    async fn provision(
        &self,
        env: &mut Environment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), RuntimeError> {
        for (name, machine) in &mut env.machines {
            for volume in &machine.volumes {
                if !is_valid_label(&volume.name) {
                    return Err(RuntimeError::provisioning(format!(
                        "machine '{}' declares invalid volume name '{}'",
                        name, volume.name
                    )));
                }
                if volume.mount_path.is_empty() {
                    return Err(RuntimeError::provisioning(format!(
                        "machine '{}' volume '{}' has no mount path",
                        name, volume.name
                    )));
                }
            }
            if !machine.volumes.iter().any(|v| v.name == PROJECTS_VOLUME) {
                machine.volumes.push(VolumeConfig {
                    name: PROJECTS_VOLUME.to_string(),
                    mount_path: PROJECTS_MOUNT_PATH.to_string(),
                });
            }
        }
        Ok(())
    }
}
