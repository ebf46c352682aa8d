// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sidecar tooling injection.
//!
//! A machine asking for editor/plugin tooling (the `tooling.image`
//! attribute) gets a sidecar machine injected next to it, sharing its
//! volumes so the tooling sees the same project files.

use super::Provisioner;
use async_trait::async_trait;
use bv_core::{Environment, MachineConfig, RuntimeError, RuntimeIdentity};

pub const TOOLING_IMAGE_ATTRIBUTE: &str = "tooling.image";

/// Attribute marking injected machines, so other provisioners can tell
/// them apart from user-declared ones.
pub const INJECTED_ATTRIBUTE: &str = "injected";

pub struct ToolingProvisioner;

#[async_trait]
impl Provisioner for ToolingProvisioner {
    fn name(&self) -> &'static str {
        "tooling"
    }

    async fn provision(
        &self,
        env: &mut Environment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), RuntimeError> {
        let mut sidecars = Vec::new();
        for (name, machine) in &mut env.machines {
            let Some(image) = machine.attributes.shift_remove(TOOLING_IMAGE_ATTRIBUTE) else {
                continue;
            };
            let sidecar_name = format!("{}-tooling", name);
            let mut sidecar = MachineConfig::new(image);
            sidecar.volumes = machine.volumes.clone();
            sidecar
                .attributes
                .insert(INJECTED_ATTRIBUTE.to_string(), "true".to_string());
            // sidecar shares the pod of the machine it serves
            if let Some(pod) = machine.attributes.get("pod") {
                sidecar.attributes.insert("pod".to_string(), pod.clone());
            }
            sidecars.push((sidecar_name, sidecar));
        }
        for (name, sidecar) in sidecars {
            if env.machines.contains_key(&name) {
                return Err(RuntimeError::provisioning(format!(
                    "tooling sidecar name '{}' collides with a declared machine",
                    name
                )));
            }
            env.machines.insert(name, sidecar);
        }
        Ok(())
    }
}
