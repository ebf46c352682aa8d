// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preview URL provisioning.
//!
//! Commands may reference an exposed server via the `previewServer`
//! attribute (`<machine>/<server>`); the resolved external URL is written
//! back as the `previewUrl` attribute so the IDE can link to it.

use super::objects::public_server_url;
use super::Provisioner;
use async_trait::async_trait;
use bv_core::{Environment, InfraConfig, RuntimeError, RuntimeIdentity};
use std::sync::Arc;

pub const PREVIEW_SERVER_ATTRIBUTE: &str = "previewServer";
pub const PREVIEW_URL_ATTRIBUTE: &str = "previewUrl";

pub struct PreviewUrlProvisioner {
    config: Arc<InfraConfig>,
}

impl PreviewUrlProvisioner {
    pub fn new(config: Arc<InfraConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Provisioner for PreviewUrlProvisioner {
    fn name(&self) -> &'static str {
        "preview-url"
    }

    async fn provision(
        &self,
        env: &mut Environment,
        identity: &RuntimeIdentity,
    ) -> Result<(), RuntimeError> {
        let machines = env.machines.clone();
        for command in &mut env.commands {
            let Some(reference) = command.attributes.get(PREVIEW_SERVER_ATTRIBUTE).cloned()
            else {
                continue;
            };
            let Some((machine_name, server_ref)) = reference.split_once('/') else {
                return Err(RuntimeError::provisioning(format!(
                    "command '{}' has malformed preview server reference '{}'",
                    command.name, reference
                )));
            };
            let server = machines
                .get(machine_name)
                .and_then(|m| m.servers.get(server_ref))
                .ok_or_else(|| {
                    RuntimeError::provisioning(format!(
                        "command '{}' references unknown server '{}'",
                        command.name, reference
                    ))
                })?;
            if !server.public {
                return Err(RuntimeError::provisioning(format!(
                    "command '{}' previews server '{}' which is not public",
                    command.name, reference
                )));
            }
            let url = public_server_url(identity, machine_name, server_ref, server, &self.config);
            command.attributes.insert(PREVIEW_URL_ATTRIBUTE.to_string(), url);
        }
        Ok(())
    }
}
