// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TLS provisioning.
//!
//! When TLS is enabled, every publicly exposed server is reachable through
//! a TLS-terminating ingress, so its declared protocol is upgraded
//! (http → https, ws → wss) before URLs are resolved.

use super::Provisioner;
use async_trait::async_trait;
use bv_core::{Environment, InfraConfig, RuntimeError, RuntimeIdentity};
use std::sync::Arc;

pub struct TlsProvisioner {
    config: Arc<InfraConfig>,
}

impl TlsProvisioner {
    pub fn new(config: Arc<InfraConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Provisioner for TlsProvisioner {
    fn name(&self) -> &'static str {
        "tls"
    }

    async fn provision(
        &self,
        env: &mut Environment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), RuntimeError> {
        if !self.config.tls.enabled {
            return Ok(());
        }
        for machine in env.machines.values_mut() {
            for server in machine.servers.values_mut() {
                if !server.public {
                    continue;
                }
                server.protocol = match server.protocol.as_str() {
                    "http" => "https".to_string(),
                    "ws" => "wss".to_string(),
                    other => other.to_string(),
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tests;
