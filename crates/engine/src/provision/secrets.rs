// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret provisioning.
//!
//! Machines request platform secrets through the `secrets` attribute (a
//! comma-separated list). The provisioner validates the names and moves
//! them into the typed `secrets` field consumed by object materialization
//! (exposed to the container as env-from references).

use super::Provisioner;
use crate::namespace::resolver::is_valid_label;
use async_trait::async_trait;
use bv_core::{Environment, RuntimeError, RuntimeIdentity};

/// Machine attribute listing requested secret names.
pub const SECRETS_ATTRIBUTE: &str = "secrets";

pub struct SecretsProvisioner;

#[async_trait]
impl Provisioner for SecretsProvisioner {
    fn name(&self) -> &'static str {
        "secrets"
    }

    async fn provision(
        &self,
        env: &mut Environment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), RuntimeError> {
        for (name, machine) in &mut env.machines {
            let Some(raw) = machine.attributes.shift_remove(SECRETS_ATTRIBUTE) else {
                continue;
            };
            for secret in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !is_valid_label(secret) {
                    return Err(RuntimeError::provisioning(format!(
                        "machine '{}' requests invalid secret name '{}'",
                        name, secret
                    )));
                }
                if !machine.secrets.iter().any(|s| s == secret) {
                    machine.secrets.push(secret.to_string());
                }
            }
        }
        Ok(())
    }
}
