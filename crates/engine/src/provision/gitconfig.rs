// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git identity provisioning.
//!
//! Propagates the user's recorded git identity (preference keys
//! `git.username` / `git.email`) into every machine's environment, so
//! commits made inside the workspace are attributed correctly.

use super::Provisioner;
use async_trait::async_trait;
use bv_core::{Environment, RuntimeError, RuntimeIdentity};
use bv_storage::PreferenceStore;
use std::sync::Arc;

pub const PREF_GIT_USERNAME: &str = "git.username";
pub const PREF_GIT_EMAIL: &str = "git.email";

pub struct GitConfigProvisioner {
    prefs: Arc<dyn PreferenceStore>,
}

impl GitConfigProvisioner {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }
}

#[async_trait]
impl Provisioner for GitConfigProvisioner {
    fn name(&self) -> &'static str {
        "git-config"
    }

    async fn provision(
        &self,
        env: &mut Environment,
        identity: &RuntimeIdentity,
    ) -> Result<(), RuntimeError> {
        let prefs = self.prefs.find(&identity.owner_id).await?;
        let username = prefs.get(PREF_GIT_USERNAME);
        let email = prefs.get(PREF_GIT_EMAIL);
        if username.is_none() && email.is_none() {
            return Ok(());
        }

        for machine in env.machines.values_mut() {
            if let Some(username) = username {
                machine
                    .env
                    .entry("GIT_AUTHOR_NAME".to_string())
                    .or_insert_with(|| username.clone());
                machine
                    .env
                    .entry("GIT_COMMITTER_NAME".to_string())
                    .or_insert_with(|| username.clone());
            }
            if let Some(email) = email {
                machine
                    .env
                    .entry("GIT_AUTHOR_EMAIL".to_string())
                    .or_insert_with(|| email.clone());
                machine
                    .env
                    .entry("GIT_COMMITTER_EMAIL".to_string())
                    .or_insert_with(|| email.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "gitconfig_tests.rs"]
mod tests;
