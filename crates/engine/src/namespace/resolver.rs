// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace name resolution.
//!
//! Deterministically computes the isolated namespace for a workspace from
//! the configured template, consulting and updating the per-user preference
//! store. Templates without `<workspaceid>` yield one shared namespace per
//! user (cacheable); templates with it yield one namespace per workspace
//! (never cached).

use super::NamespaceMeta;
use bv_adapters::PlatformDriver;
use bv_core::{OwnerId, RuntimeError, WorkspaceId};
use bv_storage::PreferenceStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Preference key recording the user's resolved namespace name.
pub const PREF_NAMESPACE: &str = "infra.namespace.name";
/// Preference key recording the template the name was resolved from.
pub const PREF_NAMESPACE_TEMPLATE: &str = "infra.namespace.template";

const PLACEHOLDER_USER_ID: &str = "<userid>";
const PLACEHOLDER_USER_NAME: &str = "<username>";
const PLACEHOLDER_WORKSPACE_ID: &str = "<workspaceid>";

/// Kubernetes object names are DNS labels: 63 chars max.
const MAX_LABEL_LEN: usize = 63;

/// Bound on random-suffix retries when a normalized name collides.
const MAX_SUFFIX_ATTEMPTS: usize = 10;
const SUFFIX_LEN: usize = 5;
const SUFFIX_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Who is resolving: the calling user plus the workspace being started.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub workspace_id: WorkspaceId,
    pub user_id: OwnerId,
    pub user_name: String,
}

impl ResolutionContext {
    pub fn new(
        workspace_id: impl Into<WorkspaceId>,
        user_id: impl Into<OwnerId>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}

/// Computes (and records) the namespace name for a workspace.
pub struct NamespaceResolver {
    config: bv_core::NamespaceConfig,
    driver: Arc<dyn PlatformDriver>,
    prefs: Arc<dyn PreferenceStore>,
}

impl NamespaceResolver {
    pub fn new(
        config: bv_core::NamespaceConfig,
        driver: Arc<dyn PlatformDriver>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self { config, driver, prefs }
    }

    /// Resolve the namespace name for the given context.
    ///
    /// Order: legacy template (used only when that namespace already
    /// exists), recorded preference (only while the configured template is
    /// unchanged and not workspace-scoped), then fresh evaluation with
    /// normalization and collision disambiguation.
    pub async fn resolve(&self, ctx: &ResolutionContext) -> Result<String, RuntimeError> {
        if let Some(legacy) = &self.config.legacy_template {
            let name = eval_placeholders(legacy, ctx);
            if is_valid_label(&name) && self.driver.get_namespace(&name).await?.is_some() {
                tracing::debug!(namespace = %name, workspace = %ctx.workspace_id,
                    "using legacy namespace");
                return Ok(name);
            }
        }

        let template = self.config.default_template.clone();
        let workspace_scoped = template.contains(PLACEHOLDER_WORKSPACE_ID);

        if !workspace_scoped {
            let prefs = self.prefs.find(&ctx.user_id).await?;
            if let (Some(recorded), Some(recorded_template)) =
                (prefs.get(PREF_NAMESPACE), prefs.get(PREF_NAMESPACE_TEMPLATE))
            {
                if *recorded_template == template {
                    return Ok(recorded.clone());
                }
                tracing::debug!(user = %ctx.user_id,
                    "namespace template changed, discarding recorded name");
            }
        }

        let evaluated = eval_placeholders(&template, ctx);
        let name = if is_valid_label(&evaluated) {
            evaluated
        } else {
            let normalized = normalize_label(&evaluated);
            if normalized.is_empty() {
                return Err(RuntimeError::validation(format!(
                    "namespace template '{}' evaluates to an empty name",
                    template
                )));
            }
            self.disambiguate(&normalized).await?
        };

        if !workspace_scoped {
            let mut entries = HashMap::new();
            entries.insert(PREF_NAMESPACE.to_string(), name.clone());
            entries.insert(PREF_NAMESPACE_TEMPLATE.to_string(), template);
            self.prefs.update(&ctx.user_id, entries).await?;
        }

        tracing::debug!(namespace = %name, workspace = %ctx.workspace_id, "resolved namespace");
        Ok(name)
    }

    /// Reject a user-supplied namespace name unless it matches the computed
    /// default (or user-defined namespaces are enabled).
    pub async fn check_allowed(
        &self,
        requested: &str,
        ctx: &ResolutionContext,
    ) -> Result<(), RuntimeError> {
        if self.config.allow_user_defined {
            return Ok(());
        }
        let default_name = self.evaluate_default(ctx);
        if requested == default_name {
            Ok(())
        } else {
            Err(RuntimeError::validation(format!(
                "user-defined namespaces are not allowed; only '{}' may be used",
                default_name
            )))
        }
    }

    /// Namespaces the user can run workspaces in: the configured default,
    /// plus everything visible on the cluster when user-defined namespaces
    /// are enabled.
    pub async fn list(&self, ctx: &ResolutionContext) -> Result<Vec<NamespaceMeta>, RuntimeError> {
        let default_name = self.evaluate_default(ctx);
        let mut metas = Vec::new();

        if self.config.allow_user_defined {
            for ns in self.driver.list_namespaces().await? {
                let name = ns.metadata.name.clone().unwrap_or_default();
                metas.push(NamespaceMeta {
                    default: name == default_name,
                    phase: ns.status.as_ref().and_then(|s| s.phase.clone()),
                    name,
                });
            }
        }

        if !metas.iter().any(|m| m.name == default_name) {
            let phase = self
                .driver
                .get_namespace(&default_name)
                .await?
                .and_then(|ns| ns.status.and_then(|s| s.phase));
            metas.push(NamespaceMeta { name: default_name, phase, default: true });
        }
        Ok(metas)
    }

    /// Template evaluation without caching, normalization or recording.
    pub fn evaluate_default(&self, ctx: &ResolutionContext) -> String {
        eval_placeholders(&self.config.default_template, ctx)
    }

    /// Append random suffixes until no existing namespace collides,
    /// bounded so adversarial collisions cannot loop forever.
    async fn disambiguate(&self, base: &str) -> Result<String, RuntimeError> {
        if self.driver.get_namespace(base).await?.is_none() {
            return Ok(base.to_string());
        }
        for _ in 0..MAX_SUFFIX_ATTEMPTS {
            let candidate = with_suffix(base);
            if self.driver.get_namespace(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(RuntimeError::infrastructure(format!(
            "could not find a free namespace name for '{}' after {} attempts",
            base, MAX_SUFFIX_ATTEMPTS
        )))
    }
}

fn eval_placeholders(template: &str, ctx: &ResolutionContext) -> String {
    template
        .replace(PLACEHOLDER_USER_ID, ctx.user_id.as_str())
        .replace(PLACEHOLDER_USER_NAME, &ctx.user_name)
        .replace(PLACEHOLDER_WORKSPACE_ID, ctx.workspace_id.as_str())
}

/// DNS label: ≤63 chars of `[a-z0-9-]`, starting and ending alphanumeric.
pub fn is_valid_label(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_LABEL_LEN {
        return false;
    }
    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    alnum(bytes[0])
        && alnum(bytes[bytes.len() - 1])
        && bytes.iter().all(|&b| alnum(b) || b == b'-')
}

/// Force a name into DNS-label shape: lowercase, invalid characters to
/// `-`, repeated dashes collapsed, dashes trimmed, truncated to 63.
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.len() > MAX_LABEL_LEN {
        out.truncate(MAX_LABEL_LEN);
        while out.ends_with('-') {
            out.pop();
        }
    }
    out
}

/// `base-xxxxx`, truncating `base` so the result stays a valid label.
fn with_suffix(base: &str) -> String {
    let max_base = MAX_LABEL_LEN - SUFFIX_LEN - 1;
    let mut base = &base[..base.len().min(max_base)];
    while base.ends_with('-') {
        base = &base[..base.len() - 1];
    }
    format!("{}-{}", base, nanoid::nanoid!(SUFFIX_LEN, &SUFFIX_ALPHABET))
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
