// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Infrastructure configuration.
//!
//! Loaded once from a TOML file (or built programmatically in tests) and
//! shared read-only across the runtime. Every section has defaults so a
//! minimal config only needs the namespace template and ingress domain.

use crate::error::RuntimeError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Namespace resolution and provisioning settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Template for the default namespace, with `<userid>`, `<username>`
    /// and `<workspaceid>` placeholders.
    pub default_template: String,
    /// Template used by workspaces created before namespaces were recorded.
    pub legacy_template: Option<String>,
    /// Whether users may supply their own namespace names.
    pub allow_user_defined: bool,
    /// Whether absent namespaces may be created on demand.
    pub auto_create: bool,
    /// Service account prepared in created namespaces, when set.
    pub service_account: Option<String>,
    /// Cluster role bound to the workspace service account, when set.
    pub cluster_role: Option<String>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            default_template: "bv-<username>".to_string(),
            legacy_template: None,
            allow_user_defined: false,
            auto_create: true,
            service_account: None,
            cluster_role: None,
        }
    }
}

/// Wall-clock bounds for the start protocol.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on the whole multi-container start, in minutes.
    pub workspace_start_min: u64,
    /// Bound on each ingress receiving an address, in minutes.
    pub ingress_start_min: u64,
    /// Deadline for one server's readiness check, in seconds.
    pub server_check_sec: u64,
    /// Poll interval between readiness attempts, in seconds.
    pub server_check_interval_sec: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            workspace_start_min: 8,
            ingress_start_min: 5,
            server_check_sec: 180,
            server_check_interval_sec: 2,
        }
    }
}

/// Liveness probing cadence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub interval_sec: u64,
    pub timeout_sec: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { interval_sec: 10, timeout_sec: 3 }
    }
}

/// How persistent storage is allocated for workspace volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeStrategy {
    /// One PVC per workspace; volumes map to sub-paths within it.
    PerWorkspace,
    /// No persistent claims; volumes are backed by emptyDir.
    Ephemeral,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolumesConfig {
    pub strategy: VolumeStrategy,
    pub claim_size_gib: u64,
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self { strategy: VolumeStrategy::PerWorkspace, claim_size_gib: 5 }
    }
}

/// TLS settings for exposed servers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    /// Name of the TLS secret referenced by generated ingresses.
    pub secret: Option<String>,
}

/// Top-level infrastructure configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InfraConfig {
    pub namespace: NamespaceConfig,
    pub timeouts: TimeoutConfig,
    pub probes: ProbeConfig,
    pub volumes: VolumesConfig,
    pub tls: TlsConfig,
    /// Base domain for public server hosts, e.g. "ws.example.org".
    pub ingress_domain: String,
}

impl InfraConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::validation(format!("cannot read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw).map_err(|e| {
            RuntimeError::validation(format!("cannot parse config {}: {}", path.display(), e))
        })
    }

    pub fn workspace_start_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.workspace_start_min * 60)
    }

    pub fn ingress_start_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.ingress_start_min * 60)
    }

    pub fn server_check_deadline(&self) -> Duration {
        Duration::from_secs(self.timeouts.server_check_sec)
    }

    pub fn server_check_interval(&self) -> Duration {
        Duration::from_secs(self.timeouts.server_check_interval_sec)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probes.interval_sec)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probes.timeout_sec)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
