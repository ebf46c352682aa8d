// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative environment model.
//!
//! An [`Environment`] is the parsed form of a workspace recipe: named
//! machine configurations plus the raw recipe they came from. It is handed
//! to the runtime immutably per start attempt; the facade takes a defensive
//! copy before the provisioning chain mutates it.

use crate::error::RuntimeError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported recipe kinds.
///
/// Closed set — the environment factory for a start attempt is picked once
/// by matching on this enum, not by a string-keyed strategy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipeKind {
    KubernetesList,
    DockerImage,
    Compose,
}

impl RecipeKind {
    pub fn parse(kind: &str) -> Result<Self, RuntimeError> {
        match kind {
            "kubernetes-list" => Ok(RecipeKind::KubernetesList),
            "docker-image" => Ok(RecipeKind::DockerImage),
            "compose" => Ok(RecipeKind::Compose),
            other => {
                Err(RuntimeError::validation(format!("unsupported recipe kind '{}'", other)))
            }
        }
    }
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeKind::KubernetesList => write!(f, "kubernetes-list"),
            RecipeKind::DockerImage => write!(f, "docker-image"),
            RecipeKind::Compose => write!(f, "compose"),
        }
    }
}

/// Raw declarative environment definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub kind: RecipeKind,
    pub content: String,
}

/// An installer to run inside a machine once its container is up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installer {
    pub id: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl Installer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), version: None }
    }
}

/// Declared configuration of one exposed server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// "http", "ws", "tcp", ...
    pub protocol: String,
    #[serde(default)]
    pub path: String,
    /// Whether the server is exposed outside the cluster through an ingress.
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl ServerConfig {
    pub fn http(port: u16) -> Self {
        Self {
            port,
            protocol: "http".to_string(),
            path: String::new(),
            public: false,
            attributes: IndexMap::new(),
        }
    }

    pub fn exposed(mut self) -> Self {
        self.public = true;
        self
    }
}

/// A volume declared by a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub name: String,
    pub mount_path: String,
}

/// Declarative configuration of one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub image: String,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default)]
    pub installers: Vec<Installer>,
    #[serde(default)]
    pub servers: IndexMap<String, ServerConfig>,
    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,
    /// Names of platform secrets exposed to the container environment.
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,
    /// Machines that must be started before this one.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl MachineConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            env: IndexMap::new(),
            installers: Vec::new(),
            servers: IndexMap::new(),
            volumes: Vec::new(),
            secrets: Vec::new(),
            memory_limit_mb: None,
            depends_on: Vec::new(),
            attributes: IndexMap::new(),
        }
    }
}

/// A command the IDE can run inside the workspace, carried through
/// provisioning so preview URLs can be attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub exec: String,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

/// Declarative graph of machines plus the raw recipe it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub recipe: Recipe,
    #[serde(default)]
    pub machines: IndexMap<String, MachineConfig>,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl Environment {
    pub fn new(recipe: Recipe) -> Self {
        Self {
            recipe,
            machines: IndexMap::new(),
            commands: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with_machine(mut self, name: impl Into<String>, config: MachineConfig) -> Self {
        self.machines.insert(name.into(), config);
        self
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
