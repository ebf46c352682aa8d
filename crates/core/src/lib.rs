// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bv-core: Core types for the bivouac workspace runtime.
//!
//! Identities, lifecycle statuses, the declarative environment model,
//! runtime events, the error taxonomy and infrastructure configuration.
//! No I/O lives here; the platform driver and stores consume these types.

pub mod macros;

pub mod config;
pub mod environment;
pub mod error;
pub mod event;
pub mod identity;
pub mod machine;
pub mod server;
pub mod status;

pub use config::{
    InfraConfig, NamespaceConfig, ProbeConfig, TimeoutConfig, TlsConfig, VolumeStrategy,
    VolumesConfig,
};
pub use environment::{
    Command, Environment, Installer, MachineConfig, Recipe, RecipeKind, ServerConfig, VolumeConfig,
};
pub use error::RuntimeError;
pub use event::RuntimeEvent;
pub use identity::{OwnerId, RuntimeIdentity, WorkspaceId};
pub use machine::{Machine, MachineKey, MachineStatus};
pub use server::{Server, ServerStatus};
pub use status::WorkspaceStatus;
