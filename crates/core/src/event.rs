// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime lifecycle events.
//!
//! The runtime publishes these into an injected sink (an mpsc channel owned
//! by the notification/transport layer, which is out of scope here). Events
//! for one machine are emitted in pipeline order; interleaving across
//! machines is unordered.

use crate::identity::RuntimeIdentity;
use crate::server::ServerStatus;
use serde::{Deserialize, Serialize};

/// A typed lifecycle event published by the workspace runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    MachineStarting {
        identity: RuntimeIdentity,
        machine: String,
    },
    MachineRunning {
        identity: RuntimeIdentity,
        machine: String,
    },
    MachineFailed {
        identity: RuntimeIdentity,
        machine: String,
        error: String,
    },
    /// A server's observed status changed (readiness or liveness signal).
    ServerStatusChanged {
        identity: RuntimeIdentity,
        machine: String,
        server: String,
        status: ServerStatus,
        url: String,
    },
    RuntimeStopped {
        identity: RuntimeIdentity,
        reason: String,
    },
}

impl RuntimeEvent {
    pub fn identity(&self) -> &RuntimeIdentity {
        match self {
            RuntimeEvent::MachineStarting { identity, .. }
            | RuntimeEvent::MachineRunning { identity, .. }
            | RuntimeEvent::MachineFailed { identity, .. }
            | RuntimeEvent::ServerStatusChanged { identity, .. }
            | RuntimeEvent::RuntimeStopped { identity, .. } => identity,
        }
    }
}
