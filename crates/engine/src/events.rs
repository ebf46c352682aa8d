// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event publication.
//!
//! The runtime pushes typed [`RuntimeEvent`]s into an mpsc sink owned by the
//! notification/transport layer. Publication is fire-and-forget: a closed
//! sink is logged and otherwise ignored so lifecycle progress never blocks
//! on a slow consumer.

use bv_core::{RuntimeEvent, RuntimeIdentity, ServerStatus};
use tokio::sync::mpsc;

/// Sends lifecycle events to the attached sink.
#[derive(Clone)]
pub struct EventPublisher {
    tx: Option<mpsc::UnboundedSender<RuntimeEvent>>,
}

impl EventPublisher {
    /// Publisher wired to an existing sink.
    pub fn attached(tx: mpsc::UnboundedSender<RuntimeEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Publisher that drops every event (tests, one-shot tooling).
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// New publisher plus the receiving half for the caller.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::attached(tx), rx)
    }

    pub fn send_machine_starting(&self, identity: &RuntimeIdentity, machine: &str) {
        self.send(RuntimeEvent::MachineStarting {
            identity: identity.clone(),
            machine: machine.to_string(),
        });
    }

    pub fn send_machine_running(&self, identity: &RuntimeIdentity, machine: &str) {
        self.send(RuntimeEvent::MachineRunning {
            identity: identity.clone(),
            machine: machine.to_string(),
        });
    }

    pub fn send_machine_failed(&self, identity: &RuntimeIdentity, machine: &str, error: &str) {
        self.send(RuntimeEvent::MachineFailed {
            identity: identity.clone(),
            machine: machine.to_string(),
            error: error.to_string(),
        });
    }

    pub fn send_server_status(
        &self,
        identity: &RuntimeIdentity,
        machine: &str,
        server: &str,
        status: ServerStatus,
        url: &str,
    ) {
        self.send(RuntimeEvent::ServerStatusChanged {
            identity: identity.clone(),
            machine: machine.to_string(),
            server: server.to_string(),
            status,
            url: url.to_string(),
        });
    }

    pub fn send_runtime_stopped(&self, identity: &RuntimeIdentity, reason: &str) {
        self.send(RuntimeEvent::RuntimeStopped {
            identity: identity.clone(),
            reason: reason.to_string(),
        });
    }

    fn send(&self, event: RuntimeEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::debug!("event sink closed, dropping runtime event");
            }
        }
    }
}
