// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installer bootstrapper contract.
//!
//! Machines may declare installers that must run inside the container once
//! it is up, before the machine counts as ready. The broker that actually
//! executes them is an external collaborator; the runtime only needs an
//! awaitable, cancellable start/stop contract. Cancellation is by dropping
//! the future — implementations must not leave work running after drop.

use async_trait::async_trait;
use bv_core::{Installer, RuntimeError, RuntimeIdentity};

/// Runs a machine's installers to completion.
#[async_trait]
pub trait Bootstrapper: Send + Sync + 'static {
    async fn bootstrap(
        &self,
        identity: &RuntimeIdentity,
        machine: &str,
        installers: &[Installer],
    ) -> Result<(), RuntimeError>;
}

/// Bootstrapper for deployments without an installer broker.
pub struct NoopBootstrapper;

#[async_trait]
impl Bootstrapper for NoopBootstrapper {
    async fn bootstrap(
        &self,
        _identity: &RuntimeIdentity,
        machine: &str,
        installers: &[Installer],
    ) -> Result<(), RuntimeError> {
        if !installers.is_empty() {
            tracing::warn!(machine, count = installers.len(),
                "no installer broker configured; skipping installers");
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBootstrapper;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeBootstrapState {
        invocations: Vec<String>,
        delay: Option<Duration>,
        failures: HashMap<String, String>,
    }

    /// Fake bootstrapper recording which machines were bootstrapped.
    #[derive(Clone, Default)]
    pub struct FakeBootstrapper {
        state: Arc<Mutex<FakeBootstrapState>>,
    }

    impl FakeBootstrapper {
        pub fn new() -> Self {
            Self::default()
        }

        /// Machine names whose bootstrap was invoked, in invocation order.
        pub fn invocations(&self) -> Vec<String> {
            self.state.lock().invocations.clone()
        }

        /// Delay every bootstrap by `delay` (to hold pipelines in-flight).
        pub fn set_delay(&self, delay: Duration) {
            self.state.lock().delay = Some(delay);
        }

        /// Fail bootstrap for `machine` with `message`.
        pub fn fail_machine(&self, machine: &str, message: &str) {
            self.state.lock().failures.insert(machine.to_string(), message.to_string());
        }
    }

    #[async_trait]
    impl Bootstrapper for FakeBootstrapper {
        async fn bootstrap(
            &self,
            _identity: &RuntimeIdentity,
            machine: &str,
            _installers: &[Installer],
        ) -> Result<(), RuntimeError> {
            let (delay, failure) = {
                let mut state = self.state.lock();
                state.invocations.push(machine.to_string());
                (state.delay, state.failures.get(machine).cloned())
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(message) => Err(RuntimeError::infrastructure(message)),
                None => Ok(()),
            }
        }
    }
}
