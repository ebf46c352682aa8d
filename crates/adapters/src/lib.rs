// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bv-adapters: injected capabilities of the workspace runtime.
//!
//! The platform driver (Kubernetes object CRUD and waits), the installer
//! bootstrapper contract, and the low-level server prober. The engine only
//! sees the traits; the `kube`-backed implementations live here, and fakes
//! for deterministic tests are exported behind the `test-support` feature.

pub mod bootstrap;
pub mod check;
pub mod http;
pub mod platform;

pub use bootstrap::{Bootstrapper, NoopBootstrapper};
pub use check::{HttpServerChecker, ServerChecker};
pub use platform::{
    ingress_has_address, pod_phase, pod_settled, KubeDriver, PlatformDriver, LABEL_MANAGED_BY,
    LABEL_WORKSPACE_ID,
};

#[cfg(any(test, feature = "test-support"))]
pub use bootstrap::FakeBootstrapper;
#[cfg(any(test, feature = "test-support"))]
pub use check::FakeServerChecker;
#[cfg(any(test, feature = "test-support"))]
pub use platform::{DriverCall, FakeDriver};
