// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bv-storage: durable state for the workspace runtime.
//!
//! Three logical tables survive process restart: runtime states keyed by
//! workspace id, machines keyed by (workspace id, machine name), and
//! per-user preferences keyed by owner id. All mutations are single
//! atomic key-scoped operations — status replacement is compare-and-set,
//! never read-then-separately-write — because probe callbacks, readiness
//! checks and the orchestrator race to update the same rows.

pub mod file;
pub mod runtime_state;
pub mod store;

pub use file::FileStore;
pub use runtime_state::RuntimeState;
pub use store::{MachineStore, PreferenceStore, RuntimeStateStore};
