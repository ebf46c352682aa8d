// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy of the workspace runtime.
//!
//! The variants carry distinct recovery semantics:
//!
//! - [`RuntimeError::Validation`] — bad input; surfaced immediately, never
//!   retried, nothing to clean up.
//! - [`RuntimeError::Provisioning`] — a provisioner aborted the chain before
//!   any platform object was submitted; only the in-memory environment is
//!   discarded.
//! - [`RuntimeError::Conflict`] — the state machine rejected the transition
//!   (runtime already exists, stop of a non-running workspace); no resources
//!   were allocated, so no cleanup runs.
//! - [`RuntimeError::Infrastructure`] — a platform call failed or timed out
//!   after objects may have been created; triggers cleanup-then-surface.
//! - [`RuntimeError::Interrupted`] — the caller cancelled the operation;
//!   resources are cleaned up and the cancellation propagates as such.

use thiserror::Error;

/// Errors surfaced by the workspace runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("provisioning failed: {0}")]
    Provisioning(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    #[error("operation was interrupted")]
    Interrupted,
}

impl RuntimeError {
    pub fn validation(message: impl Into<String>) -> Self {
        RuntimeError::Validation(message.into())
    }

    pub fn provisioning(message: impl Into<String>) -> Self {
        RuntimeError::Provisioning(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        RuntimeError::Conflict(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        RuntimeError::Infrastructure(message.into())
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, RuntimeError::Infrastructure(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RuntimeError::Interrupted)
    }
}
