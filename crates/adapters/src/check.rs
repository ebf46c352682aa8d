// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server availability checks.
//!
//! One round-trip against a server URL; the engine layers retry loops
//! (readiness) and recurring schedules (liveness) on top.

use async_trait::async_trait;
use std::time::Duration;

/// One availability round-trip against a server URL.
#[async_trait]
pub trait ServerChecker: Send + Sync + 'static {
    async fn available(&self, url: &str) -> bool;
}

/// Checks HTTP-ish servers with a raw GET; opaque protocols fall back to a
/// TCP connect.
pub struct HttpServerChecker {
    timeout: Duration,
}

impl HttpServerChecker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ServerChecker for HttpServerChecker {
    async fn available(&self, url: &str) -> bool {
        let Some(target) = ProbeTarget::parse(url) else {
            tracing::debug!(url, "unparseable server URL, probe fails");
            return false;
        };
        let addr = format!("{}:{}", target.host, target.port);
        match target.scheme.as_str() {
            // Anything under 500 proves the server is answering; auth
            // challenges and redirects count as alive.
            "http" | "ws" => {
                match crate::http::get_status(&addr, &target.host, &target.path, self.timeout)
                    .await
                {
                    Ok(code) => code < 500,
                    Err(e) => {
                        tracing::debug!(url, error = %e, "HTTP probe failed");
                        false
                    }
                }
            }
            // TLS endpoints and raw TCP servers: reachability only.
            _ => crate::http::connect(&addr, self.timeout).await.is_ok(),
        }
    }
}

struct ProbeTarget {
    scheme: String,
    host: String,
    port: u16,
    path: String,
}

impl ProbeTarget {
    /// Parse "scheme://host[:port][/path]" without a URL crate; probes only
    /// ever see URLs the runtime itself resolved.
    fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.split_once("://")?;
        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, format!("/{}", path)),
            None => (rest, String::new()),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().ok()?),
            None => (
                authority,
                match scheme {
                    "https" | "wss" => 443,
                    _ => 80,
                },
            ),
        };
        if host.is_empty() {
            return None;
        }
        Some(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            path,
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeServerChecker;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Fake checker with per-URL programmable availability.
    #[derive(Clone)]
    pub struct FakeServerChecker {
        available: Arc<Mutex<HashMap<String, bool>>>,
        default_available: bool,
    }

    impl FakeServerChecker {
        /// All URLs available unless overridden.
        pub fn all_available() -> Self {
            Self { available: Arc::new(Mutex::new(HashMap::new())), default_available: true }
        }

        /// All URLs unavailable unless overridden.
        pub fn all_unavailable() -> Self {
            Self { available: Arc::new(Mutex::new(HashMap::new())), default_available: false }
        }

        pub fn set_available(&self, url: &str, available: bool) {
            self.available.lock().insert(url.to_string(), available);
        }
    }

    #[async_trait]
    impl ServerChecker for FakeServerChecker {
        async fn available(&self, url: &str) -> bool {
            self.available.lock().get(url).copied().unwrap_or(self.default_available)
        }
    }
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
