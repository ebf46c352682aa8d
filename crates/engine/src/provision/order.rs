// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container start order.
//!
//! Topological sort over the declared `depends_on` links. Deterministic:
//! ties break on declaration order, so the same environment always yields
//! the same order.

use bv_core::{Environment, RuntimeError};
use std::collections::HashMap;

/// Compute the machine start order, honoring dependency links.
pub fn resolve_start_order(env: &Environment) -> Result<Vec<String>, RuntimeError> {
    let names: Vec<&String> = env.machines.keys().collect();
    let mut remaining_deps: HashMap<&str, Vec<&str>> = HashMap::new();

    for (name, machine) in &env.machines {
        for dep in &machine.depends_on {
            if !env.machines.contains_key(dep) {
                return Err(RuntimeError::validation(format!(
                    "machine '{}' depends on unknown machine '{}'",
                    name, dep
                )));
            }
        }
        remaining_deps
            .insert(name.as_str(), machine.depends_on.iter().map(String::as_str).collect());
    }

    let mut order = Vec::with_capacity(names.len());
    let mut placed: Vec<&str> = Vec::new();

    while order.len() < names.len() {
        let mut progressed = false;
        for name in &names {
            if placed.contains(&name.as_str()) {
                continue;
            }
            let ready = remaining_deps[name.as_str()]
                .iter()
                .all(|dep| placed.contains(dep));
            if ready {
                placed.push(name.as_str());
                order.push((*name).clone());
                progressed = true;
            }
        }
        if !progressed {
            let stuck: Vec<&str> = names
                .iter()
                .map(|n| n.as_str())
                .filter(|n| !placed.contains(n))
                .collect();
            return Err(RuntimeError::validation(format!(
                "cyclic dependency between machines: {}",
                stuck.join(", ")
            )));
        }
    }

    Ok(order)
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
