// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bv_core::{Environment, MachineConfig, Recipe, RecipeKind, RuntimeError};

fn env_with(machines: Vec<(&str, Vec<&str>)>) -> Environment {
    let mut env = Environment::new(Recipe {
        kind: RecipeKind::Compose,
        content: String::new(),
    });
    for (name, deps) in machines {
        let mut config = MachineConfig::new("img");
        config.depends_on = deps.into_iter().map(String::from).collect();
        env.machines.insert(name.to_string(), config);
    }
    env
}

#[test]
fn independent_machines_keep_declaration_order() {
    let env = env_with(vec![("a", vec![]), ("b", vec![]), ("c", vec![])]);
    assert_eq!(resolve_start_order(&env).unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn dependencies_start_first() {
    let env = env_with(vec![("ide", vec!["db"]), ("db", vec![]), ("cache", vec!["db"])]);
    let order = resolve_start_order(&env).unwrap();
    assert_eq!(order, vec!["db", "ide", "cache"]);
}

#[test]
fn chains_resolve_transitively() {
    let env = env_with(vec![("c", vec!["b"]), ("b", vec!["a"]), ("a", vec![])]);
    assert_eq!(resolve_start_order(&env).unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn cycles_are_a_validation_error() {
    let env = env_with(vec![("a", vec!["b"]), ("b", vec!["a"])]);
    let err = resolve_start_order(&env).unwrap_err();
    assert!(matches!(err, RuntimeError::Validation(_)));
    assert!(err.to_string().contains("cyclic"));
}

#[test]
fn unknown_dependency_is_a_validation_error() {
    let env = env_with(vec![("a", vec!["ghost"])]);
    let err = resolve_start_order(&env).unwrap_err();
    assert!(matches!(err, RuntimeError::Validation(_)));
    assert!(err.to_string().contains("ghost"));
}
