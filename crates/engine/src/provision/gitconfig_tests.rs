// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::provision::Provisioner;
use bv_core::{Environment, MachineConfig, OwnerId, Recipe, RecipeKind, RuntimeIdentity};
use bv_storage::{FileStore, PreferenceStore};
use std::collections::HashMap;
use std::sync::Arc;

fn env() -> Environment {
    Environment::new(Recipe { kind: RecipeKind::Compose, content: String::new() })
        .with_machine("dev", MachineConfig::new("img"))
}

#[tokio::test]
async fn injects_recorded_git_identity() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = Arc::new(FileStore::open(dir.path().join("state.json")).unwrap());
    let owner = OwnerId::new("user-1");
    let mut entries = HashMap::new();
    entries.insert(PREF_GIT_USERNAME.to_string(), "bob".to_string());
    entries.insert(PREF_GIT_EMAIL.to_string(), "bob@example.org".to_string());
    prefs.update(&owner, entries).await.unwrap();

    let mut env = env();
    let identity = RuntimeIdentity::new("wksp-1", "default", "user-1");
    GitConfigProvisioner::new(prefs).provision(&mut env, &identity).await.unwrap();

    let env_vars = &env.machines["dev"].env;
    assert_eq!(env_vars.get("GIT_AUTHOR_NAME").map(String::as_str), Some("bob"));
    assert_eq!(
        env_vars.get("GIT_COMMITTER_EMAIL").map(String::as_str),
        Some("bob@example.org")
    );
}

#[tokio::test]
async fn machine_env_wins_over_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = Arc::new(FileStore::open(dir.path().join("state.json")).unwrap());
    let owner = OwnerId::new("user-1");
    let mut entries = HashMap::new();
    entries.insert(PREF_GIT_USERNAME.to_string(), "bob".to_string());
    prefs.update(&owner, entries).await.unwrap();

    let mut env = env();
    if let Some(machine) = env.machines.get_mut("dev") {
        machine.env.insert("GIT_AUTHOR_NAME".to_string(), "explicit".to_string());
    }
    let identity = RuntimeIdentity::new("wksp-1", "default", "user-1");
    GitConfigProvisioner::new(prefs).provision(&mut env, &identity).await.unwrap();

    assert_eq!(
        env.machines["dev"].env.get("GIT_AUTHOR_NAME").map(String::as_str),
        Some("explicit")
    );
}

#[tokio::test]
async fn no_preferences_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = Arc::new(FileStore::open(dir.path().join("state.json")).unwrap());

    let mut env = env();
    let identity = RuntimeIdentity::new("wksp-1", "default", "user-1");
    GitConfigProvisioner::new(prefs).provision(&mut env, &identity).await.unwrap();
    assert!(env.machines["dev"].env.is_empty());
}
