// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    kubernetes = { "kubernetes-list", RecipeKind::KubernetesList },
    docker = { "docker-image", RecipeKind::DockerImage },
    compose = { "compose", RecipeKind::Compose },
)]
fn recipe_kind_parses(raw: &str, expected: RecipeKind) {
    assert_eq!(RecipeKind::parse(raw).unwrap(), expected);
    assert_eq!(expected.to_string(), raw);
}

#[test]
fn unknown_recipe_kind_is_a_validation_error() {
    let err = RecipeKind::parse("helm").unwrap_err();
    assert!(matches!(err, crate::RuntimeError::Validation(_)));
}

#[test]
fn environment_is_cloneable_for_defensive_copies() {
    let env = Environment::new(Recipe {
        kind: RecipeKind::DockerImage,
        content: "quay.io/bivouac/dev:latest".to_string(),
    })
    .with_machine("dev", MachineConfig::new("quay.io/bivouac/dev:latest"));

    let mut copy = env.clone();
    copy.machines.insert("db".to_string(), MachineConfig::new("postgres:16"));

    assert_eq!(env.machines.len(), 1);
    assert_eq!(copy.machines.len(), 2);
}

#[test]
fn machine_config_defaults_are_empty() {
    let config = MachineConfig::new("img");
    assert!(config.installers.is_empty());
    assert!(config.servers.is_empty());
    assert!(config.depends_on.is_empty());
    assert_eq!(config.memory_limit_mb, None);
}

#[test]
fn server_config_exposed_marks_public() {
    let server = ServerConfig::http(8080).exposed();
    assert!(server.public);
    assert_eq!(server.protocol, "http");
}
