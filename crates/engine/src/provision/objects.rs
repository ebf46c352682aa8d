// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object materialization.
//!
//! Turns a provisioned [`Environment`] into the concrete platform objects
//! of one workspace: machines grouped into pods (by the `pod` attribute),
//! one service per machine with exposed ports, one ingress per public
//! server, and the persistent claim backing workspace volumes. Every
//! object carries the workspace-id label so teardown is one selector
//! delete.
//!
//! Server URLs are resolved here, deterministically: public servers route
//! through the ingress host pattern, internal servers through the service
//! DNS name.

use crate::namespace::resolver::{is_valid_label, normalize_label};
use bv_adapters::LABEL_WORKSPACE_ID;
use bv_core::{
    Environment, InfraConfig, MachineConfig, RuntimeError, RuntimeIdentity, Server, ServerConfig,
    VolumeStrategy,
};
use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, EnvFromSource, EnvVar,
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, Pod,
    PodSpec, ResourceRequirements, SecretEnvSource, Service, ServicePort, ServiceSpec, Volume,
    VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Label carrying the pod group, used as the service selector.
pub const LABEL_POD_GROUP: &str = "bivouac.io/pod-group";
/// Machine attribute assigning the machine to a pod group.
pub const POD_ATTRIBUTE: &str = "pod";
const DEFAULT_POD_GROUP: &str = "main";
const WORKSPACE_DATA_VOLUME: &str = "workspace-data";

/// Where one machine's container lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachinePlacement {
    pub machine: String,
    pub pod_name: String,
    pub container_name: String,
}

/// Everything the orchestrator submits for one start attempt.
#[derive(Debug)]
pub struct ObjectsPlan {
    pub pvc: Option<PersistentVolumeClaim>,
    pub pods: Vec<Pod>,
    pub services: Vec<Service>,
    pub ingresses: Vec<Ingress>,
    /// One placement per machine, in start order.
    pub placements: Vec<MachinePlacement>,
    /// Resolved servers per machine, all in `Starting` state.
    pub servers: IndexMap<String, IndexMap<String, Server>>,
}

/// Materialize the plan for a provisioned environment.
pub fn plan_objects(
    identity: &RuntimeIdentity,
    env: &Environment,
    start_order: &[String],
    config: &InfraConfig,
) -> Result<ObjectsPlan, RuntimeError> {
    let namespace = identity.namespace()?.to_string();
    let workspace_id = identity.workspace_id.as_str();
    if !is_valid_label(workspace_id) {
        return Err(RuntimeError::validation(format!(
            "workspace id '{}' is not usable as an object name",
            workspace_id
        )));
    }

    let wants_storage = config.volumes.strategy == VolumeStrategy::PerWorkspace
        && env.machines.values().any(|m| !m.volumes.is_empty());
    let pvc = wants_storage.then(|| build_pvc(identity, config));

    // group machines into pods, preserving start order
    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for machine_name in start_order {
        let machine = &env.machines[machine_name];
        let group = machine
            .attributes
            .get(POD_ATTRIBUTE)
            .cloned()
            .unwrap_or_else(|| DEFAULT_POD_GROUP.to_string());
        if !is_valid_label(&group) {
            return Err(RuntimeError::validation(format!(
                "machine '{}' declares invalid pod group '{}'",
                machine_name, group
            )));
        }
        groups.entry(group).or_default().push(machine_name.clone());
    }

    let mut pods = Vec::new();
    let mut placements = Vec::new();
    for (group, members) in &groups {
        let pod_name = format!("{}-{}", workspace_id, group);
        pods.push(build_pod(identity, env, group, &pod_name, members, config)?);
        for machine_name in members {
            placements.push(MachinePlacement {
                machine: machine_name.clone(),
                pod_name: pod_name.clone(),
                container_name: container_name(machine_name)?,
            });
        }
    }
    // placements follow start order, not pod grouping
    placements.sort_by_key(|p| {
        start_order.iter().position(|m| *m == p.machine).unwrap_or(usize::MAX)
    });

    let mut services = Vec::new();
    let mut ingresses = Vec::new();
    let mut servers = IndexMap::new();
    for (machine_name, machine) in &env.machines {
        if machine.servers.is_empty() {
            servers.insert(machine_name.clone(), IndexMap::new());
            continue;
        }
        let group = machine
            .attributes
            .get(POD_ATTRIBUTE)
            .map(String::as_str)
            .unwrap_or(DEFAULT_POD_GROUP);
        services.push(build_service(identity, machine_name, machine, group));
        for (server_ref, server) in &machine.servers {
            if server.public {
                ingresses.push(build_ingress(identity, machine_name, server_ref, server, config));
            }
        }
        servers.insert(
            machine_name.clone(),
            resolve_servers(identity, machine_name, machine, &namespace, config),
        );
    }

    Ok(ObjectsPlan { pvc, pods, services, ingresses, placements, servers })
}

/// The per-workspace claim name; contains the workspace id, so namespace
/// ownership checks also apply to it.
pub fn claim_name(identity: &RuntimeIdentity) -> String {
    format!("claim-{}", identity.workspace_id)
}

pub fn service_name(identity: &RuntimeIdentity, machine: &str) -> String {
    normalize_label(&format!("{}-{}", identity.workspace_id, machine))
}

pub fn ingress_name(identity: &RuntimeIdentity, machine: &str, server_ref: &str) -> String {
    normalize_label(&format!("{}-{}-{}", identity.workspace_id, machine, server_ref))
}

/// Host under which a public server is exposed.
pub fn public_host(
    identity: &RuntimeIdentity,
    machine: &str,
    server_ref: &str,
    config: &InfraConfig,
) -> String {
    format!(
        "{}.{}",
        normalize_label(&format!("{}-{}-{}", identity.workspace_id, machine, server_ref)),
        config.ingress_domain
    )
}

/// External URL of a public server.
pub fn public_server_url(
    identity: &RuntimeIdentity,
    machine: &str,
    server_ref: &str,
    server: &ServerConfig,
    config: &InfraConfig,
) -> String {
    format!(
        "{}://{}{}",
        server.protocol,
        public_host(identity, machine, server_ref, config),
        url_path(&server.path)
    )
}

/// Resolve every server of a machine to its reachable URL.
pub fn resolve_servers(
    identity: &RuntimeIdentity,
    machine_name: &str,
    machine: &MachineConfig,
    namespace: &str,
    config: &InfraConfig,
) -> IndexMap<String, Server> {
    let mut resolved = IndexMap::new();
    for (server_ref, server) in &machine.servers {
        let url = if server.public {
            public_server_url(identity, machine_name, server_ref, server, config)
        } else {
            format!(
                "{}://{}.{}.svc:{}{}",
                server.protocol,
                service_name(identity, machine_name),
                namespace,
                server.port,
                url_path(&server.path)
            )
        };
        let mut entry = Server::new(url);
        entry.attributes = server.attributes.clone();
        resolved.insert(server_ref.clone(), entry);
    }
    resolved
}

fn url_path(path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

fn container_name(machine: &str) -> Result<String, RuntimeError> {
    let name = normalize_label(machine);
    if name.is_empty() {
        return Err(RuntimeError::validation(format!(
            "machine name '{}' does not normalize to a container name",
            machine
        )));
    }
    Ok(name)
}

fn workspace_labels(identity: &RuntimeIdentity) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_WORKSPACE_ID.to_string(), identity.workspace_id.to_string());
    labels
}

fn build_pvc(identity: &RuntimeIdentity, config: &InfraConfig) -> PersistentVolumeClaim {
    let mut requests = BTreeMap::new();
    requests.insert(
        "storage".to_string(),
        Quantity(format!("{}Gi", config.volumes.claim_size_gib)),
    );
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(claim_name(identity)),
            labels: Some(workspace_labels(identity)),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_pod(
    identity: &RuntimeIdentity,
    env: &Environment,
    group: &str,
    pod_name: &str,
    members: &[String],
    config: &InfraConfig,
) -> Result<Pod, RuntimeError> {
    let mut labels = workspace_labels(identity);
    labels.insert(LABEL_POD_GROUP.to_string(), group.to_string());

    let mut volumes: Vec<Volume> = Vec::new();
    let mut containers = Vec::new();
    let per_workspace = config.volumes.strategy == VolumeStrategy::PerWorkspace;

    if per_workspace && members.iter().any(|m| !env.machines[m].volumes.is_empty()) {
        volumes.push(Volume {
            name: WORKSPACE_DATA_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim_name(identity),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    for machine_name in members {
        let machine = &env.machines[machine_name];
        let mut mounts = Vec::new();
        for volume in &machine.volumes {
            if per_workspace {
                mounts.push(VolumeMount {
                    name: WORKSPACE_DATA_VOLUME.to_string(),
                    mount_path: volume.mount_path.clone(),
                    sub_path: Some(format!("{}/{}", machine_name, volume.name)),
                    ..Default::default()
                });
            } else {
                let volume_name = normalize_label(&format!("{}-{}", machine_name, volume.name));
                if !volumes.iter().any(|v| v.name == volume_name) {
                    volumes.push(Volume {
                        name: volume_name.clone(),
                        empty_dir: Some(EmptyDirVolumeSource::default()),
                        ..Default::default()
                    });
                }
                mounts.push(VolumeMount {
                    name: volume_name,
                    mount_path: volume.mount_path.clone(),
                    ..Default::default()
                });
            }
        }

        let env_vars: Vec<EnvVar> = machine
            .env
            .iter()
            .map(|(k, v)| EnvVar { name: k.clone(), value: Some(v.clone()), ..Default::default() })
            .collect();

        let env_from: Vec<EnvFromSource> = machine
            .secrets
            .iter()
            .map(|secret| EnvFromSource {
                secret_ref: Some(SecretEnvSource {
                    name: secret.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect();

        let ports: Vec<ContainerPort> = machine
            .servers
            .values()
            .map(|s| ContainerPort {
                container_port: i32::from(s.port),
                ..Default::default()
            })
            .collect();

        let resources = machine.memory_limit_mb.map(|mb| {
            let mut limits = BTreeMap::new();
            limits.insert("memory".to_string(), Quantity(format!("{}Mi", mb)));
            ResourceRequirements { limits: Some(limits), ..Default::default() }
        });

        containers.push(Container {
            name: container_name(machine_name)?,
            image: Some(machine.image.clone()),
            env: (!env_vars.is_empty()).then_some(env_vars),
            env_from: (!env_from.is_empty()).then_some(env_from),
            ports: (!ports.is_empty()).then_some(ports),
            resources,
            volume_mounts: (!mounts.is_empty()).then_some(mounts),
            ..Default::default()
        });
    }

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(pod_name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers,
            volumes: (!volumes.is_empty()).then_some(volumes),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn build_service(
    identity: &RuntimeIdentity,
    machine_name: &str,
    machine: &MachineConfig,
    group: &str,
) -> Service {
    let mut selector = workspace_labels(identity);
    selector.insert(LABEL_POD_GROUP.to_string(), group.to_string());

    let ports: Vec<ServicePort> = machine
        .servers
        .iter()
        .map(|(server_ref, s)| ServicePort {
            name: Some(normalize_label(server_ref)),
            port: i32::from(s.port),
            target_port: Some(IntOrString::Int(i32::from(s.port))),
            ..Default::default()
        })
        .collect();

    Service {
        metadata: ObjectMeta {
            name: Some(service_name(identity, machine_name)),
            labels: Some(workspace_labels(identity)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_ingress(
    identity: &RuntimeIdentity,
    machine_name: &str,
    server_ref: &str,
    server: &ServerConfig,
    config: &InfraConfig,
) -> Ingress {
    let host = public_host(identity, machine_name, server_ref, config);
    let tls = config.tls.enabled.then(|| {
        vec![IngressTLS {
            hosts: Some(vec![host.clone()]),
            secret_name: config.tls.secret.clone(),
        }]
    });

    Ingress {
        metadata: ObjectMeta {
            name: Some(ingress_name(identity, machine_name, server_ref)),
            labels: Some(workspace_labels(identity)),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            tls,
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name(identity, machine_name),
                                port: Some(ServiceBackendPort {
                                    number: Some(i32::from(server.port)),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "objects_tests.rs"]
mod tests;
