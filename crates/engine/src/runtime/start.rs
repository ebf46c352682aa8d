// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The start orchestrator.
//!
//! One start attempt: provision the environment copy, submit platform
//! objects (volumes, services, ingresses, pods), then drive every machine
//! through its pipeline concurrently:
//!
//! ```text
//! wait-running → mark-running → bootstrap installers → check servers
//! ```
//!
//! A shared `CancellationToken` is the failure signal — the moment one
//! pipeline fails, every sibling's pending await short-circuits and its
//! in-flight sub-operation is dropped. The whole join is bounded by the
//! workspace start timeout. Every failure path cleans up platform objects
//! and cached state before surfacing the first observed cause.

use super::WorkspaceRuntime;
use crate::events::EventPublisher;
use crate::probes::{ProbeResult, ProbeScheduler, WorkspaceProbe};
use crate::provision::objects::{self, MachinePlacement};
use crate::servers::ServersChecker;
use bv_adapters::{ingress_has_address, pod_phase, pod_settled, Bootstrapper, PlatformDriver};
use bv_core::{
    Environment, InfraConfig, Machine, MachineKey, MachineStatus, RuntimeError, RuntimeIdentity,
    ServerStatus, WorkspaceStatus,
};
use bv_storage::{MachineStore, RuntimeState};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

impl WorkspaceRuntime {
    /// Start the workspace and return once every declared server is
    /// confirmed reachable.
    pub async fn start(
        &self,
        identity: &RuntimeIdentity,
        environment: &Environment,
    ) -> Result<(), RuntimeError> {
        self.start_cancellable(identity, environment, CancellationToken::new()).await
    }

    /// `start` with a caller-owned cancellation token. Cancelling it
    /// aborts the attempt, cleans up, and surfaces
    /// [`RuntimeError::Interrupted`].
    pub async fn start_cancellable(
        &self,
        identity: &RuntimeIdentity,
        environment: &Environment,
        cancel: CancellationToken,
    ) -> Result<(), RuntimeError> {
        let namespace = identity.namespace()?.to_string();

        // mark starting: atomic insert, refuses a second active runtime
        if !self.states.init(RuntimeState::starting(identity.clone(), &namespace)).await? {
            return Err(RuntimeError::conflict(format!(
                "workspace '{}' already has an active runtime",
                identity.workspace_id
            )));
        }

        tracing::info!(workspace = %identity.workspace_id, namespace = %namespace,
            "starting workspace");
        match self.internal_start(identity, &namespace, environment, &cancel).await {
            Ok(()) => {
                self.states
                    .update_status(&identity.workspace_id, WorkspaceStatus::Running)
                    .await?;
                tracing::info!(workspace = %identity.workspace_id, "workspace is running");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(workspace = %identity.workspace_id, error = %err,
                    "workspace start failed, cleaning up");
                self.probes.cancel(&identity.workspace_id);
                if let Err(cleanup) =
                    self.driver.delete_workspace_objects(&namespace, &identity.workspace_id).await
                {
                    tracing::warn!(workspace = %identity.workspace_id, error = %cleanup,
                        "cleanup of workspace objects failed");
                }
                self.remove_cached_state(&identity.workspace_id).await;
                Err(err)
            }
        }
    }

    async fn internal_start(
        &self,
        identity: &RuntimeIdentity,
        namespace: &str,
        environment: &Environment,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        // defensive copy: provisioners mutate, the caller's environment
        // stays pristine
        let mut env = environment.clone();
        let start_order = self.pipeline.apply(&mut env, identity).await?;
        let plan = objects::plan_objects(identity, &env, &start_order, &self.config)?;

        // volumes first: pods reference the claim
        if let Some(pvc) = &plan.pvc {
            self.driver.create_pvc(namespace, pvc.clone()).await?;
        }

        // wiring other containers depend on, then wait for addresses
        for service in &plan.services {
            self.driver.create_service(namespace, service.clone()).await?;
        }
        for ingress in &plan.ingresses {
            self.driver.create_ingress(namespace, ingress.clone()).await?;
        }
        for ingress in &plan.ingresses {
            let name = ingress.metadata.name.clone().unwrap_or_default();
            tokio::select! {
                _ = cancel.cancelled() => return Err(RuntimeError::Interrupted),
                ready = self.driver.wait_ingress(
                    namespace,
                    &name,
                    self.config.ingress_start_timeout(),
                    ingress_has_address,
                ) => { ready?; }
            }
        }

        // pods, then one machine record per container
        for pod in &plan.pods {
            self.driver.create_pod(namespace, pod.clone()).await?;
        }
        for placement in &plan.placements {
            let servers = plan.servers.get(&placement.machine).cloned().unwrap_or_default();
            let mut machine = Machine::starting(
                &placement.machine,
                &placement.pod_name,
                &placement.container_name,
                servers,
            );
            if let Some(config) = env.machines.get(&placement.machine) {
                machine.attributes = config.attributes.clone();
            }
            self.machines.put(MachineKey::new(identity, &placement.machine), machine).await?;
            self.events.send_machine_starting(identity, &placement.machine);
        }

        // one concurrent pipeline per machine
        let shared = Arc::new(StartShared {
            identity: identity.clone(),
            namespace: namespace.to_string(),
            env,
            config: self.config.clone(),
            driver: self.driver.clone(),
            bootstrapper: self.bootstrapper.clone(),
            machines: self.machines.clone(),
            events: self.events.clone(),
            servers_checker: self.servers_checker.clone(),
            probes: self.probes.clone(),
            probe_tx: self.probe_tx.clone(),
            cancel: cancel.clone(),
        });
        let mut pipelines = JoinSet::new();
        for placement in plan.placements {
            let shared = shared.clone();
            pipelines.spawn(async move {
                let machine = placement.machine.clone();
                (machine, machine_pipeline(shared, placement).await)
            });
        }

        self.wait_machines(identity, pipelines, cancel).await
    }

    /// Join all machine pipelines against the workspace start timeout,
    /// keeping only the first observed failure as the cause.
    async fn wait_machines(
        &self,
        identity: &RuntimeIdentity,
        mut pipelines: JoinSet<(String, Result<(), RuntimeError>)>,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        let deadline = tokio::time::sleep(self.config.workspace_start_timeout());
        tokio::pin!(deadline);
        let mut first_failure: Option<RuntimeError> = None;

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    cancel.cancel();
                    pipelines.shutdown().await;
                    return Err(RuntimeError::infrastructure(format!(
                        "waiting for environment '{}' of workspace '{}' reached timeout",
                        identity.env_name, identity.workspace_id
                    )));
                }
                joined = pipelines.join_next() => match joined {
                    None => break,
                    Some(Ok((machine, Ok(())))) => {
                        tracing::debug!(workspace = %identity.workspace_id, machine,
                            "machine pipeline completed");
                    }
                    Some(Ok((machine, Err(err)))) => {
                        self.record_pipeline_failure(identity, &machine, err, &mut first_failure, cancel)
                            .await;
                    }
                    Some(Err(join_err)) => {
                        if first_failure.is_none() {
                            cancel.cancel();
                            first_failure = Some(RuntimeError::infrastructure(format!(
                                "machine pipeline task failed: {}",
                                join_err
                            )));
                        }
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The first non-interrupted failure becomes the start's cause: it
    /// flips the machine to `Failed`, publishes the failed event, and
    /// signals every other pipeline to stop. Later failures are logged
    /// only; interruptions of sibling pipelines are expected fallout.
    async fn record_pipeline_failure(
        &self,
        identity: &RuntimeIdentity,
        machine: &str,
        err: RuntimeError,
        first_failure: &mut Option<RuntimeError>,
        cancel: &CancellationToken,
    ) {
        if err.is_interrupted() {
            if first_failure.is_none() {
                // no prior failure: the caller cancelled the start
                *first_failure = Some(RuntimeError::Interrupted);
            }
            return;
        }
        if first_failure.is_some() {
            tracing::warn!(workspace = %identity.workspace_id, machine, error = %err,
                "additional machine failure after first cause");
            return;
        }
        cancel.cancel();
        let key = MachineKey::new(identity, machine);
        if let Err(update_err) =
            self.machines.update_machine_status(&key, MachineStatus::Failed).await
        {
            tracing::error!(machine = %key, error = %update_err,
                "unable to mark machine failed");
        }
        self.events.send_machine_failed(identity, machine, &err.to_string());
        *first_failure = Some(err);
    }
}

/// Everything a machine pipeline task needs, captured at spawn time —
/// pipelines never read ambient state.
struct StartShared {
    identity: RuntimeIdentity,
    namespace: String,
    env: Environment,
    config: Arc<InfraConfig>,
    driver: Arc<dyn PlatformDriver>,
    bootstrapper: Arc<dyn Bootstrapper>,
    machines: Arc<dyn MachineStore>,
    events: EventPublisher,
    servers_checker: ServersChecker,
    probes: Arc<ProbeScheduler>,
    probe_tx: tokio::sync::mpsc::UnboundedSender<ProbeResult>,
    cancel: CancellationToken,
}

/// One machine's start pipeline; stages are strictly ordered, and every
/// await races the shared failure signal.
async fn machine_pipeline(
    shared: Arc<StartShared>,
    placement: MachinePlacement,
) -> Result<(), RuntimeError> {
    let key = MachineKey::new(&shared.identity, &placement.machine);

    // a. wait-running: suspend until the platform settles the pod. The
    // bound is padded past the workspace timeout so the orchestrator's
    // deadline, not this wait, decides timeouts.
    let pod_wait_bound =
        shared.config.workspace_start_timeout() + std::time::Duration::from_secs(60);
    let pod = tokio::select! {
        _ = shared.cancel.cancelled() => return Err(RuntimeError::Interrupted),
        pod = shared.driver.wait_pod(
            &shared.namespace,
            &placement.pod_name,
            pod_wait_bound,
            pod_settled,
        ) => pod?,
    };
    if pod_phase(&pod) == Some("Failed") {
        return Err(RuntimeError::infrastructure(format!(
            "pod '{}' of machine '{}' entered the Failed phase",
            placement.pod_name, placement.machine
        )));
    }

    // b. mark-running
    if shared.machines.update_machine_status(&key, MachineStatus::Running).await? {
        shared.events.send_machine_running(&shared.identity, &placement.machine);
    }

    // c. bootstrap installers (resolved immediately when none declared)
    let installers = shared
        .env
        .machines
        .get(&placement.machine)
        .map(|m| m.installers.clone())
        .unwrap_or_default();
    if !installers.is_empty() {
        tokio::select! {
            _ = shared.cancel.cancelled() => return Err(RuntimeError::Interrupted),
            done = shared.bootstrapper.bootstrap(&shared.identity, &placement.machine, &installers) => done?,
        }
    }

    // d. one-shot readiness per declared server, then liveness probes
    let servers = shared
        .machines
        .machines(&key.workspace_id)
        .await?
        .get(&placement.machine)
        .map(|m| m.servers.clone())
        .unwrap_or_default();
    for (server_ref, server) in &servers {
        let ready = tokio::select! {
            _ = shared.cancel.cancelled() => return Err(RuntimeError::Interrupted),
            ready = shared.servers_checker.await_ready(server_ref, &server.url) => ready,
        };
        if let Err(err) = ready {
            if shared
                .machines
                .update_server_status(&key, server_ref, ServerStatus::Stopped)
                .await
                .unwrap_or(false)
            {
                shared.events.send_server_status(
                    &shared.identity,
                    &placement.machine,
                    server_ref,
                    ServerStatus::Stopped,
                    &server.url,
                );
            }
            return Err(err);
        }
        if shared.machines.update_server_status(&key, server_ref, ServerStatus::Running).await? {
            shared.events.send_server_status(
                &shared.identity,
                &placement.machine,
                server_ref,
                ServerStatus::Running,
                &server.url,
            );
        }
    }

    let probes: Vec<WorkspaceProbe> = servers
        .iter()
        .map(|(server_ref, server)| WorkspaceProbe {
            machine: placement.machine.clone(),
            server: server_ref.clone(),
            url: server.url.clone(),
        })
        .collect();
    shared.probes.schedule(&shared.identity, probes, shared.probe_tx.clone());

    Ok(())
}

#[cfg(test)]
#[path = "start_tests.rs"]
mod tests;
