// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workspace runtime facade.
//!
//! `prepare` resolves and provisions the namespace, `start` drives the
//! concurrent multi-container start protocol, `stop` tears everything
//! down, and the recovery accessors surface state left behind by a
//! process that died mid-operation.
//!
//! # State machine
//!
//! `Stopped → Starting → Running → Stopping → Stopped`, enforced through
//! the state store's atomic operations: `init` refuses a second runtime
//! per workspace, and stopping requires `Running`. A failed start cleans
//! up and folds back to `Stopped`.

mod start;

use crate::events::EventPublisher;
use crate::namespace::provisioner::NamespaceProvisioner;
use crate::namespace::resolver::{NamespaceResolver, ResolutionContext};
use crate::probes::{ProbeResult, ProbeScheduler, ProbeStatus, WorkspaceProbe};
use crate::provision::ProvisioningPipeline;
use crate::servers::ServersChecker;
use bv_adapters::{Bootstrapper, PlatformDriver, ServerChecker};
use bv_core::{
    InfraConfig, Machine, MachineKey, RuntimeError, RuntimeIdentity, ServerStatus, WorkspaceId,
    WorkspaceStatus,
};
use bv_storage::{MachineStore, PreferenceStore, RuntimeState, RuntimeStateStore};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Public entry point composing the runtime engine.
pub struct WorkspaceRuntime {
    config: Arc<InfraConfig>,
    driver: Arc<dyn PlatformDriver>,
    bootstrapper: Arc<dyn Bootstrapper>,
    states: Arc<dyn RuntimeStateStore>,
    machines: Arc<dyn MachineStore>,
    resolver: Arc<NamespaceResolver>,
    provisioner: NamespaceProvisioner,
    pipeline: ProvisioningPipeline,
    servers_checker: ServersChecker,
    probes: Arc<ProbeScheduler>,
    events: EventPublisher,
    probe_tx: mpsc::UnboundedSender<ProbeResult>,
}

impl WorkspaceRuntime {
    /// Wire up the runtime. Spawns the background task that maps liveness
    /// probe results onto server statuses, so this must run inside a tokio
    /// runtime.
    pub fn new(
        config: InfraConfig,
        driver: Arc<dyn PlatformDriver>,
        bootstrapper: Arc<dyn Bootstrapper>,
        states: Arc<dyn RuntimeStateStore>,
        machines: Arc<dyn MachineStore>,
        prefs: Arc<dyn PreferenceStore>,
        checker: Arc<dyn ServerChecker>,
        events: EventPublisher,
    ) -> Self {
        let config = Arc::new(config);
        let resolver = Arc::new(NamespaceResolver::new(
            config.namespace.clone(),
            driver.clone(),
            prefs.clone(),
        ));
        let provisioner =
            NamespaceProvisioner::new(config.namespace.clone(), driver.clone(), resolver.clone());
        let pipeline = ProvisioningPipeline::standard(config.clone(), prefs);
        let servers_checker = ServersChecker::new(checker.clone(), &config);
        let probes = Arc::new(ProbeScheduler::new(checker, config.probe_interval()));

        let (probe_tx, probe_rx) = mpsc::unbounded_channel();
        tokio::spawn(liveness_loop(probe_rx, machines.clone(), events.clone()));

        Self {
            config,
            driver,
            bootstrapper,
            states,
            machines,
            resolver,
            provisioner,
            pipeline,
            servers_checker,
            probes,
            events,
            probe_tx,
        }
    }

    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    pub fn namespace_provisioner(&self) -> &NamespaceProvisioner {
        &self.provisioner
    }

    /// Resolve (or validate) and provision the namespace, returning the
    /// identity with the infrastructure namespace filled in.
    pub async fn prepare(
        &self,
        ctx: &ResolutionContext,
        identity: RuntimeIdentity,
    ) -> Result<RuntimeIdentity, RuntimeError> {
        let name = match &identity.namespace {
            Some(requested) => {
                self.resolver.check_allowed(requested, ctx).await?;
                requested.clone()
            }
            None => self.resolver.resolve(ctx).await?,
        };
        let namespace =
            self.provisioner.get_or_create(&identity.workspace_id, &name, ctx).await?;
        Ok(identity.with_namespace(namespace.name))
    }

    /// Stop the workspace: cancel probes, delete its platform objects,
    /// drop its state. A workspace with no runtime state is already
    /// stopped — that is a silent no-op; any other non-running status is a
    /// conflict.
    pub async fn stop(&self, identity: &RuntimeIdentity) -> Result<(), RuntimeError> {
        let workspace_id = &identity.workspace_id;
        let Some(state) = self.states.get(workspace_id).await? else {
            tracing::debug!(workspace = %workspace_id, "stop of a stopped workspace, nothing to do");
            return Ok(());
        };
        let moved = self
            .states
            .replace_status(
                workspace_id,
                |s| s == WorkspaceStatus::Running,
                WorkspaceStatus::Stopping,
            )
            .await?;
        if !moved {
            return Err(RuntimeError::conflict(format!(
                "workspace '{}' must be running to be stopped (status: {})",
                workspace_id, state.status
            )));
        }

        tracing::info!(workspace = %workspace_id, namespace = %state.namespace, "stopping workspace");
        self.probes.cancel(workspace_id);
        self.driver.delete_workspace_objects(&state.namespace, workspace_id).await?;
        self.remove_cached_state(workspace_id).await;
        self.events.send_runtime_stopped(identity, "workspace stopped");
        Ok(())
    }

    /// Current status; workspaces without runtime state are `Stopped`.
    pub async fn get_status(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<WorkspaceStatus, RuntimeError> {
        Ok(self.states.status(workspace_id).await?.unwrap_or(WorkspaceStatus::Stopped))
    }

    pub async fn get_machines(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<IndexMap<String, Machine>, RuntimeError> {
        self.machines.machines(workspace_id).await
    }

    /// Runtimes recorded as `Starting`/`Stopping` — operations that died
    /// with the owning process. The supervising layer decides whether to
    /// resume monitoring, force-stop, or surface a failure; the core only
    /// exposes the primitive.
    pub async fn in_progress(&self) -> Result<Vec<RuntimeState>, RuntimeError> {
        self.states.in_progress().await
    }

    /// Re-arm liveness probes for a recovered workspace from its stored
    /// machine records.
    pub async fn start_servers_checkers(
        &self,
        identity: &RuntimeIdentity,
    ) -> Result<(), RuntimeError> {
        let machines = self.machines.machines(&identity.workspace_id).await?;
        let mut probes = Vec::new();
        for (machine_name, machine) in &machines {
            for (server_ref, server) in &machine.servers {
                probes.push(WorkspaceProbe {
                    machine: machine_name.clone(),
                    server: server_ref.clone(),
                    url: server.url.clone(),
                });
            }
        }
        self.probes.schedule(identity, probes, self.probe_tx.clone());
        Ok(())
    }

    /// Remove state + machine rows, logging failures instead of
    /// propagating so an original error cause stays visible.
    async fn remove_cached_state(&self, workspace_id: &WorkspaceId) {
        if let Err(err) = self.states.remove(workspace_id).await {
            tracing::error!(workspace = %workspace_id, error = %err,
                "failed to remove runtime state");
        }
        if let Err(err) = self.machines.remove(workspace_id).await {
            tracing::error!(workspace = %workspace_id, error = %err,
                "failed to remove machine records");
        }
    }
}

/// Maps probe results onto server status and publishes transitions that
/// actually changed the stored status.
async fn liveness_loop(
    mut rx: mpsc::UnboundedReceiver<ProbeResult>,
    machines: Arc<dyn MachineStore>,
    events: EventPublisher,
) {
    while let Some(result) = rx.recv().await {
        let status = match result.status {
            ProbeStatus::Passed => ServerStatus::Running,
            ProbeStatus::Failed => ServerStatus::Stopped,
        };
        let key = MachineKey {
            workspace_id: result.identity.workspace_id.clone(),
            machine_name: result.machine.clone(),
        };
        match machines.update_server_status(&key, &result.server, status).await {
            Ok(true) => {
                let url = machines
                    .get_server(&key, &result.server)
                    .await
                    .ok()
                    .flatten()
                    .map(|s| s.url)
                    .unwrap_or_default();
                events.send_server_status(&result.identity, &result.machine, &result.server, status, &url);
            }
            Ok(false) => {}
            // the workspace may have been stopped between probe and update
            Err(err) => {
                tracing::debug!(machine = %key, error = %err, "dropping stale probe result");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "facade_tests.rs"]
mod facade_tests;
