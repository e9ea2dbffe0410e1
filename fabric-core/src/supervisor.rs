//! C10 — Relationship Supervisor: reconciles the persisted relationship
//! registry against the engines actually running in this process (spec
//! §4.10).

use crate::cdc::{CdcEngine, StopReason};
use crate::connection_manager::ConnectionManager;
use crate::environment::{MetricsSink, StateStore};
use crate::snapshot::{ProgressTick, SnapshotEngine};
use fabric_connector::context::OpContext;
use fabric_types::capability::CapabilityRegistry;
use fabric_types::config::{CdcConfig, SnapshotConfig};
use fabric_types::errors::FabricError;
use fabric_types::relationship::{Relationship, RelationshipError, RelationshipMode, RelationshipState};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A relationship with a task running against it in this process. Holding
/// the context lets `stop`/`remove` cancel the consume loop at the next
/// event boundary (spec §4.9 "a pause or stop cancels ... at the next event
/// boundary").
struct RunningRelationship {
    ctx: OpContext,
    handle: tokio::task::JoinHandle<()>,
}

pub struct RelationshipSupervisor {
    state_store: Arc<dyn StateStore>,
    connections: Arc<ConnectionManager>,
    capabilities: Arc<CapabilityRegistry>,
    metrics: Arc<dyn MetricsSink>,
    snapshot_config: SnapshotConfig,
    cdc_config: CdcConfig,
    running: RwLock<HashMap<String, RunningRelationship>>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl RelationshipSupervisor {
    pub fn new(
        state_store: Arc<dyn StateStore>,
        connections: Arc<ConnectionManager>,
        capabilities: Arc<CapabilityRegistry>,
        metrics: Arc<dyn MetricsSink>,
        snapshot_config: SnapshotConfig,
        cdc_config: CdcConfig,
    ) -> Self {
        Self {
            state_store,
            connections,
            capabilities,
            metrics,
            snapshot_config,
            cdc_config,
            running: RwLock::new(HashMap::new()),
            max_retries: 5,
            retry_backoff: Duration::from_secs(1),
        }
    }

    /// `CreateRelationship(rel)` (spec §6). `multi_master_stub` has no
    /// specified conflict-resolution semantics (spec §9 Open Questions), so
    /// it is rejected here rather than accepted and silently mishandled.
    pub async fn create(&self, relationship: Relationship) -> Result<(), FabricError> {
        if relationship.mode == RelationshipMode::MultiMasterStub {
            return Err(FabricError::unsupported("relationship.create", "multi_master_stub"));
        }
        self.state_store.save_relationship(&relationship).await
    }

    /// `StartRelationship(id)` (spec §6): runs the snapshot to completion,
    /// then transitions to `live` and spawns the CDC consumer task.
    pub async fn start(&self, id: &str, progress: tokio::sync::mpsc::Sender<ProgressTick>) -> Result<(), FabricError> {
        let mut relationship = self.load(id).await?;
        relationship.state = RelationshipState::Snapshotting;
        self.state_store.save_relationship(&relationship).await?;

        let snapshot = SnapshotEngine::new(self.connections.clone(), self.snapshot_config.clone());
        if let Err(err) = snapshot
            .run(&relationship.source_conn_id, &relationship.target_conn_id, &relationship.bindings, progress)
            .await
        {
            relationship.state = RelationshipState::Error;
            relationship.error = Some(RelationshipError { code: "snapshot_failed".to_string(), message: err.to_string() });
            self.state_store.save_relationship(&relationship).await?;
            return Err(err);
        }

        relationship.state = RelationshipState::Live;
        self.state_store.save_relationship(&relationship).await?;
        self.spawn_cdc(relationship);
        Ok(())
    }

    /// `StopRelationship(id)` (spec §6): cancels the running CDC task if
    /// any and waits for it to commit position and persist `paused`.
    pub async fn stop(&self, id: &str) -> Result<(), FabricError> {
        if let Some(running) = self.running.write().remove(id) {
            running.ctx.cancel();
            let _ = running.handle.await;
        }
        let mut relationship = self.load(id).await?;
        if relationship.state != RelationshipState::Closed {
            relationship.state = RelationshipState::Paused;
            self.state_store.save_relationship(&relationship).await?;
        }
        Ok(())
    }

    /// `ResumeRelationship(id)` (spec §6): re-attaches CDC from the stored
    /// position without re-running the snapshot.
    pub async fn resume(&self, id: &str) -> Result<(), FabricError> {
        let mut relationship = self.load(id).await?;
        relationship.state = RelationshipState::Live;
        self.state_store.save_relationship(&relationship).await?;
        self.spawn_cdc(relationship);
        Ok(())
    }

    /// `RemoveRelationship(id)` (spec §6): drives `paused` then deletes the
    /// record.
    pub async fn remove(&self, id: &str) -> Result<(), FabricError> {
        self.stop(id).await.ok();
        self.state_store.delete_relationship(id).await
    }

    /// Periodic-and-event-driven reconcile pass (spec §4.10): re-attaches
    /// CDC for `live` relationships with no running task (process restart),
    /// and retries `error` relationships up to a capped attempt count.
    pub async fn reconcile(&self) -> Result<(), FabricError> {
        for relationship in self.state_store.list_relationships().await? {
            match relationship.state {
                RelationshipState::Live if !self.running.read().contains_key(&relationship.id) => {
                    tracing::info!(relationship_id = %relationship.id, "re-attaching CDC after restart");
                    self.spawn_cdc(relationship);
                }
                RelationshipState::Error => {
                    self.retry_errored(relationship).await;
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn retry_errored(&self, mut relationship: Relationship) {
        let attempts = relationship
            .error
            .as_ref()
            .and_then(|e| e.code.strip_prefix("retry_").and_then(|n| n.parse::<u32>().ok()))
            .unwrap_or(0);
        if attempts >= self.max_retries {
            return;
        }
        tokio::time::sleep(self.retry_backoff * 2u32.pow(attempts)).await;
        relationship.error = Some(RelationshipError { code: format!("retry_{}", attempts + 1), message: "retrying after error".to_string() });
        relationship.state = RelationshipState::Snapshotting;
        if self.state_store.save_relationship(&relationship).await.is_ok() {
            self.spawn_cdc(relationship);
        }
    }

    async fn load(&self, id: &str) -> Result<Relationship, FabricError> {
        self.state_store
            .load_relationship(id)
            .await?
            .ok_or_else(|| FabricError::NotFound { resource: id.to_string() })
    }

    fn spawn_cdc(&self, relationship: Relationship) {
        let ctx = OpContext::new();
        let id = relationship.id.clone();
        let connections = self.connections.clone();
        let capabilities = self.capabilities.clone();
        let cdc_config = self.cdc_config.clone();
        let state_store = self.state_store.clone();
        let metrics = self.metrics.clone();
        let task_ctx = ctx.clone();

        let handle = tokio::spawn(async move {
            let engine = CdcEngine::new(connections, capabilities, metrics, cdc_config);
            let mut relationship = relationship;
            match engine.run(&mut relationship, state_store.as_ref(), &task_ctx).await {
                Ok(StopReason::Cancelled) => {
                    relationship.state = RelationshipState::Paused;
                    let _ = state_store.save_relationship(&relationship).await;
                }
                Ok(StopReason::SourceDrained) => {}
                Err(err) => {
                    tracing::error!(error = %err, relationship_id = %relationship.id, "CDC engine stopped with a fatal error");
                }
            }
        });

        self.running.write().insert(id, RunningRelationship { ctx, handle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{InMemoryStateStore, NoopMetricsSink};
    use fabric_connector::registry::AdapterRegistry;
    use fabric_connector::test_util::{sample_descriptor, MockAdapter, NoopDecryptor};
    use fabric_types::relationship::Binding;

    fn supervisor() -> (RelationshipSupervisor, Arc<ConnectionManager>) {
        let adapters = Arc::new(AdapterRegistry::new());
        adapters.register(Arc::new(MockAdapter::new()));
        let capabilities = Arc::new(CapabilityRegistry::with_defaults());
        let connections = Arc::new(ConnectionManager::new(
            adapters,
            capabilities.clone(),
            Arc::new(NoopDecryptor),
            Arc::new(NoopMetricsSink),
        ));
        let state_store = Arc::new(InMemoryStateStore::new());
        let supervisor = RelationshipSupervisor::new(
            state_store,
            connections.clone(),
            capabilities,
            Arc::new(NoopMetricsSink),
            SnapshotConfig::default(),
            CdcConfig::default(),
        );
        (supervisor, connections)
    }

    fn binding() -> Binding {
        Binding { source_container: "users".to_string(), target_container: "users".to_string(), rules: vec![], unique_fields: None }
    }

    #[tokio::test]
    async fn create_rejects_multi_master_stub() {
        let (supervisor, _connections) = supervisor();
        let relationship = Relationship::new("r1", "src", "dst", RelationshipMode::MultiMasterStub, vec![binding()]);
        let result = supervisor.create(relationship).await;
        assert!(matches!(result, Err(FabricError::Unsupported { .. })));
    }

    #[tokio::test]
    async fn create_persists_one_way_relationship() {
        let (supervisor, _connections) = supervisor();
        let relationship = Relationship::new("r1", "src", "dst", RelationshipMode::OneWay, vec![binding()]);
        supervisor.create(relationship).await.unwrap();
        let loaded = supervisor.load("r1").await.unwrap();
        assert_eq!(loaded.state, RelationshipState::Pending);
    }

    #[tokio::test]
    async fn start_fails_snapshot_when_connections_are_not_registered() {
        let (supervisor, _connections) = supervisor();
        let relationship = Relationship::new("r1", "missing-source", "missing-target", RelationshipMode::OneWay, vec![binding()]);
        supervisor.create(relationship).await.unwrap();
        let (tx, _rx) = tokio::sync::mpsc::channel(16);
        let result = supervisor.start("r1", tx).await;
        assert!(result.is_err());
        let loaded = supervisor.load("r1").await.unwrap();
        assert_eq!(loaded.state, RelationshipState::Error);
    }
}
