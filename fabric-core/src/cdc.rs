//! C9 — CDC Engine: attaches to a live relationship's source, normalizes
//! and maps each change event, and applies it to the target (spec §4.9).

use crate::connection_manager::ConnectionManager;
use crate::environment::{MetricsSink, StateStore};
use fabric_connector::adapter::{key_predicate, Row};
use fabric_connector::context::OpContext;
use fabric_types::cdc::{CdcEvent, Op};
use fabric_types::config::CdcConfig;
use fabric_types::errors::{ConstraintKind, FabricError};
use fabric_types::relationship::{Binding, Relationship, RelationshipError, RelationshipState};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

pub struct CdcEngine {
    connections: Arc<ConnectionManager>,
    capabilities: Arc<fabric_types::capability::CapabilityRegistry>,
    metrics: Arc<dyn MetricsSink>,
    config: CdcConfig,
}

/// Why the consume loop returned, distinguishing a cooperative stop from the
/// source running dry (spec §4.9 point 2, "lazy infinite source sequence").
#[derive(Debug, PartialEq)]
pub enum StopReason {
    Cancelled,
    SourceDrained,
}

impl CdcEngine {
    pub fn new(
        connections: Arc<ConnectionManager>,
        capabilities: Arc<fabric_types::capability::CapabilityRegistry>,
        metrics: Arc<dyn MetricsSink>,
        config: CdcConfig,
    ) -> Self {
        Self { connections, capabilities, metrics, config }
    }

    /// Runs the consume/apply loop for `relationship` until the source
    /// drains or `ctx` is cancelled. Mutates `relationship` in place and
    /// persists it at the bounded commit cadence and on every state
    /// transition (spec §4.9 "transitions are persisted before any side
    /// effect that would be hard to undo").
    pub async fn run(
        &self,
        relationship: &mut Relationship,
        state_store: &dyn StateStore,
        ctx: &OpContext,
    ) -> Result<StopReason, FabricError> {
        let (target_conn, _) = self.connections.get(&relationship.target_conn_id).await?;
        let target_kind = target_conn.kind();
        let supports_txn = self.capabilities.get(target_kind)?.supports_transactions;

        let attach_config = fabric_connector::adapter::AttachConfig {
            start_position: relationship.cdc_position.clone(),
            containers: relationship.bindings.iter().map(|b| b.source_container.clone()).collect(),
        };
        let (source_conn, _) = self.connections.get(&relationship.source_conn_id).await?;
        let mut source = source_conn.replication_ops().attach_source(attach_config, ctx).await?;

        let mut events_since_commit = 0u32;
        let mut last_commit_at = Instant::now();
        let mut last_applied_txn: Option<String> = None;

        let stop_reason = loop {
            if ctx.is_cancelled() {
                break StopReason::Cancelled;
            }

            let raw = match source.next_raw(ctx).await {
                Ok(Some(raw)) => raw,
                Ok(None) => break StopReason::SourceDrained,
                Err(err) => {
                    self.fail(relationship, state_store, &err).await?;
                    return Err(err);
                }
            };

            let event = match source_conn.replication_ops().parse_event(&raw) {
                Ok(event) => event,
                Err(err) => {
                    self.fail(relationship, state_store, &err).await?;
                    return Err(err);
                }
            };

            let Some(binding) = relationship.binding_for_source(&event.container).cloned() else {
                continue;
            };

            let at_boundary = event.txn_id != last_applied_txn;

            match self.apply_event(&target_conn, &binding, &event).await {
                Ok(()) => {
                    relationship.record_event_applied(SystemTime::now());
                    self.metrics.incr_events_applied(&relationship.id);
                    last_applied_txn = event.txn_id.clone();
                    events_since_commit += 1;
                }
                Err(err) if self.config.fail_fast => {
                    self.fail(relationship, state_store, &err).await?;
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(error = %err, container = %event.container, "dropping event that failed to apply");
                    last_applied_txn = event.txn_id.clone();
                    continue;
                }
            }

            let due = events_since_commit >= self.config.position_commit_every_events
                || last_commit_at.elapsed() >= Duration::from_millis(self.config.position_commit_every_ms);
            // A target that supports transactions must never see a position
            // commit land mid-transaction (spec §4.9 "transaction boundaries
            // ... applied atomically when the target supports transactions");
            // `apply_transactional=false` opts out of that grouping even
            // when the target could support it (spec §6 `cdc.apply_transactional`).
            let boundary_ok = !supports_txn || !self.config.apply_transactional || at_boundary;
            if boundary_ok && due {
                self.commit_position(source.as_mut(), relationship, state_store).await?;
                events_since_commit = 0;
                last_commit_at = Instant::now();
            }
        };

        self.commit_position(source.as_mut(), relationship, state_store).await?;
        source.close().await?;
        Ok(stop_reason)
    }

    async fn apply_event(
        &self,
        target_conn: &Arc<dyn fabric_connector::adapter::Connection>,
        binding: &Binding,
        event: &CdcEvent,
    ) -> Result<(), FabricError> {
        let new = map_row(event.new.clone(), binding)?;
        let old = map_row(event.old.clone(), binding)?;
        let key_fields = key_fields_for(binding, event);
        let ctx = OpContext::new();

        match event.op {
            Op::Insert => {
                let Some(row) = new else { return Ok(()) };
                match target_conn.data_ops().insert(&binding.target_container, vec![row.clone()], &ctx).await {
                    Ok(_) => Ok(()),
                    Err(FabricError::ConstraintViolation { kind: ConstraintKind::Unique })
                        if binding.unique_fields.is_some() =>
                    {
                        let fields = binding.unique_fields.as_ref().unwrap();
                        target_conn.data_ops().upsert(&binding.target_container, vec![row], fields, &ctx).await.map(|_| ())
                    }
                    Err(err) => Err(err),
                }
            }
            Op::Update => {
                let Some(row) = new.or(old) else { return Ok(()) };
                target_conn.data_ops().update(&binding.target_container, vec![row], &key_fields, &ctx).await.map(|_| ())
            }
            Op::Delete => {
                let Some(locator) = old.or(new) else { return Ok(()) };
                let where_clause = key_predicate(&key_fields, &locator);
                target_conn.data_ops().delete(&binding.target_container, &where_clause, &ctx).await.map(|_| ())
            }
        }
    }

    async fn commit_position(
        &self,
        source: &mut dyn fabric_connector::adapter::CdcSource,
        relationship: &mut Relationship,
        state_store: &dyn StateStore,
    ) -> Result<(), FabricError> {
        if let Some(position) = source.position() {
            source.commit(&position).await?;
            relationship.cdc_position = Some(position);
            relationship.last_sync_at = Some(SystemTime::now());
            state_store.save_relationship(relationship).await?;
        }
        Ok(())
    }

    async fn fail(
        &self,
        relationship: &mut Relationship,
        state_store: &dyn StateStore,
        err: &FabricError,
    ) -> Result<(), FabricError> {
        relationship.state = RelationshipState::Error;
        relationship.error = Some(RelationshipError { code: error_code(err), message: err.to_string() });
        state_store.save_relationship(relationship).await
    }
}

fn error_code(err: &FabricError) -> String {
    match err {
        FabricError::UnknownKind(_) => "unknown_kind",
        FabricError::ConfigurationError { .. } => "configuration_error",
        FabricError::ConnectionError { .. } => "connection_error",
        FabricError::ConnectionLost { .. } => "connection_lost",
        FabricError::Unsupported { .. } => "unsupported",
        FabricError::TranslationLoss { .. } => "translation_loss",
        FabricError::NotFound { .. } => "not_found",
        FabricError::ConstraintViolation { .. } => "constraint_violation",
        FabricError::Transient { .. } => "transient",
        FabricError::Cancelled => "cancelled",
        FabricError::DeadlineExceeded => "deadline_exceeded",
        FabricError::Internal { .. } => "internal",
    }
    .to_string()
}

fn map_row(row: Option<indexmap::IndexMap<String, serde_json::Value>>, binding: &Binding) -> Result<Option<Row>, FabricError> {
    match row {
        None => Ok(None),
        Some(row) if binding.rules.is_empty() => Ok(Some(row)),
        Some(row) => fabric_connector::transform::apply(row, &binding.rules).map(Some),
    }
}

/// Fields used to locate the target row. Prefers the binding's declared
/// uniqueness key; falls back to every field present on the event's locator
/// row when none is declared, since some binding is still needed to keep
/// `UPDATE`/`DELETE` keyed (spec §4.9 point 4-5).
fn key_fields_for(binding: &Binding, event: &CdcEvent) -> Vec<String> {
    if let Some(fields) = &binding.unique_fields {
        return fields.clone();
    }
    event.locator_row().map(|row| row.keys().cloned().collect()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{InMemoryStateStore, NoopMetricsSink};
    use fabric_connector::registry::AdapterRegistry;
    use fabric_connector::test_util::{sample_descriptor, MockAdapter, NoopDecryptor};
    use fabric_types::capability::CapabilityRegistry;
    use fabric_types::relationship::RelationshipMode;

    async fn setup() -> (CdcEngine, Arc<ConnectionManager>, InMemoryStateStore) {
        let adapters = Arc::new(AdapterRegistry::new());
        adapters.register(Arc::new(MockAdapter::new()));
        let capabilities = Arc::new(CapabilityRegistry::with_defaults());
        let connections = Arc::new(ConnectionManager::new(
            adapters,
            capabilities.clone(),
            Arc::new(NoopDecryptor),
            Arc::new(NoopMetricsSink),
        ));
        connections.connect(sample_descriptor("source"), &OpContext::new()).await.unwrap();
        connections.connect(sample_descriptor("target"), &OpContext::new()).await.unwrap();
        let engine = CdcEngine::new(connections.clone(), capabilities, Arc::new(NoopMetricsSink), CdcConfig::default());
        (engine, connections, InMemoryStateStore::new())
    }

    fn binding() -> Binding {
        Binding {
            source_container: "users".to_string(),
            target_container: "users".to_string(),
            rules: vec![],
            unique_fields: Some(vec!["id".to_string()]),
        }
    }

    #[tokio::test]
    async fn source_with_no_attach_support_returns_unsupported() {
        // MockConnection's replication_ops is the shared `Unsupported` stub,
        // so attaching fails cleanly with a typed error rather than hanging.
        let (engine, _connections, state_store) = setup().await;
        let mut relationship = Relationship::new("r1", "source", "target", RelationshipMode::OneWay, vec![binding()]);
        let result = engine.run(&mut relationship, &state_store, &OpContext::new()).await;
        assert!(matches!(result, Err(FabricError::Unsupported { .. })));
    }

    #[test]
    fn key_fields_for_prefers_declared_unique_fields() {
        let binding = binding();
        let event = CdcEvent {
            op: Op::Update,
            schema: None,
            container: "users".to_string(),
            new: None,
            old: None,
            commit_ts: chrono::Utc::now(),
            lsn_or_token: "1".to_string(),
            txn_id: None,
            metadata: Default::default(),
        };
        assert_eq!(key_fields_for(&binding, &event), vec!["id".to_string()]);
    }

    #[test]
    fn key_fields_for_falls_back_to_locator_row_when_undeclared() {
        let mut binding = binding();
        binding.unique_fields = None;
        let mut old = indexmap::IndexMap::new();
        old.insert("pk".to_string(), serde_json::Value::from(1));
        let event = CdcEvent {
            op: Op::Delete,
            schema: None,
            container: "users".to_string(),
            new: None,
            old: Some(old),
            commit_ts: chrono::Utc::now(),
            lsn_or_token: "1".to_string(),
            txn_id: None,
            metadata: Default::default(),
        };
        assert_eq!(key_fields_for(&binding, &event), vec!["pk".to_string()]);
    }
}
