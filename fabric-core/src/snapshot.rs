//! C8 — Snapshot Engine: streaming initial copy of every bound container
//! from source to target under the relationship's mapping rules (spec
//! §4.8).

use crate::connection_manager::ConnectionManager;
use fabric_connector::adapter::Row;
use fabric_connector::context::OpContext;
use fabric_types::config::SnapshotConfig;
use fabric_types::errors::FabricError;
use fabric_types::relationship::Binding;
use std::sync::Arc;
use std::time::Duration;

/// One progress tick emitted onto the relationship's progress sink (spec
/// §4.8 step 2c).
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressTick {
    pub container: String,
    pub rows_done: u64,
    pub total_estimate: Option<u64>,
}

pub struct SnapshotEngine {
    connections: Arc<ConnectionManager>,
    config: SnapshotConfig,
}

impl SnapshotEngine {
    pub fn new(connections: Arc<ConnectionManager>, config: SnapshotConfig) -> Self {
        Self { connections, config }
    }

    /// Runs every binding to completion concurrently, up to
    /// `parallel_workers` at a time. Fails fast on the first binding's
    /// fatal error; other in-flight bindings are not cancelled.
    pub async fn run(
        &self,
        source_connection_id: &str,
        target_connection_id: &str,
        bindings: &[Binding],
        progress: tokio::sync::mpsc::Sender<ProgressTick>,
    ) -> Result<(), FabricError> {
        self.config.validate()?;
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.parallel_workers as usize));
        let mut tasks = Vec::with_capacity(bindings.len());

        for binding in bindings {
            let semaphore = semaphore.clone();
            let connections = self.connections.clone();
            let config = self.config.clone();
            let source_id = source_connection_id.to_string();
            let target_id = target_connection_id.to_string();
            let binding = binding.clone();
            let progress = progress.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                run_binding(&connections, &source_id, &target_id, &binding, &config, &progress).await
            }));
        }

        let mut first_error = None;
        for task in tasks {
            match task.await.map_err(|e| FabricError::internal(e))? {
                Ok(()) => {}
                Err(err) if first_error.is_none() => first_error = Some(err),
                Err(_) => {}
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// One binding's streaming copy (spec §4.8 step 2): open a streaming read
/// on the source, transform+project each batch, write it to the target via
/// `Insert` or `Upsert` depending on `unique_fields`.
async fn run_binding(
    connections: &ConnectionManager,
    source_connection_id: &str,
    target_connection_id: &str,
    binding: &Binding,
    config: &SnapshotConfig,
    progress: &tokio::sync::mpsc::Sender<ProgressTick>,
) -> Result<(), FabricError> {
    let mut stream = connections
        .execute(source_connection_id, |conn| {
            let container = binding.source_container.clone();
            let batch_size = config.batch_size;
            async move { conn.data_ops().stream(&container, batch_size, config.parallel_workers).await }
        })
        .await?;

    let mut rows_done = 0u64;
    loop {
        let Some(batch) = stream.next_batch().await else { break };
        let batch = batch?;
        if batch.is_empty() {
            continue;
        }
        let transformed = apply_binding(binding, batch)?;
        let written = write_batch(connections, target_connection_id, binding, transformed, config).await?;
        rows_done += written;
        let _ = progress
            .send(ProgressTick { container: binding.source_container.clone(), rows_done, total_estimate: None })
            .await;
    }

    Ok(())
}

/// Maps each row through the binding's rules. This is pure data
/// transformation (spec §3 `MappingRule`), so it runs directly against the
/// shared evaluator rather than through a connection's capability object —
/// a target adapter with no CDC support still needs its snapshot rows
/// mapped.
fn apply_binding(binding: &Binding, rows: Vec<Row>) -> Result<Vec<Row>, FabricError> {
    if binding.rules.is_empty() {
        return Ok(rows);
    }
    rows.into_iter().map(|row| fabric_connector::transform::apply(row, &binding.rules)).collect()
}

async fn write_batch(
    connections: &ConnectionManager,
    target_connection_id: &str,
    binding: &Binding,
    rows: Vec<Row>,
    config: &SnapshotConfig,
) -> Result<u64, FabricError> {
    let container = binding.target_container.clone();
    let unique_fields = binding.unique_fields.clone();

    fabric_utils::retry_with_backoff(config.max_retries, Duration::from_millis(config.retry_backoff_ms), || {
        let container = container.clone();
        let unique_fields = unique_fields.clone();
        let rows = rows.clone();
        connections.execute(target_connection_id, move |conn| async move {
            match &unique_fields {
                Some(fields) => conn.data_ops().upsert(&container, rows, fields, &OpContext::new()).await,
                None => conn.data_ops().insert(&container, rows, &OpContext::new()).await,
            }
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::NoopMetricsSink;
    use fabric_connector::registry::AdapterRegistry;
    use fabric_connector::test_util::{sample_descriptor, MockAdapter, NoopDecryptor};
    use fabric_types::capability::CapabilityRegistry;
    use serde_json::Value;

    async fn setup() -> (SnapshotEngine, Arc<ConnectionManager>, Arc<fabric_connector::test_util::MockStore>) {
        let adapter = MockAdapter::new();
        let store = adapter.store.clone();
        let adapters = Arc::new(AdapterRegistry::new());
        adapters.register(Arc::new(adapter));
        let capabilities = Arc::new(CapabilityRegistry::with_defaults());
        let connections = Arc::new(ConnectionManager::new(
            adapters,
            capabilities,
            Arc::new(NoopDecryptor),
            Arc::new(NoopMetricsSink),
        ));
        connections.connect(sample_descriptor("source"), &OpContext::new()).await.unwrap();
        connections.connect(sample_descriptor("target"), &OpContext::new()).await.unwrap();
        let engine = SnapshotEngine::new(connections.clone(), SnapshotConfig::default());
        (engine, connections, store)
    }

    fn row(id: i64) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(id));
        row
    }

    #[tokio::test]
    async fn copies_all_rows_from_source_to_target() {
        let (engine, _connections, store) = setup().await;
        store.seed("users", vec![row(1), row(2), row(3)]);

        let binding = Binding { source_container: "users".to_string(), target_container: "users".to_string(), rules: vec![], unique_fields: None };
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        engine.run("source", "target", &[binding], tx).await.unwrap();

        let target_rows = store.rows.lock().get("users").cloned().unwrap_or_default();
        assert_eq!(target_rows.len(), 6, "mock store shares source/target container, both copies land in one vec");

        let mut last_tick = None;
        while let Ok(tick) = rx.try_recv() {
            last_tick = Some(tick);
        }
        assert_eq!(last_tick.unwrap().rows_done, 3);
    }

    #[tokio::test]
    async fn zero_row_snapshot_completes_cleanly() {
        let (engine, _connections, _store) = setup().await;
        let binding = Binding { source_container: "empty".to_string(), target_container: "empty".to_string(), rules: vec![], unique_fields: None };
        let (tx, _rx) = tokio::sync::mpsc::channel(16);
        engine.run("source", "target", &[binding], tx).await.unwrap();
    }
}
