//! C6 — Connection Manager: owns every live `Connection`/`InstanceConnection`
//! handle keyed by descriptor id, routes operation calls to the right
//! adapter, and enforces the exclusive-insert and explicit-reconnect-only
//! rules (spec §4.6).

use crate::environment::MetricsSink;
use fabric_connector::adapter::{Adapter, Connection, InstanceConnection};
use fabric_connector::context::OpContext;
use fabric_connector::registry::AdapterRegistry;
use fabric_types::capability::CapabilityRegistry;
use fabric_types::connection::{ConnectionDescriptor, ConnectionState, Decryptor, LiveConnection};
use fabric_types::errors::FabricError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

struct Slot {
    descriptor: ConnectionDescriptor,
    live: LiveConnection,
    connection: Option<Arc<dyn Connection>>,
    /// Set when the kind's capability declares `requires_serial_ops`;
    /// callers acquire it for the duration of one operation (spec §4.6
    /// concurrency note).
    serial_lock: Option<Arc<tokio::sync::Mutex<()>>>,
}

impl Slot {
    fn empty(descriptor: ConnectionDescriptor) -> Self {
        let live = LiveConnection::connecting(descriptor.id.clone(), descriptor.kind, SystemTime::now());
        Self { descriptor, live, connection: None, serial_lock: None }
    }

    fn usable(&self) -> Option<LiveConnection> {
        (self.live.state == ConnectionState::Connected && self.connection.is_some()).then(|| self.live.clone())
    }
}

struct InstanceSlot {
    live: LiveConnection,
    connection: Arc<dyn InstanceConnection>,
}

pub struct ConnectionManager {
    adapters: Arc<AdapterRegistry>,
    capabilities: Arc<CapabilityRegistry>,
    decryptor: Arc<dyn Decryptor>,
    metrics: Arc<dyn MetricsSink>,
    slots: Arc<RwLock<HashMap<String, Arc<tokio::sync::Mutex<Slot>>>>>,
    instance_slots: Arc<RwLock<HashMap<String, Arc<tokio::sync::Mutex<InstanceSlot>>>>>,
    close_deadline: Duration,
}

impl ConnectionManager {
    pub fn new(
        adapters: Arc<AdapterRegistry>,
        capabilities: Arc<CapabilityRegistry>,
        decryptor: Arc<dyn Decryptor>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            adapters,
            capabilities,
            decryptor,
            metrics,
            slots: Arc::new(RwLock::new(HashMap::new())),
            instance_slots: Arc::new(RwLock::new(HashMap::new())),
            close_deadline: Duration::from_secs(10),
        }
    }

    pub fn with_close_deadline(mut self, close_deadline: Duration) -> Self {
        self.close_deadline = close_deadline;
        self
    }

    fn slot_handle(&self, descriptor: &ConnectionDescriptor) -> Arc<tokio::sync::Mutex<Slot>> {
        self.slots
            .write()
            .entry(descriptor.id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Slot::empty(descriptor.clone()))))
            .clone()
    }

    /// `Connect(descriptor) → Connection` (spec §4.4, §4.6). A second call
    /// for the same id while the first is alive returns the existing
    /// handle rather than opening a duplicate connection.
    pub async fn connect(&self, descriptor: ConnectionDescriptor, ctx: &OpContext) -> Result<LiveConnection, FabricError> {
        let handle = self.slot_handle(&descriptor);
        let mut slot = handle.lock().await;
        if let Some(live) = slot.usable() {
            return Ok(live);
        }

        slot.live = LiveConnection::connecting(descriptor.id.clone(), descriptor.kind, SystemTime::now());
        let adapter = self.adapters.get(descriptor.kind)?;
        match adapter.connect(&descriptor, self.decryptor.as_ref(), ctx).await {
            Ok(connection) => {
                let capability = self.capabilities.get(descriptor.kind)?;
                slot.connection = Some(Arc::from(connection));
                slot.serial_lock = capability.requires_serial_ops.then(|| Arc::new(tokio::sync::Mutex::new(())));
                slot.live.state = ConnectionState::Connected;
                slot.descriptor = descriptor;
                self.metrics.incr_connects(slot.live.kind);
                Ok(slot.live.clone())
            }
            Err(err) => {
                slot.live.state = ConnectionState::Failed;
                self.metrics.incr_errors(descriptor.kind);
                Err(err)
            }
        }
    }

    pub async fn connect_instance(
        &self,
        descriptor: ConnectionDescriptor,
        ctx: &OpContext,
    ) -> Result<LiveConnection, FabricError> {
        if let Some(handle) = self.instance_slots.read().get(&descriptor.id).cloned() {
            let slot = handle.lock().await;
            if slot.live.state == ConnectionState::Connected {
                return Ok(slot.live.clone());
            }
        }

        let adapter = self.adapters.get(descriptor.kind)?;
        match adapter.connect_instance(&descriptor, self.decryptor.as_ref(), ctx).await {
            Ok(connection) => {
                let mut live = LiveConnection::connecting(descriptor.id.clone(), descriptor.kind, SystemTime::now());
                live.state = ConnectionState::Connected;
                self.instance_slots.write().insert(
                    descriptor.id.clone(),
                    Arc::new(tokio::sync::Mutex::new(InstanceSlot { live: live.clone(), connection: Arc::from(connection) })),
                );
                self.metrics.incr_connects(descriptor.kind);
                Ok(live)
            }
            Err(err) => {
                self.metrics.incr_errors(descriptor.kind);
                Err(err)
            }
        }
    }

    /// Looks up the live connection and its serialization lock, if any.
    /// Disallows the call entirely when the connection isn't `connected`
    /// (spec §4.6 "disallow operations in state ≠ connected").
    pub async fn get(&self, id: &str) -> Result<(Arc<dyn Connection>, Option<Arc<tokio::sync::Mutex<()>>>), FabricError> {
        let handle = self
            .slots
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| FabricError::NotFound { resource: id.to_string() })?;
        let slot = handle.lock().await;
        if slot.live.state != ConnectionState::Connected {
            return Err(FabricError::ConnectionLost { id: id.to_string() });
        }
        let connection = slot.connection.clone().ok_or_else(|| FabricError::ConnectionLost { id: id.to_string() })?;
        Ok((connection, slot.serial_lock.clone()))
    }

    /// Best-effort snapshot of a connection's state; returns `None` if the
    /// slot is mid-transition and its lock is held elsewhere, rather than
    /// blocking the caller.
    pub fn live_connection(&self, id: &str) -> Option<LiveConnection> {
        let handle = self.slots.read().get(id).cloned()?;
        handle.try_lock().ok().map(|slot| slot.live.clone())
    }

    /// Runs `op` against the named connection, holding the per-connection
    /// serialization lock for its duration if the kind requires it (spec
    /// §4.6 "per-connection serialization ... selected by capability
    /// flag").
    pub async fn execute<T, F, Fut>(&self, id: &str, op: F) -> Result<T, FabricError>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut,
        Fut: Future<Output = Result<T, FabricError>>,
    {
        let (connection, serial_lock) = self.get(id).await?;
        match serial_lock {
            Some(lock) => {
                let _guard = lock.lock().await;
                op(connection).await
            }
            None => op(connection).await,
        }
    }

    pub async fn ping(&self, id: &str, ctx: &OpContext) -> Result<(), FabricError> {
        let handle = self
            .slots
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| FabricError::NotFound { resource: id.to_string() })?;
        let mut slot = handle.lock().await;
        let Some(connection) = slot.connection.clone() else {
            return Err(FabricError::ConnectionLost { id: id.to_string() });
        };
        match connection.ping(ctx).await {
            Ok(()) => {
                slot.live.last_ping_at = Some(SystemTime::now());
                Ok(())
            }
            Err(err) => {
                slot.live.state = ConnectionState::Failed;
                self.metrics.incr_errors(slot.live.kind);
                Err(err)
            }
        }
    }

    /// Returns immediately to the caller; graceful shutdown of the
    /// underlying driver handle proceeds on a background task bounded by
    /// the manager's close deadline (spec §4.6).
    pub fn disconnect(&self, id: &str) {
        let Some(handle) = self.slots.read().get(id).cloned() else {
            return;
        };
        let slots = self.slots.clone();
        let metrics = self.metrics.clone();
        let close_deadline = self.close_deadline;
        let id = id.to_string();
        tokio::spawn(async move {
            let (connection, kind) = {
                let mut slot = handle.lock().await;
                slot.live.state = ConnectionState::Closing;
                (slot.connection.take(), slot.live.kind)
            };
            if let Some(connection) = connection {
                let ctx = OpContext::with_timeout(close_deadline);
                if let Err(err) = connection.close(&ctx).await {
                    tracing::warn!(error = %err, connection_id = %id, "close failed during graceful shutdown");
                }
            }
            handle.lock().await.live.state = ConnectionState::Closed;
            slots.write().remove(&id);
            metrics.incr_disconnects(kind);
        });
    }

    /// Explicit-only reconnect (spec §4.6 "Reconnect on explicit request
    /// only; no silent auto-reconnect").
    pub async fn reconnect(&self, id: &str, ctx: &OpContext) -> Result<LiveConnection, FabricError> {
        let handle = self
            .slots
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| FabricError::NotFound { resource: id.to_string() })?;
        let descriptor = {
            let mut slot = handle.lock().await;
            if let Some(connection) = slot.connection.take() {
                let _ = connection.close(ctx).await;
            }
            slot.live.state = ConnectionState::Closed;
            slot.descriptor.clone()
        };
        self.connect(descriptor, ctx).await
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|handle| {
                handle
                    .try_lock()
                    .map(|slot| slot.live.state == ConnectionState::Connected)
                    .unwrap_or(false)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::NoopMetricsSink;
    use fabric_connector::test_util::{sample_descriptor, MockAdapter, NoopDecryptor};
    use fabric_types::kind::Kind;

    fn manager() -> ConnectionManager {
        let adapters = Arc::new(AdapterRegistry::new());
        adapters.register(Arc::new(MockAdapter::new()));
        let capabilities = Arc::new(CapabilityRegistry::with_defaults());
        ConnectionManager::new(adapters, capabilities, Arc::new(NoopDecryptor), Arc::new(NoopMetricsSink))
    }

    #[tokio::test]
    async fn second_connect_returns_existing_handle() {
        let manager = manager();
        let ctx = OpContext::new();
        let descriptor = sample_descriptor("c1");
        let first = manager.connect(descriptor.clone(), &ctx).await.unwrap();
        let second = manager.connect(descriptor, &ctx).await.unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(manager.active_count(), 1);
    }

    #[tokio::test]
    async fn unconnected_id_is_not_found() {
        let manager = manager();
        let result = manager.get("missing").await;
        assert!(matches!(result, Err(FabricError::NotFound { .. })));
    }

    #[tokio::test]
    async fn disconnect_then_get_reports_connection_lost() {
        let manager = manager();
        let ctx = OpContext::new();
        manager.connect(sample_descriptor("c1"), &ctx).await.unwrap();
        manager.disconnect("c1");
        // Give the background close task a chance to run.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = manager.get("c1").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reconnect_replaces_the_handle() {
        let manager = manager();
        let ctx = OpContext::new();
        let first = manager.connect(sample_descriptor("c1"), &ctx).await.unwrap();
        let second = manager.reconnect("c1", &ctx).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.kind, Kind::Postgres);
        manager.get("c1").await.unwrap();
    }
}
