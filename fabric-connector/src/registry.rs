//! Process-wide adapter registry. Each database kind's crate exposes a
//! `register(&AdapterRegistry)` function; `fabric-core` calls every known
//! one once at startup. Tests build a fresh, empty registry instead of
//! relying on a hidden global (spec §9 "Global state").

use crate::adapter::Adapter;
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<Kind, Arc<dyn Adapter>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, adapter: Arc<dyn Adapter>) {
        self.adapters.write().insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: Kind) -> Result<Arc<dyn Adapter>, FabricError> {
        self.adapters
            .read()
            .get(&kind)
            .cloned()
            .ok_or_else(|| FabricError::UnknownKind(kind.to_string()))
    }

    pub fn registered_kinds(&self) -> Vec<Kind> {
        let mut kinds: Vec<_> = self.adapters.read().keys().copied().collect();
        kinds.sort();
        kinds
    }
}
