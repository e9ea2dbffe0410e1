//! C4 — Adapter Framework: the abstract contract every database driver must
//! satisfy, plus the process-wide adapter registry (spec §4.4, §4.6).

pub mod adapter;
pub mod context;
pub mod registry;
pub mod test_util;
pub mod transform;
pub mod unsupported;

pub use adapter::{Adapter, Connection, DataOps, InstanceConnection, MetadataOps, ReplicationOps, SchemaOps};
pub use context::OpContext;
pub use registry::AdapterRegistry;
