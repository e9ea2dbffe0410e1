//! Recognized configuration options and their defaults, YAML
//! deserializable the same way every other model struct in this crate is.

use serde::{Deserialize, Serialize};

fn default_batch_size() -> u32 {
    1000
}
fn default_parallel_workers() -> u32 {
    4
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    200
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            parallel_workers: default_parallel_workers(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl SnapshotConfig {
    pub const MAX_BATCH_SIZE: u32 = 10_000;
    pub const MAX_PARALLEL_WORKERS: u32 = 32;

    pub fn validate(&self) -> Result<(), crate::errors::FabricError> {
        if self.batch_size == 0 || self.batch_size > Self::MAX_BATCH_SIZE {
            return Err(crate::errors::FabricError::ConfigurationError {
                kind: "snapshot".into(),
                field: "batch_size".into(),
                reason: format!("must be in 1..={}", Self::MAX_BATCH_SIZE),
            });
        }
        if self.parallel_workers == 0 || self.parallel_workers > Self::MAX_PARALLEL_WORKERS {
            return Err(crate::errors::FabricError::ConfigurationError {
                kind: "snapshot".into(),
                field: "parallel_workers".into(),
                reason: format!("must be in 1..={}", Self::MAX_PARALLEL_WORKERS),
            });
        }
        Ok(())
    }
}

fn default_commit_every_events() -> u32 {
    1000
}
fn default_commit_every_ms() -> u64 {
    5000
}
fn default_apply_transactional() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CdcConfig {
    #[serde(default = "default_commit_every_events")]
    pub position_commit_every_events: u32,
    #[serde(default = "default_commit_every_ms")]
    pub position_commit_every_ms: u64,
    #[serde(default = "default_apply_transactional")]
    pub apply_transactional: bool,
    /// If true, an applied-event failure demotes the relationship to
    /// `error` immediately instead of skipping the event and continuing
    /// (spec §7 propagation policy).
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for CdcConfig {
    fn default() -> Self {
        Self {
            position_commit_every_events: default_commit_every_events(),
            position_commit_every_ms: default_commit_every_ms(),
            apply_transactional: default_apply_transactional(),
            fail_fast: false,
        }
    }
}

fn default_ping_interval_ms() -> u64 {
    30_000
}
fn default_connect_timeout_ms() -> u64 {
    30_000
}
fn default_ping_timeout_ms() -> u64 {
    5_000
}
fn default_discover_timeout_ms() -> u64 {
    60_000
}
fn default_data_op_timeout_ms() -> u64 {
    30_000
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
    #[serde(default = "default_discover_timeout_ms")]
    pub discover_timeout_ms: u64,
    #[serde(default = "default_data_op_timeout_ms")]
    pub data_op_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            ping_timeout_ms: default_ping_timeout_ms(),
            discover_timeout_ms: default_discover_timeout_ms(),
            data_op_timeout_ms: default_data_op_timeout_ms(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FabricConfig {
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub cdc: CdcConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = FabricConfig::default();
        assert_eq!(config.snapshot.batch_size, 1000);
        assert_eq!(config.snapshot.parallel_workers, 4);
        assert_eq!(config.snapshot.max_retries, 3);
        assert_eq!(config.cdc.position_commit_every_events, 1000);
        assert_eq!(config.cdc.position_commit_every_ms, 5000);
        assert!(config.cdc.apply_transactional);
        assert_eq!(config.connection.ping_interval_ms, 30_000);
        assert_eq!(config.connection.connect_timeout_ms, 30_000);
    }

    #[test]
    fn deserializes_partial_yaml_with_defaults() {
        let yaml = "snapshot:\n  batch_size: 500\n";
        let config: FabricConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.snapshot.batch_size, 500);
        assert_eq!(config.snapshot.parallel_workers, 4);
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = "snapshot:\n  batch_size: 500\n  typo_field: 1\n";
        let result: Result<FabricConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_batch_size() {
        let config = SnapshotConfig {
            batch_size: 50_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
