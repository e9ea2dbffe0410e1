//! `ConnectionDescriptor` and `LiveConnection` records (spec §3), plus the
//! `Decryptor` collaborator contract injected from outside the core.

use crate::kind::Kind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    Disabled,
    Preferred,
    Required,
    VerifyCa,
    VerifyFull,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TlsConfig {
    pub mode: TlsMode,
    pub ca_cert_ref: Option<String>,
    pub client_cert_ref: Option<String>,
    pub client_key_ref: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            mode: TlsMode::Preferred,
            ca_cert_ref: None,
            client_cert_ref: None,
            client_key_ref: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    /// Opaque, sealed at rest. Only a `Decryptor` can turn this back into a
    /// usable credential, and only the owning tenant's decryptor may do so.
    pub sealed_password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub id: String,
    pub kind: Kind,
    pub host: String,
    pub port: Option<u16>,
    pub auth: AuthConfig,
    pub tls: TlsConfig,
    pub database_name: Option<String>,
    pub tenant_id: String,
    pub extra: IndexMap<String, String>,
}

impl ConnectionDescriptor {
    pub fn endpoint(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

/// Turns a sealed credential into plaintext, scoped to the tenant that owns
/// it. Implemented outside the core (spec §6 Environment); the core calls it
/// exactly once per `Connect` (spec §4.5).
pub trait Decryptor: Send + Sync {
    fn decrypt(&self, tenant_id: &str, sealed: &str) -> Result<String, crate::errors::FabricError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Failed,
    Closing,
    Closed,
}

/// Exclusively owned by the Connection Manager (C6); its lifetime ends
/// exactly at `Close()` (spec §3 Lifecycles).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiveConnection {
    pub id: String,
    pub kind: Kind,
    pub state: ConnectionState,
    #[serde(with = "systemtime_serde")]
    pub created_at: SystemTime,
    #[serde(with = "systemtime_serde_opt")]
    pub last_ping_at: Option<SystemTime>,
}

impl LiveConnection {
    pub fn connecting(id: impl Into<String>, kind: Kind, now: SystemTime) -> Self {
        Self {
            id: id.into(),
            kind,
            state: ConnectionState::Connecting,
            created_at: now,
            last_ping_at: None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

mod systemtime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let dur = t.duration_since(UNIX_EPOCH).unwrap_or_default();
        dur.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs_f64(secs))
    }
}

mod systemtime_serde_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(t: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
        let secs = t.map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64());
        secs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SystemTime>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs.map(|secs| UNIX_EPOCH + std::time::Duration::from_secs_f64(secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_port_when_present() {
        let descriptor = ConnectionDescriptor {
            id: "c1".into(),
            kind: Kind::Postgres,
            host: "db.internal".into(),
            port: Some(5432),
            auth: AuthConfig {
                username: "svc".into(),
                sealed_password: "sealed:abc".into(),
            },
            tls: TlsConfig::default(),
            database_name: Some("app".into()),
            tenant_id: "tenant-1".into(),
            extra: IndexMap::new(),
        };
        assert_eq!(descriptor.endpoint(), "db.internal:5432");
    }
}
