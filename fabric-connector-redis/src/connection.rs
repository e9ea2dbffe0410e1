//! Builds a `redis::aio::ConnectionManager` from a `ConnectionDescriptor`
//! (spec §4.5). The manager reconnects transparently on drop, so callers
//! never see a dead socket the way a plain `redis::aio::Connection` would.

use fabric_types::connection::{ConnectionDescriptor, Decryptor, TlsMode};
use fabric_types::errors::FabricError;
use redis::aio::ConnectionManager;
use redis::Client;

pub async fn open(descriptor: &ConnectionDescriptor, decryptor: &dyn Decryptor) -> Result<ConnectionManager, FabricError> {
    let password = decryptor.decrypt(&descriptor.tenant_id, &descriptor.auth.sealed_password)?;
    open_with_password(descriptor, &password).await
}

pub async fn open_with_password(descriptor: &ConnectionDescriptor, password: &str) -> Result<ConnectionManager, FabricError> {
    let scheme = if descriptor.tls.mode != TlsMode::Disabled { "rediss" } else { "redis" };
    let port = descriptor.port.unwrap_or(6379);
    let db = descriptor
        .database_name
        .as_deref()
        .and_then(|s| s.parse::<u8>().ok())
        .unwrap_or(0);
    let userinfo = if password.is_empty() {
        String::new()
    } else {
        format!("{}:{}@", descriptor.auth.username, password)
    };
    let url = format!("{scheme}://{userinfo}{}:{port}/{db}", descriptor.host);

    let client = Client::open(url).map_err(|e| FabricError::ConnectionError {
        kind: "redis".to_string(),
        endpoint: descriptor.endpoint(),
        cause: Box::new(e),
    })?;
    client.get_tokio_connection_manager().await.map_err(|e| FabricError::ConnectionError {
        kind: "redis".to_string(),
        endpoint: descriptor.endpoint(),
        cause: Box::new(e),
    })
}
