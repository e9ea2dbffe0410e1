//! MySQL connection establishment (grounded on the source repository's
//! `mysql_async` + `default-rustls` pairing).

use fabric_types::connection::{ConnectionDescriptor, Decryptor};
use fabric_types::errors::FabricError;
use mysql_async::{Conn, OptsBuilder, SslOpts};

pub async fn open(descriptor: &ConnectionDescriptor, decryptor: &dyn Decryptor) -> Result<Conn, FabricError> {
    let password = decryptor.decrypt(&descriptor.tenant_id, &descriptor.auth.sealed_password)?;
    open_with_password(descriptor, &password).await
}

/// Opens a connection from an already-decrypted password. Used by
/// [`crate::replication::MysqlReplicationOps`] to open a dedicated binlog
/// connection long after the original `Decryptor` borrow from `Adapter::connect`
/// has expired (spec §4.5 `Connect` decrypts exactly once per connect call).
pub async fn open_with_password(descriptor: &ConnectionDescriptor, password: &str) -> Result<Conn, FabricError> {
    let mut opts = OptsBuilder::default()
        .ip_or_hostname(descriptor.host.clone())
        .user(Some(descriptor.auth.username.clone()))
        .pass(Some(password.to_string()));
    if let Some(port) = descriptor.port {
        opts = opts.tcp_port(port);
    }
    if let Some(db) = &descriptor.database_name {
        opts = opts.db_name(Some(db.clone()));
    }
    if descriptor.tls.mode != fabric_types::connection::TlsMode::Disabled {
        opts = opts.ssl_opts(Some(SslOpts::default()));
    }

    Conn::new(opts).await.map_err(|e| FabricError::ConnectionError {
        kind: "mysql".to_string(),
        endpoint: descriptor.endpoint(),
        cause: Box::new(e),
    })
}
