//! Postgres connection establishment, including TLS negotiation (grounded on
//! the source repository's `connection::helper` + `tokio-postgres-rustls`
//! pairing).

use fabric_types::connection::{ConnectionDescriptor, Decryptor, TlsMode};
use fabric_types::errors::FabricError;
use std::sync::Arc;
use tokio_postgres::Client;

fn tls_connector(descriptor: &ConnectionDescriptor) -> Result<tokio_postgres_rustls::MakeRustlsConnect, FabricError> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs()
        .map_err(|e| FabricError::internal(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    {
        let _ = roots.add(&rustls::Certificate(cert.0));
    }
    let mut config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();
    if matches!(descriptor.tls.mode, TlsMode::Required | TlsMode::Preferred) {
        config.dangerous().set_certificate_verifier(Arc::new(AcceptAnyServer));
    }
    Ok(tokio_postgres_rustls::MakeRustlsConnect::new(config))
}

struct AcceptAnyServer;

impl rustls::client::ServerCertVerifier for AcceptAnyServer {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::Certificate,
        _intermediates: &[rustls::Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}

pub fn connect_config(descriptor: &ConnectionDescriptor, password: &str) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    config.host(&descriptor.host);
    if let Some(port) = descriptor.port {
        config.port(port);
    }
    config.user(&descriptor.auth.username);
    config.password(password);
    if let Some(db) = &descriptor.database_name {
        config.dbname(db);
    }
    config
}

/// Opens a Postgres client connection, decrypting the sealed credential
/// through the injected [`Decryptor`] exactly once (spec §4.5 `Connect`).
pub async fn open(
    descriptor: &ConnectionDescriptor,
    decryptor: &dyn Decryptor,
) -> Result<Client, FabricError> {
    let password = decryptor.decrypt(&descriptor.tenant_id, &descriptor.auth.sealed_password)?;
    let config = connect_config(descriptor, &password);

    if descriptor.tls.mode == TlsMode::Disabled {
        let (client, connection) = config.connect(tokio_postgres::NoTls).await.map_err(|e| {
            FabricError::ConnectionError {
                kind: "postgres".to_string(),
                endpoint: descriptor.endpoint(),
                cause: Box::new(e),
            }
        })?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection task ended");
            }
        });
        Ok(client)
    } else {
        let connector = tls_connector(descriptor)?;
        let (client, connection) = config.connect(connector).await.map_err(|e| FabricError::ConnectionError {
            kind: "postgres".to_string(),
            endpoint: descriptor.endpoint(),
            cause: Box::new(e),
        })?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection task ended");
            }
        });
        Ok(client)
    }
}
