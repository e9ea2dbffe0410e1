//! Builds a `mongodb::Client` from a `ConnectionDescriptor` (spec §4.5).

use fabric_types::connection::{ConnectionDescriptor, Decryptor, TlsMode};
use fabric_types::errors::FabricError;
use mongodb::options::{ClientOptions, Credential, ServerAddress, Tls, TlsOptions};
use mongodb::Client;

pub async fn open(descriptor: &ConnectionDescriptor, decryptor: &dyn Decryptor) -> Result<Client, FabricError> {
    let password = decryptor.decrypt(&descriptor.tenant_id, &descriptor.auth.sealed_password)?;
    open_with_password(descriptor, &password).await
}

pub async fn open_with_password(descriptor: &ConnectionDescriptor, password: &str) -> Result<Client, FabricError> {
    let address = ServerAddress::Tcp {
        host: descriptor.host.clone(),
        port: descriptor.port,
    };
    let mut options = ClientOptions::builder().hosts(vec![address]).build();

    options.credential = Some(
        Credential::builder()
            .username(descriptor.auth.username.clone())
            .password(password.to_string())
            .build(),
    );

    if descriptor.tls.mode != TlsMode::Disabled {
        options.tls = Some(Tls::Enabled(TlsOptions::builder().build()));
    }

    if let Some(db) = &descriptor.database_name {
        options.default_database = Some(db.clone());
    }

    Client::with_options(options).map_err(|e| FabricError::ConnectionError {
        kind: "mongodb".to_string(),
        endpoint: descriptor.endpoint(),
        cause: Box::new(e),
    })
}
