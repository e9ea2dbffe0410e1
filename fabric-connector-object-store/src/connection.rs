//! Builds an `object_store::ObjectStore` from a `ConnectionDescriptor`
//! (spec §4.5). `descriptor.host` carries the store's root URL (`file:///...`
//! or `s3://bucket`); credentials, when the scheme needs them, come from
//! `descriptor.auth`.

use fabric_types::connection::{ConnectionDescriptor, Decryptor};
use fabric_types::errors::FabricError;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;
use std::sync::Arc;
use url::Url;

pub async fn open(
    descriptor: &ConnectionDescriptor,
    decryptor: &dyn Decryptor,
) -> Result<(Arc<dyn ObjectStore>, StorePath), FabricError> {
    let secret = decryptor.decrypt(&descriptor.tenant_id, &descriptor.auth.sealed_password)?;
    open_with_secret(descriptor, &secret)
}

pub fn open_with_secret(
    descriptor: &ConnectionDescriptor,
    secret: &str,
) -> Result<(Arc<dyn ObjectStore>, StorePath), FabricError> {
    let url = Url::parse(&descriptor.host).map_err(|e| FabricError::ConnectionError {
        kind: "object_store".to_string(),
        endpoint: descriptor.endpoint(),
        cause: Box::new(e),
    })?;

    let mut options: Vec<(String, String)> = descriptor
        .extra
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !descriptor.auth.username.is_empty() {
        options.push(("aws_access_key_id".to_string(), descriptor.auth.username.clone()));
        options.push(("aws_secret_access_key".to_string(), secret.to_string()));
    }

    let (store, path) = object_store::parse_url_opts(&url, options)
        .map_err(|e| FabricError::ConnectionError {
            kind: "object_store".to_string(),
            endpoint: descriptor.endpoint(),
            cause: Box::new(e),
        })?;
    Ok((Arc::from(store), path))
}
