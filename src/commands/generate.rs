use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use super::{public_key_file, resolve};
use crate::config::{home_dir, Settings};
use crate::crypto::keys::{generate_key_pair, KeyError};
use crate::error::{Error, Result};
use crate::pair::KeyPairId;
use crate::store::{ParameterStore, PutParameter};

/// What the caller gets back from provisioning: only public material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedKey {
    pub public_pem: String,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOutcome {
    pub length: usize,
    pub filename: PathBuf,
    pub fingerprint: String,
}

/// Creates a key pair, parks the private key under
/// `/<namespace>/privateKey/<id>` and hands back the public key. An existing
/// private key for `id` is never replaced.
#[instrument(skip(store))]
pub async fn provision(
    store: &dyn ParameterStore,
    namespace: &str,
    id: &KeyPairId,
    bits: usize,
) -> Result<ProvisionedKey> {
    let pair = tokio::task::spawn_blocking(move || generate_key_pair(bits))
        .await
        .map_err(|e| KeyError::Generation(format!("{e}")))??;

    let request = PutParameter::private_key(namespace, id, pair.private_pem)?;
    store.put_parameter(request).await?;
    info!(fingerprint = %pair.fingerprint, "stored private key");

    Ok(ProvisionedKey {
        public_pem: pair.public_pem,
        fingerprint: pair.fingerprint,
    })
}

/// Provisions a key pair and writes the public key to `<key_dir>/<id>.pem`.
#[instrument(skip(settings, store))]
pub async fn generate(
    id: &KeyPairId,
    key_dir: Option<&Path>,
    settings: &Settings,
    store: &dyn ParameterStore,
) -> Result<GenerateOutcome> {
    let key_dir = match key_dir {
        Some(dir) => resolve(dir)?,
        None => home_dir(),
    };
    if !key_dir.is_dir() {
        return Err(Error::precondition(format!(
            "Expected a directory for the public key at {}",
            key_dir.display()
        )));
    }

    let provisioned = provision(store, &settings.namespace, id, settings.key_bits).await?;
    let filename = public_key_file(&key_dir, id);
    tokio::fs::write(&filename, provisioned.public_pem.as_bytes())
        .await
        .map_err(|e| Error::io(filename.display().to_string(), e))?;

    Ok(GenerateOutcome {
        length: provisioned.public_pem.len(),
        filename,
        fingerprint: provisioned.fingerprint,
    })
}
