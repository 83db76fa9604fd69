use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, instrument};

use super::resolve;
use crate::bundle::{decode_bundle, SecretMapping};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::keycache::PrivateKeyCache;
use crate::merge::merge;
use crate::pair::KeyPairId;
use crate::store::ParameterStore;
use crate::tree::loader::load_dir;

fn artifact_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern)
        .map_err(|e| Error::precondition(format!("Expected a valid artifact pattern ({pattern}): {e}")))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(e.path().display().to_string(), e.into_error()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn open_artifact(
    path: &Path,
    settings: &Settings,
    store: &dyn ParameterStore,
    cache: &PrivateKeyCache,
) -> Result<(KeyPairId, SecretMapping)> {
    let id = KeyPairId::from_artifact(path)?;
    let sealed = tokio::fs::read(path)
        .await
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    let opener = cache.get_or_fetch(store, &settings.namespace, &id).await?;
    let plaintext = zeroize::Zeroizing::new(opener.open(&sealed)?);
    let mapping = decode_bundle(&plaintext)?;
    debug!(%id, secrets = mapping.len(), "opened artifact");
    Ok((id, mapping))
}

/// Decrypts every artifact matching `pattern` and writes their secrets over
/// the marked leaves of `config`.
#[instrument(skip(config, settings, store, cache))]
pub async fn merge_secrets(
    config: &Value,
    pattern: &str,
    settings: &Settings,
    store: &dyn ParameterStore,
    cache: &PrivateKeyCache,
) -> Result<Value> {
    let files = artifact_files(pattern)?;
    debug!(artifacts = files.len(), "matched artifacts");
    let mappings = try_join_all(
        files
            .iter()
            .map(|path| open_artifact(path, settings, store, cache)),
    )
    .await?;
    Ok(merge(config, &settings.marker, &mappings)?)
}

/// Loads `config_dir` and returns it with every secret restored. The default
/// pattern is `*.<extension>` in the working directory.
#[instrument(skip(settings, store, cache))]
pub async fn decrypt(
    config_dir: &Path,
    pattern: Option<&str>,
    settings: &Settings,
    store: &dyn ParameterStore,
    cache: &PrivateKeyCache,
) -> Result<Value> {
    let config_dir = resolve(config_dir)?;
    if !config_dir.exists() {
        return Err(Error::precondition(format!(
            "Expected the configuration directory at {}",
            config_dir.display()
        )));
    }
    let config = load_dir(&config_dir)?;
    let pattern = match pattern {
        Some(pattern) => pattern.to_string(),
        None => format!("*.{}", settings.extension),
    };
    merge_secrets(&config, &pattern, settings, store, cache).await
}
