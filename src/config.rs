//! Runtime settings. Read from an optional JSON or TOML file (the CLI also
//! takes it from `SECRETA_SETTINGS`), then overridden from `SECRETA_*`
//! environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::crypto::keys::DEFAULT_KEY_BITS;
use crate::crypto::vault::SecretVault;
use crate::store::FileParameterStore;

pub const DEFAULT_MARKER: &str = "SECRETUM";
pub const DEFAULT_EXTENSION: &str = "secreta";
pub const DEFAULT_NAMESPACE: &str = "Secreta";
pub const DEFAULT_VAULT_KEY_ENV: &str = "SECRETA_VAULT_KEY";

const MARKER_ENV: &str = "SECRETA_MARKER";
const EXTENSION_ENV: &str = "SECRETA_EXTENSION";
const NAMESPACE_ENV: &str = "SECRETA_NAMESPACE";
const STORE_DIR_ENV: &str = "SECRETA_STORE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file unreadable: {0}")]
    Io(String),
    #[error("settings parse failed: {0}")]
    Parse(String),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("vault error: {0}")]
    Vault(String),
    #[error("no usable vault key source configured")]
    MissingKeySource,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct VaultConfig {
    /// Base64-encoded 32 byte key stored in an environment variable.
    pub key_env: Option<String>,
    /// Path to a file that contains the base64-encoded key.
    pub key_path: Option<PathBuf>,
    /// Environment variable that stores a local passphrase (for Argon2id KDF).
    pub passphrase_env: Option<String>,
    /// Base64-encoded salt used alongside the passphrase.
    pub salt_b64: Option<String>,
}

impl VaultConfig {
    fn is_unset(&self) -> bool {
        self.key_env.is_none()
            && self.key_path.is_none()
            && self.passphrase_env.is_none()
            && self.salt_b64.is_none()
    }

    /// Key sources are tried in order: `key_env`, `key_path`, then
    /// `passphrase_env` with `salt_b64`. With nothing configured the key is
    /// read from `SECRETA_VAULT_KEY`.
    pub fn build_vault(&self) -> Result<SecretVault, ConfigError> {
        if self.is_unset() {
            return SecretVault::from_env_var(DEFAULT_VAULT_KEY_ENV)
                .map_err(|e| ConfigError::Vault(format!("{e}")));
        }
        if let Some(var) = &self.key_env {
            return SecretVault::from_env_var(var).map_err(|e| ConfigError::Vault(format!("{e}")));
        }
        if let Some(path) = &self.key_path {
            return SecretVault::from_key_file(path).map_err(|e| ConfigError::Vault(format!("{e}")));
        }
        if let (Some(pass_env), Some(salt_b64)) = (&self.passphrase_env, &self.salt_b64) {
            let passphrase = zeroize::Zeroizing::new(
                std::env::var(pass_env).map_err(|e| ConfigError::Vault(format!("{pass_env}: {e}")))?,
            );
            let salt = STANDARD_NO_PAD
                .decode(salt_b64.trim_end_matches('=').as_bytes())
                .map_err(|e| ConfigError::Vault(format!("{e}")))?;
            return SecretVault::derive_from_passphrase(&passphrase, &salt)
                .map_err(|e| ConfigError::Vault(format!("{e}")));
        }
        Err(ConfigError::MissingKeySource)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding one JSON document per parameter.
    pub root: PathBuf,
    pub vault: VaultConfig,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            root: home_dir().join(".secreta").join("parameters"),
            vault: VaultConfig::default(),
        }
    }
}

impl StoreSettings {
    pub fn open(&self) -> Result<FileParameterStore, ConfigError> {
        Ok(FileParameterStore::new(&self.root, self.vault.build_vault()?))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Sentinel string that marks a configuration leaf as secret.
    pub marker: String,
    /// File extension of encrypted artifacts, without the dot.
    pub extension: String,
    /// First segment of private key parameter names.
    pub namespace: String,
    pub key_bits: usize,
    pub store: StoreSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            key_bits: DEFAULT_KEY_BITS,
            store: StoreSettings::default(),
        }
    }
}

impl Settings {
    /// Reads `path` when given, falls back to defaults otherwise, then
    /// applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(|name| std::env::var(name).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let settings = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&raw).map_err(|e| ConfigError::Parse(format!("{e}")))?,
            _ => serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(format!("{e}")))?,
        };
        debug!(path = %path.display(), "loaded settings file");
        Ok(settings)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(marker) = lookup(MARKER_ENV) {
            self.marker = marker;
        }
        if let Some(extension) = lookup(EXTENSION_ENV) {
            self.extension = extension;
        }
        if let Some(namespace) = lookup(NAMESPACE_ENV) {
            self.namespace = namespace;
        }
        if let Some(root) = lookup(STORE_DIR_ENV) {
            self.store.root = PathBuf::from(root);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marker.is_empty() {
            return Err(ConfigError::Invalid {
                name: "marker",
                reason: "must not be empty".to_string(),
            });
        }
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(ConfigError::Invalid {
                name: "extension",
                reason: format!("{:?} is not a plain file extension", self.extension),
            });
        }
        let namespace_ok = !self.namespace.is_empty()
            && self
                .namespace
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'));
        if !namespace_ok {
            return Err(ConfigError::Invalid {
                name: "namespace",
                reason: format!("{:?} must be letters, digits, '_' or '-'", self.namespace),
            });
        }
        Ok(())
    }
}

/// The user's home directory, or the working directory when there is none.
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
