//! The three operator commands. Each one validates its inputs, does its work
//! and returns a value the CLI can print; none of them prints on its own.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub mod decrypt;
pub mod encrypt;
pub mod generate;

pub use decrypt::{decrypt, merge_secrets};
pub use encrypt::{encrypt, EncryptOptions, EncryptOutcome};
pub use generate::{generate, provision, GenerateOutcome, ProvisionedKey};

/// Makes `path` absolute against the working directory.
pub(crate) fn resolve(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| Error::io("working directory", e))?;
    Ok(cwd.join(path))
}

/// `<dir>/<id>.pem`
pub(crate) fn public_key_file(dir: &Path, id: &crate::pair::KeyPairId) -> PathBuf {
    dir.join(format!("{id}.pem"))
}
