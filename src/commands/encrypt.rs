use std::fmt::{self, Display};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use super::{public_key_file, resolve};
use crate::bundle::{encode_bundle, extract};
use crate::config::{home_dir, Settings};
use crate::coverage::ensure_covered;
use crate::crypto::envelope::{RsaSealer, Sealer};
use crate::crypto::keys::public_key_from_pem;
use crate::error::{Error, Result};
use crate::pair::KeyPairId;
use crate::persist::write_file;
use crate::tree::loader::load_dir;
use crate::tree::{list_paths, select_marked};

#[derive(Debug, Clone, Default)]
pub struct EncryptOptions {
    /// Directory holding `<id>.pem`. Defaults to the home directory.
    pub key_dir: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    pub secrets_dir: Option<PathBuf>,
    /// Where the artifact goes. Defaults to the key directory.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptOutcome {
    /// The configuration holds no marker, so no artifact was written.
    NothingToProtect,
    Written { length: usize, filename: PathBuf },
}

impl Display for EncryptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptOutcome::NothingToProtect => f.write_str("No secrets to protect."),
            EncryptOutcome::Written { length, filename } => {
                write!(f, "{length} bytes saved to {}", filename.display())
            }
        }
    }
}

fn required_dir(dir: Option<&Path>, what: &str) -> Result<PathBuf> {
    let dir = dir.ok_or_else(|| Error::precondition(format!("Expected the {what}")))?;
    let dir = resolve(dir)?;
    if !dir.exists() {
        return Err(Error::precondition(format!("Expected the {what} at {}", dir.display())));
    }
    Ok(dir)
}

/// Seals the plaintext of every marked configuration leaf into
/// `<output>/<id>.<extension>`.
#[instrument(skip_all, fields(%id))]
pub fn encrypt(id: &KeyPairId, options: &EncryptOptions, settings: &Settings) -> Result<EncryptOutcome> {
    let key_dir = match &options.key_dir {
        Some(dir) => resolve(dir)?,
        None => home_dir(),
    };
    let key_file = public_key_file(&key_dir, id);
    if !key_file.exists() {
        return Err(Error::precondition(format!("Expected a public key at {}", key_file.display())));
    }
    let pem = fs::read_to_string(&key_file).map_err(|e| Error::io(key_file.display().to_string(), e))?;
    let sealer = RsaSealer::new(public_key_from_pem(&pem)?);

    let output_dir = match &options.output_dir {
        Some(dir) => resolve(dir)?,
        None => key_dir.clone(),
    };
    if !output_dir.exists() {
        return Err(Error::precondition(format!(
            "Expected a directory for the encrypted secrets at {}",
            output_dir.display()
        )));
    }
    let artifact = output_dir.join(format!("{id}.{}", settings.extension));
    if artifact.exists() {
        return Err(Error::precondition(format!("Expected no file at {}", artifact.display())));
    }

    let config_dir = required_dir(options.config_dir.as_deref(), "configuration directory")?;
    let secrets_dir = required_dir(options.secrets_dir.as_deref(), "secrets configuration directory")?;
    info!(
        key_dir = %key_dir.display(),
        config = %config_dir.display(),
        secrets = %secrets_dir.display(),
        output = %output_dir.display(),
        "encrypting secrets"
    );

    let config = load_dir(&config_dir)?;
    let wanted = select_marked(&config, &settings.marker);
    if wanted.is_empty() {
        debug!("configuration has no marked leaves");
        return Ok(EncryptOutcome::NothingToProtect);
    }

    let secrets = load_dir(&secrets_dir)?;
    ensure_covered(&wanted, &list_paths(&secrets))?;

    let mapping = extract(&secrets, &wanted)?;
    let plaintext = zeroize::Zeroizing::new(encode_bundle(&mapping)?);
    let sealed = sealer.seal(&plaintext)?;
    write_new(&artifact, &sealed)?;

    debug!(secrets = mapping.len(), bytes = sealed.len(), "artifact written");
    Ok(EncryptOutcome::Written {
        length: sealed.len(),
        filename: artifact,
    })
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    write_file(path, bytes, false).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => Error::precondition(format!("Expected no file at {}", path.display())),
        _ => Error::io(path.display().to_string(), e),
    })
}
