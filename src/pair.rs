//! Key pair identifiers. An identifier names the public key file, the sealed
//! artifact and the stored private key parameter, so it is restricted to
//! characters that are safe in all three places.

use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairIdError {
    #[error("Expected a pair ID for your keys.")]
    Empty,
    #[error("invalid pair ID {0:?}: only letters, digits, '_' and '-' are allowed")]
    InvalidCharacters(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPairId(String);

impl KeyPairId {
    pub fn new(id: impl Into<String>) -> Result<Self, PairIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PairIdError::Empty);
        }
        if !id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
            return Err(PairIdError::InvalidCharacters(id));
        }
        Ok(Self(id))
    }

    /// Derives the identifier from an artifact file name: everything before the
    /// first `.` of the base name.
    pub fn from_artifact(path: &Path) -> Result<Self, PairIdError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let stem = name.split('.').next().unwrap_or_default();
        Self::new(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for KeyPairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for KeyPairId {
    type Err = PairIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for KeyPairId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
