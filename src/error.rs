use thiserror::Error;

use crate::bundle::BundleError;
use crate::config::ConfigError;
use crate::coverage::CoverageError;
use crate::crypto::envelope::CryptoError;
use crate::crypto::keys::KeyError;
use crate::merge::MergeError;
use crate::pair::PairIdError;
use crate::store::StoreError;
use crate::tree::loader::LoadError;

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// A required file or directory is missing, or one is in the way.
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Coverage(#[from] CoverageError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    PairId(#[from] PairIdError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Error::Precondition(message.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
