//! Cryptography used by secreta: public-key sealing of secret bundles, RSA key
//! handling and the symmetric vault that protects parameters at rest.

pub mod envelope;
pub mod keys;
pub mod vault;

pub use envelope::{CryptoError, Opener, RsaOpener, RsaSealer, Sealer};
pub use keys::{GeneratedKeyPair, KeyError};
pub use vault::{EncryptedSecret, SecretVault, SecretVaultError};
