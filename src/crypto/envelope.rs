//! Public-key sealing of whole payloads.
//!
//! A random content key encrypts the payload with ChaCha20-Poly1305 and is
//! itself wrapped with RSA-OAEP (SHA-256). The artifact layout is:
//!
//! ```text
//! "SCR1" | u16 BE wrapped key length | wrapped key | nonce | ciphertext | tag
//! ```

use rand::rngs::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use super::vault::SecretVault;

const MAGIC: &[u8; 4] = b"SCR1";
const HEADER_LEN: usize = MAGIC.len() + 2;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// Encrypts a whole buffer for the holder of a private key.
pub trait Sealer: Send + Sync {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Decrypts what the matching [`Sealer`] produced.
pub trait Opener: Send + Sync {
    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

pub struct RsaSealer {
    key: RsaPublicKey,
}

impl RsaSealer {
    pub fn new(key: RsaPublicKey) -> Self {
        Self { key }
    }
}

impl Sealer for RsaSealer {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let content_key = SecretVault::generate_key();
        let vault = SecretVault::from_key_bytes(&content_key[..])
            .map_err(|e| CryptoError::Encryption(format!("{e}")))?;
        let wrapped = self
            .key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &content_key[..])
            .map_err(|e| CryptoError::Encryption(format!("{e}")))?;
        let wrapped_len = u16::try_from(wrapped.len())
            .map_err(|_| CryptoError::Encryption(format!("wrapped key of {} bytes is too large", wrapped.len())))?;
        let body = vault
            .seal(plaintext)
            .map_err(|e| CryptoError::Encryption(format!("{e}")))?;

        let mut sealed = Vec::with_capacity(HEADER_LEN + wrapped.len() + body.len());
        sealed.extend_from_slice(MAGIC);
        sealed.extend_from_slice(&wrapped_len.to_be_bytes());
        sealed.extend_from_slice(&wrapped);
        sealed.extend_from_slice(&body);
        Ok(sealed)
    }
}

pub struct RsaOpener {
    key: RsaPrivateKey,
}

impl RsaOpener {
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }
}

impl Opener for RsaOpener {
    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < HEADER_LEN || &sealed[..MAGIC.len()] != MAGIC {
            return Err(CryptoError::Decryption("not a sealed secrets artifact".to_string()));
        }
        let wrapped_len = u16::from_be_bytes([sealed[4], sealed[5]]) as usize;
        let rest = &sealed[HEADER_LEN..];
        if rest.len() < wrapped_len {
            return Err(CryptoError::Decryption("artifact truncated inside the wrapped key".to_string()));
        }
        let (wrapped, body) = rest.split_at(wrapped_len);

        let content_key = Zeroizing::new(
            self.key
                .decrypt(Oaep::new::<Sha256>(), wrapped)
                .map_err(|e| CryptoError::Decryption(format!("{e}")))?,
        );
        let vault = SecretVault::from_key_bytes(&content_key)
            .map_err(|e| CryptoError::Decryption(format!("{e}")))?;
        vault
            .open(body)
            .map_err(|e| CryptoError::Decryption(format!("{e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{Opener, RsaOpener, RsaSealer, Sealer};
    use crate::testing::{other_private_key, test_private_key};
    use rsa::RsaPublicKey;

    fn pair() -> (RsaSealer, RsaOpener) {
        let private = test_private_key().clone();
        (RsaSealer::new(RsaPublicKey::from(&private)), RsaOpener::new(private))
    }

    #[test]
    fn seals_payloads_larger_than_the_modulus() {
        let (sealer, opener) = pair();
        let payload = vec![b'x'; 4096];
        let sealed = sealer.seal(&payload).expect("seal");
        assert_eq!(&sealed[..4], b"SCR1");
        assert_eq!(opener.open(&sealed).expect("open"), payload);
    }

    #[test]
    fn every_seal_is_fresh() {
        let (sealer, _) = pair();
        assert_ne!(sealer.seal(b"same").unwrap(), sealer.seal(b"same").unwrap());
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let (sealer, _) = pair();
        let sealed = sealer.seal(b"{}").unwrap();
        let stranger = RsaOpener::new(other_private_key().clone());
        let err = stranger.open(&sealed).unwrap_err();
        assert!(format!("{err}").starts_with("decryption failed"));
    }

    #[test]
    fn corrupt_artifacts_fail_to_open() {
        let (sealer, opener) = pair();
        let mut sealed = sealer.seal(b"{\"a\":1}").unwrap();

        assert!(opener.open(b"garbage").is_err());
        assert!(opener.open(&sealed[..20]).is_err());

        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        let err = opener.open(&sealed).unwrap_err();
        assert!(format!("{err}").starts_with("decryption failed"));
    }
}
