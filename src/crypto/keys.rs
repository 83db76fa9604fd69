//! RSA key material: PEM parsing, generation and fingerprints.

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

pub const DEFAULT_KEY_BITS: usize = 2048;
pub const MIN_KEY_BITS: usize = 1024;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid public key PEM: {0}")]
    PublicPem(String),
    #[error("invalid private key PEM: {0}")]
    PrivatePem(String),
    #[error("key size of {0} bits is below the {MIN_KEY_BITS} bit minimum")]
    TooSmall(usize),
    #[error("key generation failed: {0}")]
    Generation(String),
    #[error("key encoding failed: {0}")]
    Encoding(String),
}

/// A freshly generated pair, already serialized for storage and hand-out.
pub struct GeneratedKeyPair {
    /// PKCS#1 `RSA PRIVATE KEY` PEM.
    pub private_pem: Zeroizing<String>,
    /// SPKI `PUBLIC KEY` PEM.
    pub public_pem: String,
    pub fingerprint: String,
}

/// Accepts SPKI (`PUBLIC KEY`) and PKCS#1 (`RSA PUBLIC KEY`) PEM.
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey, KeyError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|spki_err| {
            RsaPublicKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| format!("{spki_err}; {pkcs1_err}"))
        })
        .map_err(KeyError::PublicPem)
}

/// Accepts PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) PEM.
pub fn private_key_from_pem(pem: &str) -> Result<RsaPrivateKey, KeyError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|pkcs1_err| {
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|pkcs8_err| format!("{pkcs1_err}; {pkcs8_err}"))
        })
        .map_err(KeyError::PrivatePem)
}

/// Hex SHA-256 of the SPKI DER encoding, stable across PEM flavours.
pub fn fingerprint(key: &RsaPublicKey) -> Result<String, KeyError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| KeyError::Encoding(format!("{e}")))?;
    let digest = Sha256::digest(der.as_bytes());
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Generates an RSA pair with public exponent 65537.
pub fn generate_key_pair(bits: usize) -> Result<GeneratedKeyPair, KeyError> {
    if bits < MIN_KEY_BITS {
        return Err(KeyError::TooSmall(bits));
    }
    let private_key =
        RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| KeyError::Generation(format!("{e}")))?;
    encode_key_pair(&private_key)
}

pub fn encode_key_pair(private_key: &RsaPrivateKey) -> Result<GeneratedKeyPair, KeyError> {
    let public_key = RsaPublicKey::from(private_key);
    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encoding(format!("{e}")))?;
    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encoding(format!("{e}")))?;
    let fingerprint = fingerprint(&public_key)?;
    Ok(GeneratedKeyPair {
        private_pem,
        public_pem,
        fingerprint,
    })
}
