//! Shared fixtures for unit tests. RSA generation is slow in debug builds, so
//! each test binary generates its keys once.

use std::sync::OnceLock;

use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

const TEST_KEY_BITS: usize = 1024;

static TEST_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
static OTHER_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();

fn generate() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS).expect("test key generation")
}

pub fn test_private_key() -> &'static RsaPrivateKey {
    TEST_KEY.get_or_init(generate)
}

/// A second key that does not match [`test_private_key`].
pub fn other_private_key() -> &'static RsaPrivateKey {
    OTHER_KEY.get_or_init(generate)
}
