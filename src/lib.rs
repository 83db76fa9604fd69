//! Keeps configuration secrets out of the configuration.
//!
//! Leaves marked with a sentinel string are looked up in a separate secrets
//! tree, sealed for the holder of an RSA private key and written to an
//! artifact. At runtime the artifacts are opened with keys fetched from a
//! parameter store and the plaintext values are put back where the markers
//! were.

pub mod bundle;
pub mod commands;
pub mod config;
pub mod coverage;
pub mod crypto;
pub mod error;
pub mod keycache;
pub mod merge;
pub mod pair;
mod persist;
pub mod store;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
