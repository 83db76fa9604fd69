//! Writes decrypted secrets back into a configuration tree.
//! Every marker left in the target must be answered by exactly one of the
//! supplied mappings; the target itself is never modified.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::bundle::SecretMapping;
use crate::pair::KeyPairId;
use crate::tree::{select_marked, set_at, Path, TreeError};

#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("Expected a secret for {} (consulted: {})", join(.paths), describe_consulted(.consulted))]
    Missing {
        paths: Vec<Path>,
        consulted: Vec<KeyPairId>,
    },
    #[error("Expected one secret per path, but {} came from more than one artifact ({})", join(.paths), join(.ids))]
    Collision {
        paths: Vec<Path>,
        ids: Vec<KeyPairId>,
    },
    #[error(transparent)]
    Tree(#[from] TreeError),
}

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn describe_consulted(ids: &[KeyPairId]) -> String {
    if ids.is_empty() {
        "no artifacts".to_string()
    } else {
        join(ids)
    }
}

/// Replaces every `marker` leaf of `target` with the secret stored for its
/// path and returns the enriched copy.
pub fn merge(
    target: &Value,
    marker: &str,
    mappings: &[(KeyPairId, SecretMapping)],
) -> Result<Value, MergeError> {
    let index = index_mappings(mappings)?;

    let wanted = select_marked(target, marker);
    let missing: Vec<Path> = wanted
        .iter()
        .filter(|path| !index.contains_key(path))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(MergeError::Missing {
            paths: missing,
            consulted: mappings.iter().map(|(id, _)| id.clone()).collect(),
        });
    }

    let mut merged = target.clone();
    for path in &wanted {
        if let Some((_, value)) = index.get(path) {
            set_at(&mut merged, path, (*value).clone())?;
        }
    }
    debug!(secrets = wanted.len(), artifacts = mappings.len(), "merged secrets");
    Ok(merged)
}

fn index_mappings(
    mappings: &[(KeyPairId, SecretMapping)],
) -> Result<BTreeMap<&Path, (&KeyPairId, &Value)>, MergeError> {
    let mut index: BTreeMap<&Path, (&KeyPairId, &Value)> = BTreeMap::new();
    let mut collisions: BTreeMap<&Path, Vec<KeyPairId>> = BTreeMap::new();

    for (id, mapping) in mappings {
        for (path, value) in mapping.iter() {
            match index.get(path) {
                Some((first, _)) => {
                    let ids = collisions.entry(path).or_insert_with(|| vec![(*first).clone()]);
                    ids.push(id.clone());
                }
                None => {
                    index.insert(path, (id, value));
                }
            }
        }
    }

    if collisions.is_empty() {
        return Ok(index);
    }
    let mut ids: Vec<KeyPairId> = collisions.values().flatten().cloned().collect();
    ids.sort();
    ids.dedup();
    Err(MergeError::Collision {
        paths: collisions.into_keys().cloned().collect(),
        ids,
    })
}
