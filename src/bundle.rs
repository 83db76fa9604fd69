//! Secret mappings and their plaintext wire form.
//! A bundle is a flat JSON object keyed by canonical path strings; each value is
//! the untouched subtree taken from the secrets tree.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tree::{value_at, Path};

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("internal error: no value at {0} although it passed the coverage check")]
    Unresolved(Path),
    #[error("bundle encoding failed: {0}")]
    Encode(String),
    #[error("bundle decoding failed: {0}")]
    Decode(String),
}

/// Plaintext secrets keyed by the path they belong at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretMapping(BTreeMap<Path, Value>);

impl SecretMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.0.get(path)
    }

    /// Returns false, leaving the mapping untouched, when `path` is present.
    pub fn insert_new(&mut self, path: Path, value: Value) -> bool {
        match self.0.entry(path) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(Path, Value)> for SecretMapping {
    fn from_iter<I: IntoIterator<Item = (Path, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for SecretMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (path, value) in &self.0 {
            map.serialize_entry(path, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SecretMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = SecretMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of path strings to secret values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SecretMapping, A::Error> {
                let mut mapping = SecretMapping::new();
                while let Some((path, value)) = access.next_entry::<Path, Value>()? {
                    let rendered = path.to_string();
                    if !mapping.insert_new(path, value) {
                        return Err(de::Error::custom(format!("duplicate secret for {rendered}")));
                    }
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

/// Copies the value at every path out of `secrets`. Callers run the coverage
/// check first, so an unresolved path is an internal error.
pub fn extract(secrets: &Value, paths: &[Path]) -> Result<SecretMapping, BundleError> {
    paths
        .iter()
        .map(|path| {
            value_at(secrets, path)
                .cloned()
                .map(|value| (path.clone(), value))
                .ok_or_else(|| BundleError::Unresolved(path.clone()))
        })
        .collect()
}

pub fn encode_bundle(mapping: &SecretMapping) -> Result<Vec<u8>, BundleError> {
    serde_json::to_vec(mapping).map_err(|e| BundleError::Encode(format!("{e}")))
}

pub fn decode_bundle(bytes: &[u8]) -> Result<SecretMapping, BundleError> {
    serde_json::from_slice(bytes).map_err(|e| BundleError::Decode(format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::{decode_bundle, encode_bundle, extract, BundleError, SecretMapping};
    use crate::tree::{list_paths, select_marked, Path};
    use serde_json::json;

    fn path(text: &str) -> Path {
        text.parse().expect("valid path")
    }

    #[test]
    fn extracts_exactly_the_wanted_paths() {
        let config = json!({"db": {"password": "SECRETUM", "host": "x"}, "api": ["SECRETUM"]});
        let secrets = json!({
            "db": {"password": "hunter2", "user": "unused"},
            "api": ["token"],
            "extra": "dropped",
        });
        let wanted = select_marked(&config, "SECRETUM");
        let mapping = extract(&secrets, &wanted).expect("all paths resolve");

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get(&path("db.password")), Some(&json!("hunter2")));
        assert_eq!(mapping.get(&path("api[0]")), Some(&json!("token")));
        assert_eq!(mapping.get(&path("extra")), None);
    }

    #[test]
    fn extracts_structured_values_whole() {
        let secrets = json!({"ciphertext": {"k": "v", "list": [1, 2]}});
        let mapping = extract(&secrets, &[path("ciphertext")]).expect("resolves");
        assert_eq!(mapping.get(&path("ciphertext")), Some(&json!({"k": "v", "list": [1, 2]})));
    }

    #[test]
    fn unresolved_paths_are_reported() {
        let err = extract(&json!({}), &[path("a.b")]).unwrap_err();
        assert!(matches!(err, BundleError::Unresolved(p) if p == path("a.b")));
    }

    #[test]
    fn encodes_as_flat_object_keyed_by_path() {
        let mapping: SecretMapping = [
            (path("Customer.credit.initialLimit"), json!(100)),
            (Path::from(vec!["odd.key".into(), 0usize.into()]), json!(["a", "b"])),
        ]
        .into_iter()
        .collect();
        let bytes = encode_bundle(&mapping).expect("encodes");
        let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            raw,
            json!({"Customer.credit.initialLimit": 100, "[\"odd.key\"][0]": ["a", "b"]})
        );
        assert_eq!(decode_bundle(&bytes).expect("decodes"), mapping);
    }

    #[test]
    fn root_path_survives_the_wire() {
        let secrets = json!({"k": [true, null]});
        let mapping = extract(&secrets, &list_paths(&json!("SECRETUM"))).expect("root resolves");
        let decoded = decode_bundle(&encode_bundle(&mapping).unwrap()).unwrap();
        assert_eq!(decoded.get(&Path::root()), Some(&secrets));
    }

    #[test]
    fn rejects_malformed_bundles() {
        assert!(matches!(decode_bundle(b"[1, 2]"), Err(BundleError::Decode(_))));
        assert!(matches!(decode_bundle(b"{\"a..b\": 1}"), Err(BundleError::Decode(_))));
        let err = decode_bundle(br#"{"a": 1, "[\"a\"]": 2}"#).unwrap_err();
        assert!(format!("{err}").contains("duplicate secret for a"));
    }
}
