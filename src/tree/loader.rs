//! Builds one tree out of a directory of configuration files.
//! `default.*` is applied first, `local.*` last and every other file in name
//! order in between. Objects are merged key by key; any other value replaces
//! what came before it.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration directory not found at {0}")]
    Missing(PathBuf),
    #[error("unable to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("unable to parse {0}: {1}")]
    Parse(PathBuf, String),
}

const EXTENSIONS: [&str; 2] = ["json", "toml"];

fn rank(path: &Path) -> u8 {
    match path.file_stem().and_then(|stem| stem.to_str()) {
        Some("default") => 0,
        Some("local") => 2,
        _ => 1,
    }
}

fn load_order(a: &PathBuf, b: &PathBuf) -> Ordering {
    rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
}

/// Loads and merges every JSON and TOML file directly inside `dir`. A
/// directory without configuration files yields an empty object.
pub fn load_dir(dir: &Path) -> Result<Value, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::Missing(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|e| LoadError::Read(dir.to_path_buf(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| LoadError::Read(dir.to_path_buf(), e))?.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if supported && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(load_order);

    let mut merged = Value::Object(Map::new());
    for file in &files {
        let layer = load_file(file)?;
        deep_merge(&mut merged, layer);
    }
    debug!(dir = %dir.display(), files = files.len(), "loaded configuration directory");
    Ok(merged)
}

pub fn load_file(path: &Path) -> Result<Value, LoadError> {
    let raw = fs::read_to_string(path).map_err(|e| LoadError::Read(path.to_path_buf(), e))?;
    let is_toml = path.extension().map(|ext| ext == "toml").unwrap_or(false);
    if is_toml {
        let table: toml::Table =
            toml::from_str(&raw).map_err(|e| LoadError::Parse(path.to_path_buf(), format!("{e}")))?;
        serde_json::to_value(table).map_err(|e| LoadError::Parse(path.to_path_buf(), format!("{e}")))
    } else {
        serde_json::from_str(&raw).map_err(|e| LoadError::Parse(path.to_path_buf(), format!("{e}")))
    }
}

/// Merges `layer` into `base`: objects key by key, everything else replaced.
pub fn deep_merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::{deep_merge, load_dir, LoadError};
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn merges_files_in_load_order() {
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join("local.json"), r#"{"db": {"host": "localhost"}}"#).unwrap();
        fs::write(
            dir.path().join("default.json"),
            r#"{"db": {"host": "db.internal", "port": 5984}, "tags": ["a", "b"]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("production.toml"),
            "tags = [\"prod\"]\n[db]\nport = 6984\npassword = \"SECRETUM\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let tree = load_dir(dir.path()).expect("directory loads");
        assert_eq!(
            tree,
            json!({
                "db": {"host": "localhost", "port": 6984, "password": "SECRETUM"},
                "tags": ["prod"],
            })
        );
    }

    #[test]
    fn empty_directory_is_an_empty_object() {
        let dir = tempdir().expect("temp dir");
        assert_eq!(load_dir(dir.path()).expect("loads"), json!({}));
    }

    #[test]
    fn reports_missing_directories_and_bad_files() {
        let dir = tempdir().expect("temp dir");
        let missing = dir.path().join("nope");
        assert!(matches!(load_dir(&missing), Err(LoadError::Missing(_))));

        fs::write(dir.path().join("default.json"), "{ not json").unwrap();
        let err = load_dir(dir.path()).unwrap_err();
        assert!(format!("{err}").contains("unable to parse"));
    }

    #[test]
    fn scalars_replace_objects() {
        let mut base = json!({"a": {"b": 1}});
        deep_merge(&mut base, json!({"a": "flat"}));
        assert_eq!(base, json!({"a": "flat"}));
    }
}
