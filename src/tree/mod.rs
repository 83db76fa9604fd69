//! Configuration trees and the walks over them.
//! A tree is a `serde_json::Value`; leaves are scalars, empty arrays and empty
//! objects. Everything else is descended into in document order.

pub mod loader;
pub mod path;

use serde_json::Value;
use thiserror::Error;

pub use self::path::{Path, PathParseError, Segment};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("no value at {0}")]
    Unresolved(Path),
}

/// Returns the path of every leaf whose value satisfies `predicate`, depth
/// first, in document order.
pub fn select_paths<F>(tree: &Value, mut predicate: F) -> Vec<Path>
where
    F: FnMut(&Value) -> bool,
{
    let mut found = Vec::new();
    let mut prefix = Vec::new();
    walk(tree, &mut prefix, &mut predicate, &mut found);
    found
}

fn walk<F>(node: &Value, prefix: &mut Vec<Segment>, predicate: &mut F, found: &mut Vec<Path>)
where
    F: FnMut(&Value) -> bool,
{
    match node {
        Value::Array(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                prefix.push(Segment::Index(index));
                walk(item, prefix, predicate, found);
                prefix.pop();
            }
        }
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                prefix.push(Segment::Key(key.clone()));
                walk(child, prefix, predicate, found);
                prefix.pop();
            }
        }
        leaf => {
            if predicate(leaf) {
                found.push(Path::from(prefix.clone()));
            }
        }
    }
}

/// Paths of every leaf holding exactly the `marker` string.
pub fn select_marked(tree: &Value, marker: &str) -> Vec<Path> {
    select_paths(tree, |leaf| is_marker(leaf, marker))
}

/// Paths of every leaf in the tree.
pub fn list_paths(tree: &Value) -> Vec<Path> {
    select_paths(tree, |_| true)
}

pub fn is_marker(value: &Value, marker: &str) -> bool {
    matches!(value, Value::String(text) if text == marker)
}

pub fn value_at<'a>(tree: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(tree, |node, segment| match (node, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get(key),
            (Value::Array(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        })
}

/// Replaces the value at an existing `path`. Intermediate nodes are never
/// created; a path that does not resolve is an error.
pub fn set_at(tree: &mut Value, path: &Path, value: Value) -> Result<(), TreeError> {
    let mut node = tree;
    for segment in path.segments() {
        node = match (node, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
            (Value::Array(items), Segment::Index(index)) => items.get_mut(*index),
            _ => None,
        }
        .ok_or_else(|| TreeError::Unresolved(path.clone()))?;
    }
    *node = value;
    Ok(())
}
