//! JSON-tree navigation shared by the store backends.

use serde_json::{Map, Value};

use crate::StoreError;

/// Split a path into its segments, rejecting empty ones.
pub fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    let segs: Vec<&str> = path.split('/').collect();
    if segs.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segs)
}

/// A node that holds no data. The store never retains these: they read back
/// as absent and are pruned from their parents on mutation.
pub fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.values().all(is_empty_node),
        _ => false,
    }
}

/// Subtree at `path`, `None` when absent or empty.
pub fn get_at<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>, StoreError> {
    let mut node = root;
    for seg in segments(path)? {
        match node {
            Value::Object(map) => match map.get(seg) {
                Some(child) => node = child,
                None => return Ok(None),
            },
            _ => return Ok(None),
        }
    }
    Ok(if is_empty_node(node) { None } else { Some(node) })
}

/// Overwrite the subtree at `path`, creating intermediate objects. Empty
/// values delete the node instead.
pub fn set_at(root: &mut Value, path: &str, value: Value) -> Result<(), StoreError> {
    let segs = segments(path)?;
    if is_empty_node(&value) {
        remove_segments(root, &segs);
    } else {
        set_segments(root, &segs, value);
    }
    Ok(())
}

/// Shallow merge of `fields` at `path`; `Null` field values remove fields.
pub fn merge_at(
    root: &mut Value,
    path: &str,
    fields: &Map<String, Value>,
) -> Result<(), StoreError> {
    for (key, value) in fields {
        let child = format!("{path}/{key}");
        set_at(root, &child, value.clone())?;
    }
    Ok(())
}

/// Delete the subtree at `path`, pruning emptied ancestors.
pub fn remove_at(root: &mut Value, path: &str) -> Result<(), StoreError> {
    remove_segments(root, &segments(path)?);
    Ok(())
}

/// Flatten a value into `(relative_path, leaf)` pairs. A scalar at the root
/// yields a single pair with an empty relative path; empty nodes yield none.
pub fn leaves(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    collect_leaves("", value, &mut out);
    out
}

fn collect_leaves(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}/{key}")
                };
                collect_leaves(&path, child, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.clone())),
    }
}

fn set_segments(node: &mut Value, segs: &[&str], value: Value) {
    match segs {
        [] => *node = value,
        [head, rest @ ..] => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(map) = node {
                let child = map.entry((*head).to_string()).or_insert(Value::Null);
                set_segments(child, rest, value);
            }
        }
    }
}

fn remove_segments(node: &mut Value, segs: &[&str]) {
    match segs {
        [] => *node = Value::Null,
        [head, rest @ ..] => {
            if let Value::Object(map) = node {
                if let Some(child) = map.get_mut(*head) {
                    remove_segments(child, rest);
                    if is_empty_node(child) {
                        map.remove(*head);
                    }
                }
            }
        }
    }
}
