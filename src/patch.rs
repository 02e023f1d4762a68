//! JSON Patch synthesis for default annotations
//!
//! The patch replaces the whole annotation map in one `add` operation. An
//! `add` at an existing path acts as a replace (RFC 6902 §4.1), so the
//! platform sees a single atomic change.
//!
//! Concurrent edits to the object's annotations made between admission and
//! patch application are overwritten by this map. Emitting one operation per
//! key would avoid that, at the cost of escaping `/` and `~` in each key.

use std::collections::BTreeMap;

use json_patch::{AddOperation, Patch, PatchOperation};
use jsonptr::PointerBuf;

use crate::policy::PolicyTable;

/// JSON pointer to the annotation map of any object
pub fn annotations_path() -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "annotations"])
}

/// Merge `defaults` into a copy of `current`; policy values win on conflict.
pub fn merge_defaults(
    current: &BTreeMap<String, String>,
    defaults: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = current.clone();
    for (key, value) in defaults {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Build the patch that applies `name`'s default annotations.
///
/// With no matching entry the defaults are empty and the patch re-adds the
/// current annotations unchanged.
pub fn build_patch(name: &str, current: &BTreeMap<String, String>, table: &PolicyTable) -> Patch {
    let empty = BTreeMap::new();
    let defaults = table.defaults_for(name).unwrap_or(&empty);
    let merged = merge_defaults(current, defaults);

    let value = serde_json::Value::Object(
        merged
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect(),
    );

    Patch(vec![PatchOperation::Add(AddOperation {
        path: annotations_path(),
        value,
    })])
}
