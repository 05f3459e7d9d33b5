//! JSON file persistence shared by the graph, cache and tool stores
//!
//! Every store is rewritten in full as UTF-8 JSON with a four-space indent.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PersistenceError;

/// Serialize `value` as four-space-indented JSON
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, PersistenceError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| PersistenceError::Serialization(e.to_string()))
}

/// Rewrite the file at `path` with `value`
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let text = to_pretty_json(value)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// Read and deserialize the file at `path`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistenceError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
