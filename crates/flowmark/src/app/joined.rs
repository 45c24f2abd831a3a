//! Joined-flow storage: tolerant parsing, auto-creation, and JSON snippets.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::errors::{FlowError, Result};
use crate::domain::model::{JoinedFlowMap, SubflowRef};

const EMPTY_STORAGE: &str = "{}";

/// Decode joined-flow storage.
///
/// Joined flows are optional: missing storage reads as `{}` and invalid storage degrades to an
/// empty map instead of failing the caller.
pub fn parse_joined_flows(raw: Option<&str>) -> JoinedFlowMap {
    let raw = raw.unwrap_or(EMPTY_STORAGE);
    match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring invalid joined flow storage");
            JoinedFlowMap::new()
        }
    }
}

/// File-backed joined-flow storage of one app.
#[derive(Debug, Clone)]
pub struct JoinedStore {
    path: PathBuf,
}

impl JoinedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the storage file holding `{}` if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<&Path> {
        if self.path.exists() {
            return Ok(&self.path);
        }
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| FlowError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, EMPTY_STORAGE).map_err(|source| FlowError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "created joined flow storage");
        Ok(&self.path)
    }

    /// Read and decode the storage; unreadable files count as absent.
    pub fn read(&self) -> JoinedFlowMap {
        match fs::read_to_string(&self.path) {
            Ok(data) => parse_joined_flows(Some(&data)),
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "joined flow storage unavailable");
                parse_joined_flows(None)
            }
        }
    }
}

/// JSON snippet referencing one flow, ready to paste into a joined-flow file.
pub fn subflow_snippet(subflow: &SubflowRef) -> String {
    serde_json::json!({ "app": subflow.app, "flow": subflow.flow }).to_string()
}

/// Snippets of every subflow of a joined flow, comma separated.
pub fn joined_snippet(subflows: &[SubflowRef]) -> String {
    subflows
        .iter()
        .map(subflow_snippet)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_joined_flows_in_order() {
        let map = parse_joined_flows(Some(
            r#"{"Checkout": [{"app":"cart","flow":"AddItem"},{"app":"pay","flow":"Pay"}]}"#,
        ));
        assert_eq!(
            map["Checkout"],
            vec![SubflowRef::new("cart", "AddItem"), SubflowRef::new("pay", "Pay")]
        );
    }

    #[test]
    fn missing_and_invalid_storage_read_as_empty() {
        assert_eq!(parse_joined_flows(None), parse_joined_flows(Some("{}")));
        assert!(parse_joined_flows(Some("{not json")).is_empty());
        assert!(parse_joined_flows(Some(r#"{"Checkout": "oops"}"#)).is_empty());
    }

    #[test]
    fn ensure_exists_creates_empty_storage_once() {
        let temp = tempfile::tempdir().unwrap();
        let store = JoinedStore::new(temp.path().join("app/joinedBookmarks.json"));
        assert!(store.read().is_empty());

        store.ensure_exists().unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{}");

        fs::write(store.path(), r#"{"J": []}"#).unwrap();
        store.ensure_exists().unwrap();
        assert!(store.read().contains_key("J"));
    }

    #[test]
    fn renders_snippets() {
        let subflows = vec![SubflowRef::new("cart", "AddItem"), SubflowRef::new("pay", "Pay")];
        assert_eq!(
            joined_snippet(&subflows),
            r#"{"app":"cart","flow":"AddItem"},{"app":"pay","flow":"Pay"}"#
        );
    }
}
