//! Session persistence utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const SESSION_DIR: &str = ".flowmark";
const SESSION_FILE: &str = "session.json";

/// Browser state persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// App whose bookmarks were loaded when the session closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_app: Option<String>,
    /// Active flow tree filter, as typed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Persists the session file under `.flowmark/`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    path: PathBuf,
}

impl SessionStore {
    /// Create a new store rooted at the workspace directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = root.join(SESSION_DIR).join(SESSION_FILE);
        Self { root, path }
    }

    /// Location of the persisted session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the most recently persisted snapshot, `None` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<SessionSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file at {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&data)
            .with_context(|| format!("invalid session data in {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Persist the snapshot, creating parent directories as needed.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create session directory {}", dir.display()))?;

        let data = serde_json::to_string_pretty(snapshot)
            .context("failed to serialize session snapshot")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write session file to {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), app = ?snapshot.active_app, "session saved");
        Ok(())
    }
}
