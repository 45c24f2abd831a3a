//! Domain-specific errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid bookmark data in {}", path.display())]
    MalformedBookmarks {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The bookmark file references a path that belongs to no known app.
    #[error("no app in the workspace owns bookmarked path '{path}'")]
    UnownedPath { path: String },

    /// The bookmark file references an app code with no known file mapping.
    #[error("app code '{code}' has no file mapping in the workspace")]
    UnknownAppCode { code: String },

    #[error("unknown app '{app}'")]
    UnknownApp { app: String },

    #[error("Unable to Load Bookmarks for app {app}")]
    LoadBookmarks {
        app: String,
        #[source]
        source: Box<FlowError>,
    },
}

impl FlowError {
    pub(crate) fn load(app: &str, source: FlowError) -> Self {
        Self::LoadBookmarks {
            app: app.to_owned(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
