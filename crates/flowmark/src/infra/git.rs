//! Git integration utilities.

use std::path::{Path, PathBuf};

/// Lightweight wrapper around [`gix::Repository`] discovery.
#[derive(Default)]
pub struct GitClient {
    repo: Option<gix::Repository>,
}

impl GitClient {
    /// Attempt to locate a git repository starting from `path`.
    pub fn discover(path: impl AsRef<Path>) -> Self {
        let repo = match gix::discover(path.as_ref()) {
            Ok(repo) => Some(repo),
            Err(err) => {
                tracing::debug!(path = %path.as_ref().display(), error = %err, "no git repository found");
                None
            }
        };
        Self { repo }
    }

    /// Repository work tree and checked-out branch, if discovery succeeded.
    pub fn metadata(&self) -> Option<GitMetadata> {
        let repo = self.repo.as_ref()?;
        let branch = repo
            .head_name()
            .ok()
            .flatten()
            .map(|name| name.shorten().to_string());

        let root = repo
            .work_dir()
            .map(Path::to_path_buf)
            .or_else(|| repo.path().parent().map(Path::to_path_buf))?;

        Some(GitMetadata { branch, root })
    }
}

/// Basic information about the monorepo checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitMetadata {
    pub branch: Option<String>,
    pub root: PathBuf,
}

/// Root of the monorepo containing `start`, or `start` itself outside git.
pub fn workspace_root(start: &Path) -> PathBuf {
    GitClient::discover(start)
        .metadata()
        .map(|meta| meta.root)
        .unwrap_or_else(|| start.to_path_buf())
}

/// Branch checked out in the repository containing `path`.
pub fn current_branch(path: &Path) -> Option<String> {
    GitClient::discover(path).metadata()?.branch
}
