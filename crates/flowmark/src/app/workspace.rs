//! Discovery of apps inside the monorepo and path attribution.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::app::bookmarks::AppLookup;
use crate::app::catalog::CatalogSources;
use crate::domain::errors::{self, FlowError};
use crate::infra::config::WorkspaceSettings;

/// One app directory under the apps folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEntry {
    pub name: String,
    /// Identifier recorded in bookmark steps.
    pub code: String,
    pub dir: PathBuf,
    /// App directory relative to the workspace root, `/` separated.
    pub file_name: String,
    pub bookmarks_file: PathBuf,
    pub joined_file: PathBuf,
}

impl AppEntry {
    pub fn has_bookmarks(&self) -> bool {
        self.bookmarks_file.is_file()
    }

    pub fn sources(&self) -> CatalogSources {
        CatalogSources {
            bookmarks_file: self.bookmarks_file.clone(),
            joined_file: self.joined_file.clone(),
        }
    }
}

/// Apps discovered below `<root>/<apps_folder>`.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    apps: BTreeMap<String, AppEntry>,
}

impl Workspace {
    /// Scan the apps folder of `root`; every direct sub-directory is an app.
    pub fn discover(root: impl Into<PathBuf>, settings: &WorkspaceSettings) -> Result<Self> {
        let root = root.into();
        let apps_dir = root.join(&settings.apps_folder);
        if !apps_dir.is_dir() {
            bail!(
                "apps folder {} not found in workspace {}",
                settings.apps_folder,
                root.display()
            );
        }

        let excluded = build_exclude_matcher(&settings.exclude)?;
        let mut builder = WalkBuilder::new(&apps_dir);
        builder.max_depth(Some(1)).hidden(false).git_ignore(true);

        let mut apps = BTreeMap::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "workspace scan error");
                    continue;
                }
            };
            if entry.depth() == 0 || !entry.file_type().is_some_and(|ty| ty.is_dir()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if excluded.is_match(&name) {
                tracing::trace!(app = %name, "app excluded by config");
                continue;
            }

            let dir = entry.path().to_path_buf();
            let file_name = to_slash(dir.strip_prefix(&root).unwrap_or(dir.as_path()));
            apps.insert(
                name.clone(),
                AppEntry {
                    code: name.clone(),
                    bookmarks_file: dir.join(&settings.bookmarks_file),
                    joined_file: dir.join(&settings.joined_file),
                    file_name,
                    dir,
                    name,
                },
            );
        }

        tracing::info!(root = %root.display(), apps = apps.len(), "workspace discovered");
        Ok(Self { root, apps })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn apps(&self) -> impl Iterator<Item = &AppEntry> {
        self.apps.values()
    }

    pub fn app(&self, name: &str) -> Option<&AppEntry> {
        self.apps.get(name)
    }

    pub fn app_names(&self) -> Vec<&str> {
        self.apps.keys().map(String::as_str).collect()
    }

    pub fn apps_with_bookmarks(&self) -> Vec<&str> {
        self.apps()
            .filter(|app| app.has_bookmarks())
            .map(|app| app.name.as_str())
            .collect()
    }

    pub fn apps_without_bookmarks(&self) -> Vec<&str> {
        self.apps()
            .filter(|app| !app.has_bookmarks())
            .map(|app| app.name.as_str())
            .collect()
    }

    /// Absolute location of a path as stored in a bookmark file.
    pub fn resolve_path(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn relative_key(&self, stored: &str) -> Option<String> {
        let normalized = stored.replace('\\', "/");
        let path = Path::new(&normalized);
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };
        Some(to_slash(relative))
    }
}

impl AppLookup for Workspace {
    fn code_for_path(&self, path: &str) -> errors::Result<String> {
        let unowned = || FlowError::UnownedPath {
            path: path.to_owned(),
        };
        let key = self.relative_key(path).ok_or_else(unowned)?;

        self.apps
            .values()
            .filter(|app| {
                key == app.file_name
                    || key
                        .strip_prefix(app.file_name.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|app| app.file_name.len())
            .map(|app| app.code.clone())
            .ok_or_else(unowned)
    }

    fn file_name_for_code(&self, code: &str) -> errors::Result<String> {
        self.apps
            .values()
            .find(|app| app.code == code)
            .map(|app| app.file_name.clone())
            .ok_or_else(|| FlowError::UnknownAppCode {
                code: code.to_owned(),
            })
    }
}

pub(crate) fn build_exclude_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .with_context(|| format!("invalid app exclude pattern '{pattern}'"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build app exclude matcher")
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn workspace_with(apps: &[&str]) -> (tempfile::TempDir, Workspace) {
        let temp = tempfile::tempdir().unwrap();
        for app in apps {
            fs::create_dir_all(temp.path().join("packages/apps").join(app)).unwrap();
        }
        let workspace = Workspace::discover(temp.path(), &WorkspaceSettings::default()).unwrap();
        (temp, workspace)
    }

    #[test]
    fn discovers_app_directories() {
        let (temp, workspace) = workspace_with(&["cart", "pay", ".cache", "node_modules"]);
        fs::write(temp.path().join("packages/apps/README.md"), "docs").unwrap();

        assert_eq!(workspace.app_names(), ["cart", "pay"]);
        let cart = workspace.app("cart").unwrap();
        assert_eq!(cart.code, "cart");
        assert_eq!(cart.file_name, "packages/apps/cart");
        assert!(cart.bookmarks_file.ends_with("cart/multiColorBookmarks.json"));
    }

    #[test]
    fn splits_apps_by_bookmark_presence() {
        let (temp, workspace) = workspace_with(&["cart", "pay"]);
        fs::write(
            temp.path().join("packages/apps/pay/multiColorBookmarks.json"),
            "{}",
        )
        .unwrap();

        assert_eq!(workspace.apps_with_bookmarks(), ["pay"]);
        assert_eq!(workspace.apps_without_bookmarks(), ["cart"]);
    }

    #[test]
    fn attributes_paths_to_longest_matching_app() {
        let (temp, workspace) = workspace_with(&["cart", "cart-admin"]);

        assert_eq!(
            workspace.code_for_path("packages/apps/cart/src/a.ts").unwrap(),
            "cart"
        );
        assert_eq!(
            workspace
                .code_for_path("packages/apps/cart-admin/src/a.ts")
                .unwrap(),
            "cart-admin"
        );
        let absolute = temp.path().join("packages/apps/cart/index.ts");
        assert_eq!(
            workspace
                .code_for_path(&absolute.display().to_string())
                .unwrap(),
            "cart"
        );
        assert!(matches!(
            workspace.code_for_path("packages/shared/util.ts"),
            Err(FlowError::UnownedPath { .. })
        ));
    }

    #[test]
    fn file_name_lookup_rejects_unknown_codes() {
        let (_temp, workspace) = workspace_with(&["cart"]);
        assert_eq!(
            workspace.file_name_for_code("cart").unwrap(),
            "packages/apps/cart"
        );
        assert!(matches!(
            workspace.file_name_for_code("ghost"),
            Err(FlowError::UnknownAppCode { code }) if code == "ghost"
        ));
    }

    #[test]
    fn missing_apps_folder_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(Workspace::discover(temp.path(), &WorkspaceSettings::default()).is_err());
    }
}
