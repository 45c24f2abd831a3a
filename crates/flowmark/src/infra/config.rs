//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".flowmark/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceSettings,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub keybindings: Keybindings,
}

/// Where apps and their bookmark files live inside the monorepo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default = "WorkspaceSettings::default_apps_folder")]
    pub apps_folder: String,
    #[serde(default = "WorkspaceSettings::default_bookmarks_file")]
    pub bookmarks_file: String,
    #[serde(default = "WorkspaceSettings::default_joined_file")]
    pub joined_file: String,
    /// Glob patterns of app directory names to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl WorkspaceSettings {
    fn default_apps_folder() -> String {
        "packages/apps".to_owned()
    }

    fn default_bookmarks_file() -> String {
        "multiColorBookmarks.json".into()
    }

    fn default_joined_file() -> String {
        "joinedBookmarks.json".into()
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            apps_folder: Self::default_apps_folder(),
            bookmarks_file: Self::default_bookmarks_file(),
            joined_file: Self::default_joined_file(),
            exclude: vec![".*".into(), "node_modules".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// App loaded on start when no session names one.
    #[serde(default)]
    pub app: Option<String>,
    /// Log destination, relative to the workspace root, used while the TUI owns the terminal.
    #[serde(default = "Defaults::default_log_file")]
    pub log_file: String,
}

impl Defaults {
    fn default_log_file() -> String {
        ".flowmark/flowmark.log".into()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            app: None,
            log_file: Self::default_log_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybindings {
    #[serde(default = "Keybindings::default_up")]
    pub up: String,
    #[serde(default = "Keybindings::default_down")]
    pub down: String,
    #[serde(default = "Keybindings::default_filter")]
    pub filter: String,
    #[serde(default = "Keybindings::default_palette")]
    pub palette: String,
}

impl Keybindings {
    fn default_up() -> String {
        "k".into()
    }

    fn default_down() -> String {
        "j".into()
    }

    fn default_filter() -> String {
        "/".into()
    }

    fn default_palette() -> String {
        ":".into()
    }

    /// First character of a binding, falling back to its default.
    pub fn key(binding: &str, default_fn: fn() -> String) -> char {
        binding
            .chars()
            .next()
            .or_else(|| default_fn().chars().next())
            .unwrap_or(' ')
    }

    pub fn up_key(&self) -> char {
        Self::key(&self.up, Self::default_up)
    }

    pub fn down_key(&self) -> char {
        Self::key(&self.down, Self::default_down)
    }

    pub fn filter_key(&self) -> char {
        Self::key(&self.filter, Self::default_filter)
    }

    pub fn palette_key(&self) -> char {
        Self::key(&self.palette, Self::default_palette)
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            up: Self::default_up(),
            down: Self::default_down(),
            filter: Self::default_filter(),
            palette: Self::default_palette(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    apps_folder: Option<String>,
    app: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            apps_folder: env::var("FLOWMARK_APPS_FOLDER").ok(),
            app: env::var("FLOWMARK_APP").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(apps_folder: &str, app: &str) -> Self {
        Self {
            apps_folder: Some(apps_folder.to_owned()),
            app: Some(app.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration for the workspace rooted at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH));
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading global config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data).with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            workspace: merge_workspace(self.workspace, other.workspace),
            defaults: merge_defaults(self.defaults, other.defaults),
            keybindings: merge_keybindings(self.keybindings, other.keybindings),
        }
    }
}

fn merge_workspace(base: WorkspaceSettings, overlay: WorkspaceSettings) -> WorkspaceSettings {
    let mut exclude: BTreeSet<String> = base.exclude.into_iter().collect();
    exclude.extend(overlay.exclude);

    WorkspaceSettings {
        apps_folder: choose(
            base.apps_folder,
            overlay.apps_folder,
            WorkspaceSettings::default_apps_folder,
        ),
        bookmarks_file: choose(
            base.bookmarks_file,
            overlay.bookmarks_file,
            WorkspaceSettings::default_bookmarks_file,
        ),
        joined_file: choose(
            base.joined_file,
            overlay.joined_file,
            WorkspaceSettings::default_joined_file,
        ),
        exclude: exclude.into_iter().collect(),
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        app: overlay.app.or(base.app),
        log_file: choose(base.log_file, overlay.log_file, Defaults::default_log_file),
    }
}

fn merge_keybindings(base: Keybindings, overlay: Keybindings) -> Keybindings {
    Keybindings {
        up: choose(base.up, overlay.up, Keybindings::default_up),
        down: choose(base.down, overlay.down, Keybindings::default_down),
        filter: choose(base.filter, overlay.filter, Keybindings::default_filter),
        palette: choose(base.palette, overlay.palette, Keybindings::default_palette),
    }
}

/// Overlay values equal to the built-in default do not override an earlier layer.
fn choose(base: String, overlay: String, default_fn: fn() -> String) -> String {
    if overlay != default_fn() {
        overlay
    } else {
        base
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("flowmark/config.toml"))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(apps_folder) = env.apps_folder {
        config.workspace.apps_folder = apps_folder;
    }
    if let Some(app) = env.app {
        config.defaults.app = Some(app);
    }
    config
}
