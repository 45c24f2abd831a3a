//! Keyword search across the bookmark and joined-flow files of every app.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Serialize;

use crate::app::bookmarks::{BookmarkRecord, BookmarkStorage};
use crate::app::filter::Filter;
use crate::app::joined::parse_joined_flows;
use crate::app::registry::ResolvedStep;
use crate::app::workspace::build_exclude_matcher;
use crate::domain::model::{BookmarkStep, FlowKind, SubflowRef};
use crate::infra::config::WorkspaceSettings;

/// A flow of some app that mentions at least one keyword.
///
/// Basic hits carry the matching step. Joined hits point at the joined flow's entry in its
/// storage file and describe its subflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub app: String,
    pub flow: String,
    pub kind: FlowKind,
    #[serde(flatten)]
    pub step: BookmarkStep,
}

impl SearchHit {
    pub fn into_resolved(self) -> ResolvedStep {
        ResolvedStep {
            app: self.app,
            flow: self.flow,
            step: self.step,
        }
    }
}

/// Keywords of a search; a candidate matches when any keyword occurs in it, ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    keywords: Vec<Filter>,
}

impl SearchQuery {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .flat_map(|words| {
                words
                    .as_ref()
                    .split_whitespace()
                    .map(Filter::from)
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.keywords.iter().any(|keyword| keyword.matches(candidate))
    }

    fn matches_any<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> bool {
        candidates.into_iter().any(|candidate| self.matches(candidate))
    }
}

/// Search `<root>/<apps_folder>/*/{bookmarks_file,joined_file}` for `query`.
///
/// Hits are ordered by app, then by storage file name. Unreadable or malformed storage is
/// logged and skipped.
pub fn search_flows(
    root: &Path,
    settings: &WorkspaceSettings,
    query: &SearchQuery,
) -> Result<Vec<SearchHit>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let apps_dir = root.join(&settings.apps_folder);
    let storage = build_storage_matcher(settings)?;
    let excluded = build_exclude_matcher(&settings.exclude)?;

    let mut builder = WalkBuilder::new(&apps_dir);
    builder
        .max_depth(Some(2))
        .hidden(false)
        .git_ignore(true)
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut hits = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "search walk error");
                continue;
            }
        };
        if entry.depth() != 2 || !entry.file_type().is_some_and(|ty| ty.is_file()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&apps_dir) else {
            continue;
        };
        if !storage.is_match(relative) {
            continue;
        }
        let Some(app) = relative
            .iter()
            .next()
            .map(|name| name.to_string_lossy().to_string())
        else {
            continue;
        };
        if excluded.is_match(&app) {
            continue;
        }

        let file = StorageFile {
            app: &app,
            path: entry.path(),
            relative: relative_to(root, entry.path()),
            file_name: format!("{}/{app}", settings.apps_folder),
        };
        let raw = match fs::read_to_string(entry.path()) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), error = %err, "skipping unreadable storage");
                continue;
            }
        };
        if entry.file_name() == settings.bookmarks_file.as_str() {
            file.search_bookmarks(&raw, query, &mut hits);
        } else {
            file.search_joined(&raw, query, &mut hits);
        }
    }

    tracing::info!(keywords = query.keywords.len(), hits = hits.len(), "flow search finished");
    Ok(hits)
}

struct StorageFile<'a> {
    app: &'a str,
    path: &'a Path,
    /// Storage path relative to the workspace root, `/` separated.
    relative: String,
    file_name: String,
}

impl StorageFile<'_> {
    fn search_bookmarks(&self, raw: &str, query: &SearchQuery, hits: &mut Vec<SearchHit>) {
        let storage: BookmarkStorage = match serde_json::from_str(raw) {
            Ok(storage) => storage,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "skipping malformed bookmark storage");
                return;
            }
        };

        for (path, lines) in storage {
            for (line_number, BookmarkRecord(description, flow, index, text)) in lines {
                let candidates = [
                    flow.as_str(),
                    description.as_str(),
                    text.as_str(),
                    path.as_str(),
                ];
                if !query.matches_any(candidates) {
                    continue;
                }
                hits.push(SearchHit {
                    app: self.app.to_owned(),
                    flow,
                    kind: FlowKind::Basic,
                    step: BookmarkStep {
                        code: self.app.to_owned(),
                        description,
                        text,
                        line_number,
                        path: path.clone(),
                        file_name: self.file_name.clone(),
                        index,
                    },
                });
            }
        }
    }

    fn search_joined(&self, raw: &str, query: &SearchQuery, hits: &mut Vec<SearchHit>) {
        for (name, subflows) in parse_joined_flows(Some(raw)) {
            let matched = query.matches(&name)
                || subflows
                    .iter()
                    .any(|subflow| query.matches_any([subflow.app.as_str(), subflow.flow.as_str()]));
            if !matched {
                continue;
            }
            hits.push(SearchHit {
                app: self.app.to_owned(),
                kind: FlowKind::Joined,
                step: BookmarkStep {
                    code: self.app.to_owned(),
                    description: describe_subflows(&subflows),
                    text: String::new(),
                    line_number: line_of_key(raw, &name).to_string(),
                    path: self.relative.clone(),
                    file_name: self.file_name.clone(),
                    index: 0,
                },
                flow: name,
            });
        }
    }
}

fn build_storage_matcher(settings: &WorkspaceSettings) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for file in [&settings.bookmarks_file, &settings.joined_file] {
        let pattern = format!("*/{file}");
        let glob =
            Glob::new(&pattern).with_context(|| format!("invalid storage file name '{file}'"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build storage matcher")
}

fn describe_subflows(subflows: &[SubflowRef]) -> String {
    subflows
        .iter()
        .map(|subflow| format!("{}/{}", subflow.app, subflow.flow))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 1-based line holding the JSON key `name`, or 1 when it cannot be located.
fn line_of_key(raw: &str, name: &str) -> usize {
    let key = serde_json::to_string(name).unwrap_or_else(|_| format!("\"{name}\""));
    raw.lines()
        .position(|line| line.contains(&key))
        .map_or(1, |index| index + 1)
}

fn relative_to(root: &Path, path: &Path) -> String {
    let relative: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    relative
        .iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
