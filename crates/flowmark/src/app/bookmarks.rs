//! Decoding of an app's bookmark file into ordered flows.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::domain::errors::{FlowError, Result};
use crate::domain::model::{BookmarkStep, Flow, FlowMap};

/// Raw bookmark file contents: `path -> line number -> record`.
pub type BookmarkStorage = BTreeMap<String, BTreeMap<String, BookmarkRecord>>;

/// Stored tuple `[description, flowName, index, text]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookmarkRecord(pub String, pub String, pub usize, pub String);

/// Workspace lookups needed to attribute bookmarked paths to apps.
pub trait AppLookup {
    /// Code of the app owning `path`. Fails when no app owns it.
    fn code_for_path(&self, path: &str) -> Result<String>;

    /// Display name for an app code. Fails when the code is unknown.
    fn file_name_for_code(&self, code: &str) -> Result<String>;
}

/// Parse the bookmark file contents read from `source`.
pub fn parse_bookmarks(raw: &str, source: &Path, lookup: &dyn AppLookup) -> Result<FlowMap> {
    let storage: BookmarkStorage =
        serde_json::from_str(raw).map_err(|err| FlowError::MalformedBookmarks {
            path: source.to_path_buf(),
            source: err,
        })?;
    parse_bookmark_storage(storage, lookup)
}

/// Group decoded records into flows ordered by each record's index.
///
/// Two records claiming the same `(flow, index)` slot resolve to the one visited last (paths,
/// then line keys, in ascending order).
pub fn parse_bookmark_storage(storage: BookmarkStorage, lookup: &dyn AppLookup) -> Result<FlowMap> {
    let mut slots: BTreeMap<String, BTreeMap<usize, BookmarkStep>> = BTreeMap::new();

    for (path, lines) in storage {
        let code = lookup.code_for_path(&path)?;
        let file_name = lookup.file_name_for_code(&code)?;

        for (line_number, BookmarkRecord(description, flow_name, index, text)) in lines {
            let step = BookmarkStep {
                code: code.clone(),
                description,
                text,
                line_number,
                path: path.clone(),
                file_name: file_name.clone(),
                index,
            };
            if let Some(previous) = slots.entry(flow_name).or_default().insert(index, step) {
                tracing::debug!(
                    path = %previous.path,
                    line = %previous.line_number,
                    index,
                    "bookmark index reused; keeping the later record"
                );
            }
        }
    }

    Ok(slots
        .into_iter()
        .map(|(name, steps)| (name, Flow::from_steps(steps.into_values().collect())))
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::HashMap;

    /// Lookup double mapping path prefixes to codes.
    pub(crate) struct StaticLookup {
        prefixes: Vec<(String, String)>,
        files: HashMap<String, String>,
    }

    impl StaticLookup {
        pub(crate) fn new(entries: &[(&str, &str, &str)]) -> Self {
            Self {
                prefixes: entries
                    .iter()
                    .map(|(prefix, code, _)| (prefix.to_string(), code.to_string()))
                    .collect(),
                files: entries
                    .iter()
                    .map(|(_, code, file)| (code.to_string(), file.to_string()))
                    .collect(),
            }
        }
    }

    impl AppLookup for StaticLookup {
        fn code_for_path(&self, path: &str) -> Result<String> {
            self.prefixes
                .iter()
                .find(|(prefix, _)| path.starts_with(prefix.as_str()))
                .map(|(_, code)| code.clone())
                .ok_or_else(|| FlowError::UnownedPath {
                    path: path.to_owned(),
                })
        }

        fn file_name_for_code(&self, code: &str) -> Result<String> {
            self.files
                .get(code)
                .cloned()
                .ok_or_else(|| FlowError::UnknownAppCode {
                    code: code.to_owned(),
                })
        }
    }

    fn parse(raw: &str, lookup: &StaticLookup) -> Result<FlowMap> {
        parse_bookmarks(raw, Path::new("bookmarks.json"), lookup)
    }

    #[test]
    fn groups_lines_into_indexed_flow() {
        let lookup = StaticLookup::new(&[("a.ts", "APP1", "app-one")]);
        let flows = parse(
            r#"{"a.ts": {"10": ["d1","Login",0,"t1"], "12": ["d2","Login",1,"t2"]}}"#,
            &lookup,
        )
        .unwrap();

        let login = &flows["Login"];
        assert_eq!(login.len(), 2);
        assert_eq!(login.steps()[0].line_number, "10");
        assert_eq!(login.steps()[0].code, "APP1");
        assert_eq!(login.steps()[0].file_name, "app-one");
        assert_eq!(login.steps()[1].line_number, "12");
        assert_eq!(login.steps()[1].description, "d2");
    }

    #[test]
    fn index_order_wins_over_file_and_line_order() {
        let lookup = StaticLookup::new(&[("src/", "APP1", "app-one")]);
        let flows = parse(
            r#"{
                "src/a.ts": {"100": ["last","Checkout",2,"x"], "5": ["first","Checkout",0,"y"]},
                "src/b.ts": {"1": ["middle","Checkout",1,"z"]}
            }"#,
            &lookup,
        )
        .unwrap();

        let order: Vec<_> = flows["Checkout"]
            .steps()
            .iter()
            .map(|s| s.description.as_str())
            .collect();
        assert_eq!(order, ["first", "middle", "last"]);
    }

    #[test]
    fn keeps_sparse_indices_in_order() {
        let lookup = StaticLookup::new(&[("a.ts", "APP1", "app-one")]);
        let flows = parse(
            r#"{"a.ts": {"3": ["c","Flow",7,""], "1": ["a","Flow",0,""]}}"#,
            &lookup,
        )
        .unwrap();

        let indices: Vec<_> = flows["Flow"].steps().iter().map(|s| s.index).collect();
        assert_eq!(indices, [0, 7]);
    }

    #[test]
    fn duplicate_index_keeps_later_record() {
        let lookup = StaticLookup::new(&[("a.ts", "APP1", "app-one")]);
        let flows = parse(
            r#"{"a.ts": {"1": ["early","Flow",0,""], "2": ["late","Flow",0,""]}}"#,
            &lookup,
        )
        .unwrap();

        assert_eq!(flows["Flow"].len(), 1);
        assert_eq!(flows["Flow"].steps()[0].description, "late");
    }

    #[test]
    fn unowned_path_is_reported() {
        let lookup = StaticLookup::new(&[("a.ts", "APP1", "app-one")]);
        let err = parse(r#"{"other.ts": {"1": ["d","F",0,""]}}"#, &lookup).unwrap_err();
        assert!(matches!(err, FlowError::UnownedPath { path } if path == "other.ts"));
    }

    #[test]
    fn unknown_code_is_a_configuration_error() {
        struct MissingFiles;
        impl AppLookup for MissingFiles {
            fn code_for_path(&self, _path: &str) -> Result<String> {
                Ok("GHOST".into())
            }
            fn file_name_for_code(&self, code: &str) -> Result<String> {
                Err(FlowError::UnknownAppCode { code: code.into() })
            }
        }

        let err = parse_bookmarks(
            r#"{"a.ts": {"1": ["d","F",0,""]}}"#,
            Path::new("bookmarks.json"),
            &MissingFiles,
        )
        .unwrap_err();
        assert!(matches!(err, FlowError::UnknownAppCode { code } if code == "GHOST"));
    }

    #[test]
    fn malformed_record_is_rejected() {
        let lookup = StaticLookup::new(&[("a.ts", "APP1", "app-one")]);
        let err = parse(r#"{"a.ts": {"1": ["d","F","zero",""]}}"#, &lookup).unwrap_err();
        assert!(matches!(err, FlowError::MalformedBookmarks { .. }));
    }
}
