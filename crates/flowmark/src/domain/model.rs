//! Domain models for bookmark steps, flows, and joined-flow references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Code carried by the placeholder step returned for unknown flows.
pub const FLOW_NOT_FOUND: &str = "FLOW_NOT_FOUND";
const FLOW_NOT_FOUND_DESCRIPTION: &str = "--- FLOW_NOT_FOUND ---";
const FLOW_NOT_FOUND_FILE: &str = "file-not-found";
/// Flow label of the placeholder subflow returned for unknown joined flows.
pub const NO_SUBFLOWS: &str = "No subflows found for this flow";

/// Whether a flow is a plain bookmark sequence or a composition of other flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Basic,
    Joined,
}

/// One navigable point in a basic flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkStep {
    /// Short identifier of the app owning `path`.
    pub code: String,
    pub description: String,
    /// Content of the bookmarked line.
    pub text: String,
    /// 1-based line number, kept as the key it was stored under.
    pub line_number: String,
    pub path: String,
    /// Display name resolved for `code`.
    pub file_name: String,
    /// Position of the step inside its flow as recorded in the bookmark file.
    pub index: usize,
}

impl BookmarkStep {
    /// Placeholder step standing in for a flow that does not exist.
    pub fn not_found() -> Self {
        Self {
            code: FLOW_NOT_FOUND.to_owned(),
            description: FLOW_NOT_FOUND_DESCRIPTION.to_owned(),
            text: String::new(),
            line_number: "0".to_owned(),
            path: String::new(),
            file_name: FLOW_NOT_FOUND_FILE.to_owned(),
            index: 0,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == FLOW_NOT_FOUND
    }

    /// Parsed line number, `None` when the stored key is not numeric.
    pub fn line(&self) -> Option<usize> {
        self.line_number.trim().parse().ok()
    }
}

/// Named ordered sequence of steps.
///
/// Steps are kept in ascending `index` order. Indices may have gaps; the steps that exist are
/// never reordered by the file or line they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flow {
    steps: Vec<BookmarkStep>,
}

impl Flow {
    pub fn from_steps(mut steps: Vec<BookmarkStep>) -> Self {
        steps.sort_by_key(|step| step.index);
        Self { steps }
    }

    /// Single-step flow made of the not-found placeholder.
    pub fn not_found() -> Self {
        Self {
            steps: vec![BookmarkStep::not_found()],
        }
    }

    pub fn steps(&self) -> &[BookmarkStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.steps.as_slice(), [only] if only.is_not_found())
    }

    pub fn into_steps(self) -> Vec<BookmarkStep> {
        self.steps
    }
}

/// One `{app, flow}` reference inside a joined flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubflowRef {
    pub app: String,
    pub flow: String,
}

impl SubflowRef {
    pub fn new(app: impl Into<String>, flow: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            flow: flow.into(),
        }
    }

    /// Placeholder returned when `app` has no joined flow under the requested name.
    pub fn not_found(app: impl Into<String>) -> Self {
        Self::new(app, NO_SUBFLOWS)
    }

    pub fn is_not_found(&self) -> bool {
        self.flow == NO_SUBFLOWS
    }
}

/// Flows of one app keyed by name.
pub type FlowMap = BTreeMap<String, Flow>;

/// Joined flows of one app keyed by name.
pub type JoinedFlowMap = BTreeMap<String, Vec<SubflowRef>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn step(index: usize, line: &str) -> BookmarkStep {
        BookmarkStep {
            code: "APP1".into(),
            description: format!("d{index}"),
            text: format!("t{index}"),
            line_number: line.into(),
            path: "a.ts".into(),
            file_name: "app1".into(),
            index,
        }
    }

    #[test]
    fn flow_orders_steps_by_index() {
        let flow = Flow::from_steps(vec![step(2, "30"), step(0, "50"), step(1, "10")]);
        let lines: Vec<_> = flow.steps().iter().map(|s| s.line_number.as_str()).collect();
        assert_eq!(lines, ["50", "10", "30"]);
    }

    #[test]
    fn not_found_step_is_presentation_safe() {
        let flow = Flow::not_found();
        assert!(flow.is_not_found());
        let only = &flow.steps()[0];
        assert_eq!(only.path, "");
        assert_eq!(only.line(), Some(0));
        assert_eq!(only.file_name, "file-not-found");
    }

    #[test]
    fn serializes_flow_kind_in_snake_case() {
        let json = serde_json::to_string(&FlowKind::Joined).unwrap();
        assert_eq!(json, "\"joined\"");
    }
}
