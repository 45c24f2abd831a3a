//! Hierarchical view model of an app's flows: categories, flows, and subflows.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::app::catalog::CatalogSnapshot;
use crate::app::filter::Filter;
use crate::domain::model::{FlowKind, FlowMap, JoinedFlowMap, SubflowRef};

const BASIC_FLOWS: &str = "Basic Flows";
const JOINED_FLOWS: &str = "Joined Flows";
const NO_APP: &str = "None";

/// Read-only view of one catalog snapshot plus the app it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSource {
    app_name: String,
    snapshot: Arc<CatalogSnapshot>,
}

impl FlowSource {
    pub fn new(app_name: impl Into<String>, snapshot: Arc<CatalogSnapshot>) -> Self {
        Self {
            app_name: app_name.into(),
            snapshot,
        }
    }

    /// Placeholder data shown while no app is loaded.
    pub fn empty() -> Self {
        Self::new(NO_APP, Arc::default())
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn basic_flows(&self) -> &FlowMap {
        &self.snapshot.flows
    }

    pub fn joined_flows(&self) -> &JoinedFlowMap {
        &self.snapshot.joined
    }
}

impl Default for FlowSource {
    fn default() -> Self {
        Self::empty()
    }
}

/// Presentation node. `children: None` means the node has nothing to expand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Category {
        label: String,
        kind: FlowKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        children: Option<Vec<TreeNode>>,
    },
    Flow {
        label: String,
        tooltip: String,
        app: String,
        kind: FlowKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        children: Option<Vec<TreeNode>>,
    },
    Subflow {
        label: String,
        description: String,
        tooltip: String,
        app: String,
        kind: FlowKind,
    },
}

impl TreeNode {
    fn basic_flow(name: &str, app: &str) -> Self {
        Self::Flow {
            label: name.to_owned(),
            tooltip: name.to_owned(),
            app: app.to_owned(),
            kind: FlowKind::Basic,
            children: None,
        }
    }

    fn joined_flow(name: &str, app: &str, subflows: Vec<&SubflowRef>) -> Self {
        Self::Flow {
            label: name.to_owned(),
            tooltip: name.to_owned(),
            app: app.to_owned(),
            kind: FlowKind::Joined,
            children: Some(subflows.into_iter().map(Self::subflow).collect()),
        }
    }

    fn subflow(subflow: &SubflowRef) -> Self {
        Self::Subflow {
            label: subflow.flow.clone(),
            description: subflow.app.clone(),
            tooltip: format!("{} : {}", subflow.app, subflow.flow),
            app: subflow.app.clone(),
            kind: FlowKind::Basic,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Category { label, .. } | Self::Flow { label, .. } | Self::Subflow { label, .. } => {
                label.as_str()
            }
        }
    }

    pub fn kind(&self) -> FlowKind {
        match self {
            Self::Category { kind, .. } | Self::Flow { kind, .. } | Self::Subflow { kind, .. } => {
                *kind
            }
        }
    }

    /// App a flow or subflow node refers to; categories have none.
    pub fn app(&self) -> Option<&str> {
        match self {
            Self::Category { .. } => None,
            Self::Flow { app, .. } | Self::Subflow { app, .. } => Some(app.as_str()),
        }
    }

    pub fn children(&self) -> Option<&[TreeNode]> {
        match self {
            Self::Category { children, .. } | Self::Flow { children, .. } => children.as_deref(),
            Self::Subflow { .. } => None,
        }
    }

    pub fn is_category(&self) -> bool {
        matches!(self, Self::Category { .. })
    }
}

/// How the view layer should present a node's expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsible {
    None,
    Collapsed,
    Expanded,
}

/// Expander state of `node` under `filter`.
pub fn collapsible_state(node: &TreeNode, filter: &Filter) -> Collapsible {
    match node {
        // Nothing matched: not expandable rather than collapsed.
        TreeNode::Category { children: None, .. } => Collapsible::None,
        TreeNode::Category {
            kind: FlowKind::Basic,
            ..
        } => {
            if filter.is_empty() {
                Collapsible::Collapsed
            } else {
                Collapsible::Expanded
            }
        }
        TreeNode::Category {
            kind: FlowKind::Joined,
            ..
        } => Collapsible::Expanded,
        TreeNode::Flow { kind, children, .. } => {
            let has_children = children.as_ref().is_some_and(|c| !c.is_empty());
            if *kind == FlowKind::Basic || !has_children {
                Collapsible::None
            } else {
                Collapsible::Collapsed
            }
        }
        TreeNode::Subflow { .. } => Collapsible::None,
    }
}

/// Build the two-category forest for `source` under `filter`.
pub fn build_forest(source: &FlowSource, filter: &Filter) -> Vec<TreeNode> {
    vec![basic_category(source, filter), joined_category(source, filter)]
}

fn basic_category(source: &FlowSource, filter: &Filter) -> TreeNode {
    // BTreeMap keys are already in ascending order.
    let flows: Vec<TreeNode> = source
        .basic_flows()
        .keys()
        .filter(|name| filter.matches(name))
        .map(|name| TreeNode::basic_flow(name, source.app_name()))
        .collect();

    TreeNode::Category {
        label: format!("{BASIC_FLOWS}{}", filter.label_suffix()),
        kind: FlowKind::Basic,
        children: non_empty(flows),
    }
}

fn joined_category(source: &FlowSource, filter: &Filter) -> TreeNode {
    let flows: Vec<TreeNode> = source
        .joined_flows()
        .iter()
        .filter_map(|(name, subflows)| {
            let surviving: Vec<&SubflowRef> = subflows
                .iter()
                .filter(|sub| filter.matches(&sub.flow) || filter.matches(&sub.app))
                .collect();
            (filter.matches(name) || !surviving.is_empty())
                .then(|| TreeNode::joined_flow(name, source.app_name(), surviving))
        })
        .collect();

    TreeNode::Category {
        label: format!("{JOINED_FLOWS}{}", filter.label_suffix()),
        kind: FlowKind::Joined,
        children: non_empty(flows),
    }
}

fn non_empty(nodes: Vec<TreeNode>) -> Option<Vec<TreeNode>> {
    (!nodes.is_empty()).then_some(nodes)
}

type ChangeListener = Box<dyn Fn(u64) + Send + Sync>;

/// Stateful tree provider: owns the current data, filter, and built forest.
pub struct FlowTreeProvider {
    source: FlowSource,
    filter: Filter,
    forest: Vec<TreeNode>,
    revision: u64,
    listeners: Vec<ChangeListener>,
}

impl fmt::Debug for FlowTreeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowTreeProvider")
            .field("app", &self.source.app_name())
            .field("filter", &self.filter)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for FlowTreeProvider {
    fn default() -> Self {
        Self::new(FlowSource::empty())
    }
}

impl FlowTreeProvider {
    pub fn new(source: FlowSource) -> Self {
        let filter = Filter::default();
        let forest = build_forest(&source, &filter);
        Self {
            source,
            filter,
            forest,
            revision: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a callback invoked with the new revision after every rebuild.
    pub fn on_change(&mut self, listener: impl Fn(u64) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Replace the underlying data and rebuild.
    pub fn set_data(&mut self, source: FlowSource) {
        self.source = source;
        self.rebuild();
    }

    /// Apply a new filter; rebuilds only when the normalized value changed.
    pub fn set_filter(&mut self, value: Option<&str>) -> bool {
        let filter = Filter::new(value);
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.rebuild();
        true
    }

    /// Root forest for `None`, otherwise the node's children.
    pub fn get_children<'a>(&'a self, node: Option<&'a TreeNode>) -> Option<&'a [TreeNode]> {
        match node {
            None => Some(&self.forest),
            Some(node) => node.children(),
        }
    }

    pub fn collapsible_state(&self, node: &TreeNode) -> Collapsible {
        collapsible_state(node, &self.filter)
    }

    pub fn forest(&self) -> &[TreeNode] {
        &self.forest
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn source(&self) -> &FlowSource {
        &self.source
    }

    /// Number of rebuilds since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn rebuild(&mut self) {
        self.forest = build_forest(&self.source, &self.filter);
        self.revision += 1;
        tracing::trace!(
            app = %self.source.app_name(),
            filter = %self.filter,
            revision = self.revision,
            "flow tree rebuilt"
        );
        for listener in &self.listeners {
            listener(self.revision);
        }
    }
}
