//! Flow tree component and state management.

use std::collections::HashMap;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::app::tree::{Collapsible, FlowSource, FlowTreeProvider, TreeNode};
use crate::infra::highlight::highlight;

/// Navigable, expandable view over a [`FlowTreeProvider`].
#[derive(Debug, Default)]
pub struct FlowTreeState {
    provider: FlowTreeProvider,
    /// Expansion the user chose explicitly, keyed by node key. Reset on every rebuild.
    expanded: HashMap<String, bool>,
    rows: Vec<TreeRow>,
    selected: usize,
    filter_input: String,
    filter_active: bool,
    seen_revision: u64,
}

#[derive(Debug, Clone)]
struct TreeRow {
    key: String,
    /// Child indices from the forest root down to the node.
    path: Vec<usize>,
    depth: usize,
    parent: Option<usize>,
}

impl FlowTreeState {
    pub fn new(provider: FlowTreeProvider) -> Self {
        let mut state = Self {
            provider,
            ..Self::default()
        };
        state.refresh_rows();
        state
    }

    pub fn provider(&self) -> &FlowTreeProvider {
        &self.provider
    }

    /// Show a different app's flows.
    pub fn set_data(&mut self, source: FlowSource) {
        self.provider.set_data(source);
        self.selected = 0;
        self.refresh_rows();
    }

    pub fn begin_filter(&mut self) {
        self.filter_active = true;
    }

    pub fn end_filter(&mut self) {
        self.filter_active = false;
    }

    pub fn is_filter_active(&self) -> bool {
        self.filter_active
    }

    /// Filter text as typed (before normalization).
    pub fn filter_input(&self) -> &str {
        &self.filter_input
    }

    pub fn push_filter_char(&mut self, ch: char) {
        self.filter_input.push(ch);
        self.apply_filter();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_input.pop();
        self.apply_filter();
    }

    pub fn set_filter<S: Into<String>>(&mut self, pattern: S) {
        self.filter_input = pattern.into();
        self.apply_filter();
    }

    pub fn clear_filter(&mut self) {
        self.set_filter(String::new());
    }

    fn apply_filter(&mut self) {
        if self.provider.set_filter(Some(self.filter_input.as_str())) {
            self.refresh_rows();
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Node under the cursor.
    pub fn selected_node(&self) -> Option<&TreeNode> {
        self.rows
            .get(self.selected)
            .and_then(|row| self.node_at(&row.path))
    }

    /// Parent of the node under the cursor.
    pub fn selected_parent(&self) -> Option<&TreeNode> {
        let parent = self.rows.get(self.selected)?.parent?;
        self.node_at(&self.rows[parent].path)
    }

    /// Expand the selected node, or step into its first child when already expanded.
    pub fn expand_or_enter(&mut self) {
        let Some(row) = self.rows.get(self.selected).cloned() else {
            return;
        };
        let Some(node) = self.node_at(&row.path) else {
            return;
        };
        if self.provider.collapsible_state(node) == Collapsible::None {
            return;
        }
        if self.is_expanded(&row.key, node) {
            if self
                .rows
                .get(self.selected + 1)
                .is_some_and(|next| next.parent == Some(self.selected))
            {
                self.selected += 1;
            }
        } else {
            self.expanded.insert(row.key, true);
            self.rebuild_rows();
        }
    }

    /// Collapse the selected node, or move to its parent.
    pub fn collapse_or_parent(&mut self) {
        let Some(row) = self.rows.get(self.selected).cloned() else {
            return;
        };
        let expanded = self
            .node_at(&row.path)
            .is_some_and(|node| self.is_expanded(&row.key, node));
        if expanded {
            self.expanded.insert(row.key, false);
            self.rebuild_rows();
        } else if let Some(parent) = row.parent {
            self.selected = parent;
        }
    }

    pub fn toggle_expansion(&mut self) {
        let Some(row) = self.rows.get(self.selected).cloned() else {
            return;
        };
        let Some(node) = self.node_at(&row.path) else {
            return;
        };
        if self.provider.collapsible_state(node) == Collapsible::None {
            return;
        }
        let next = !self.is_expanded(&row.key, node);
        self.expanded.insert(row.key, next);
        self.rebuild_rows();
    }

    pub fn visible_len(&self) -> usize {
        self.rows.len()
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.rows.is_empty()).then_some(self.selected)
    }

    /// Visible labels indented by depth, for logging and tests.
    pub fn visible_labels(&self) -> Vec<String> {
        self.iter_visible()
            .map(|(row, node)| format!("{}{}", "  ".repeat(row.depth), node.label()))
            .collect()
    }

    fn node_at(&self, path: &[usize]) -> Option<&TreeNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.provider.get_children(None)?.get(*first)?;
        for idx in rest {
            node = self.provider.get_children(Some(node))?.get(*idx)?;
        }
        Some(node)
    }

    fn is_expanded(&self, key: &str, node: &TreeNode) -> bool {
        match self.provider.collapsible_state(node) {
            Collapsible::None => false,
            default => self
                .expanded
                .get(key)
                .copied()
                .unwrap_or(default == Collapsible::Expanded),
        }
    }

    fn refresh_rows(&mut self) {
        if self.provider.revision() != self.seen_revision {
            self.expanded.clear();
            self.seen_revision = self.provider.revision();
        }
        self.rebuild_rows();
    }

    fn rebuild_rows(&mut self) {
        let mut rows = Vec::new();
        for (idx, root) in self.provider.forest().iter().enumerate() {
            self.push_rows(&mut rows, root, vec![idx], None, "");
        }
        self.rows = rows;
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    fn push_rows(
        &self,
        rows: &mut Vec<TreeRow>,
        node: &TreeNode,
        path: Vec<usize>,
        parent: Option<usize>,
        parent_key: &str,
    ) {
        let key = node_key(node, parent_key);
        let position = rows.len();
        rows.push(TreeRow {
            key: key.clone(),
            depth: path.len() - 1,
            path: path.clone(),
            parent,
        });

        if !self.is_expanded(&key, node) {
            return;
        }
        for (idx, child) in node.children().unwrap_or_default().iter().enumerate() {
            let mut child_path = path.clone();
            child_path.push(idx);
            self.push_rows(rows, child, child_path, Some(position), &key);
        }
    }

    fn iter_visible(&self) -> impl Iterator<Item = (&TreeRow, &TreeNode)> {
        self.rows
            .iter()
            .filter_map(|row| self.node_at(&row.path).map(|node| (row, node)))
    }
}

/// Categories are keyed by kind so the filter decoration on their label does not matter.
fn node_key(node: &TreeNode, parent_key: &str) -> String {
    match node {
        TreeNode::Category { kind, .. } => format!("{kind:?}"),
        TreeNode::Flow { label, .. } => format!("{parent_key}/{label}"),
        TreeNode::Subflow { label, app, .. } => format!("{parent_key}/{app}:{label}"),
    }
}

/// Ratatui component rendering the flow tree.
#[derive(Debug, Default)]
pub struct FlowTree;

impl FlowTree {
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &FlowTreeState, has_focus: bool) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Flows · {}", state.provider().source().app_name()));
        frame.render_widget(block.clone(), area);

        let inner = block.inner(area);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);

        let filter_text = if state.filter_input().is_empty() {
            "⌕ filter (press /)".to_string()
        } else {
            format!("⌕ {}", state.filter_input())
        };
        let mut filter_style = Style::default().fg(Color::Gray);
        if state.is_filter_active() {
            filter_style = filter_style.add_modifier(Modifier::BOLD).fg(Color::Cyan);
        }
        frame.render_widget(Paragraph::new(filter_text).style(filter_style), layout[0]);

        let filter = state.provider().filter();
        let items: Vec<ListItem> = state
            .iter_visible()
            .map(|(row, node)| {
                let mut spans = vec![Span::raw("  ".repeat(row.depth))];
                let symbol = match state.provider().collapsible_state(node) {
                    Collapsible::None if node.is_category() => "· ",
                    Collapsible::None => "• ",
                    _ if state.is_expanded(&row.key, node) => "▾ ",
                    _ => "▸ ",
                };
                spans.push(Span::styled(symbol, Style::default().fg(Color::Yellow)));

                if node.is_category() {
                    spans.push(Span::styled(
                        node.label().to_owned(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                } else {
                    for part in highlight(node.label(), filter) {
                        let style = if part.matched {
                            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default()
                        };
                        spans.push(Span::styled(part.content, style));
                    }
                }

                if let TreeNode::Subflow { description, .. } = node {
                    spans.push(Span::raw(" "));
                    spans.push(Span::styled(
                        description.clone(),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let mut list_state = ListState::default();
        list_state.select(state.selected_index());

        let highlight_style = Style::default()
            .fg(Color::Black)
            .bg(if has_focus { Color::Cyan } else { Color::Gray })
            .add_modifier(Modifier::BOLD);
        let list = List::new(items).highlight_style(highlight_style);
        frame.render_stateful_widget(list, layout[1], &mut list_state);
    }
}
