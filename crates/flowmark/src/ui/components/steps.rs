//! Step pane listing the locations a flow walks through.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::filter::Filter;
use crate::app::registry::ResolvedStep;

/// Steps of the flow opened from the tree, optionally narrowed by a filter.
#[derive(Debug, Default, Clone)]
pub struct StepsState {
    title: Option<String>,
    steps: Vec<ResolvedStep>,
    /// Indices into `steps` that pass the filter.
    visible: Vec<usize>,
    selected: usize,
    filter: Filter,
    filter_input: String,
    filter_active: bool,
}

impl StepsState {
    /// Show `steps`; the current filter keeps applying.
    pub fn open(&mut self, title: impl Into<String>, steps: Vec<ResolvedStep>) {
        self.title = Some(title.into());
        self.steps = steps;
        self.refresh();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn filter_input(&self) -> &str {
        &self.filter_input
    }

    pub fn is_filter_active(&self) -> bool {
        self.filter_active
    }

    pub fn begin_filter(&mut self) {
        self.filter_active = true;
    }

    pub fn end_filter(&mut self) {
        self.filter_active = false;
    }

    pub fn push_filter_char(&mut self, ch: char) {
        self.filter_input.push(ch);
        self.apply_filter();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_input.pop();
        self.apply_filter();
    }

    pub fn set_filter(&mut self, value: impl Into<String>) {
        self.filter_input = value.into();
        self.apply_filter();
    }

    pub fn clear_filter(&mut self) {
        self.filter_active = false;
        self.set_filter(String::new());
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected(&self) -> Option<&ResolvedStep> {
        self.visible
            .get(self.selected)
            .and_then(|&index| self.steps.get(index))
    }

    fn visible_steps(&self) -> impl Iterator<Item = &ResolvedStep> {
        self.visible.iter().filter_map(|&index| self.steps.get(index))
    }

    fn apply_filter(&mut self) {
        let filter = Filter::new(Some(self.filter_input.as_str()));
        if filter != self.filter {
            self.filter = filter;
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        let filter = &self.filter;
        self.visible = self
            .steps
            .iter()
            .enumerate()
            .filter(|(_, resolved)| matches_step(filter, resolved))
            .map(|(index, _)| index)
            .collect();
        self.selected = 0;
    }
}

fn matches_step(filter: &Filter, resolved: &ResolvedStep) -> bool {
    let step = &resolved.step;
    filter.matches(&step.description) || filter.matches(&step.text) || filter.matches(&step.path)
}

#[derive(Debug, Default)]
pub struct Steps;

impl Steps {
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &StepsState, has_focus: bool) {
        let title = match state.title() {
            Some(title) => format!("Steps · {title}{}", state.filter().label_suffix()),
            None => "Steps".to_string(),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if has_focus {
                Color::Cyan
            } else {
                Color::DarkGray
            }));

        let area = if state.is_filter_active() || !state.filter().is_empty() {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(1)])
                .split(area);
            let prompt = Line::from(vec![
                Span::styled("/", Style::default().fg(Color::Cyan)),
                Span::raw(state.filter_input().to_owned()),
            ]);
            frame.render_widget(Paragraph::new(prompt), chunks[0]);
            chunks[1]
        } else {
            area
        };

        if state.visible_len() == 0 {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let text = if state.is_empty() {
                "Press Enter on a flow to list its steps"
            } else {
                "No steps match the filter"
            };
            let placeholder = Paragraph::new(text)
                .style(
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )
                .wrap(Wrap { trim: true });
            frame.render_widget(placeholder, inner);
            return;
        }

        let items: Vec<ListItem> = state
            .visible_steps()
            .map(|resolved| {
                let step = &resolved.step;
                let location = if step.is_not_found() {
                    step.file_name.clone()
                } else {
                    format!("{}:{}", step.path, step.line_number)
                };
                let mut lines = vec![Line::from(vec![
                    Span::styled(
                        format!("{:>3} ", step.index),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::styled(
                        format!("{}/{} ", resolved.app, resolved.flow),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::raw(step.description.clone()),
                ])];
                lines.push(Line::styled(
                    format!("    {location}"),
                    Style::default().fg(Color::Gray),
                ));
                if !step.text.is_empty() {
                    lines.push(Line::styled(
                        format!("    {}", step.text.trim()),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                ListItem::new(lines)
            })
            .collect();

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(if has_focus { Color::Cyan } else { Color::Gray })
                .fg(Color::Black),
        );
        frame.render_stateful_widget(list, area, &mut list_state);
    }
}
