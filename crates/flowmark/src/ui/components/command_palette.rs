//! Command palette component for quick actions.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Commands understood by the palette.
pub const COMMANDS: &[&str] = &[
    "app", "reload", "reset", "filter", "clear", "search", "apps", "help",
];

/// Interactive state backing the command palette overlay.
#[derive(Debug, Default, Clone)]
pub struct CommandPaletteState {
    visible: bool,
    input: String,
    /// App names offered when completing `app <name>`.
    apps: Vec<String>,
    hint: Option<String>,
}

impl CommandPaletteState {
    /// Reveal the palette with an empty input buffer.
    pub fn open(&mut self) {
        self.visible = true;
        self.input.clear();
        self.hint = None;
    }

    /// Reveal the palette with an initial command prefilled.
    pub fn open_with<S: Into<String>>(&mut self, content: S) {
        self.open();
        self.input = content.into();
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.hint = None;
    }

    pub fn is_open(&self) -> bool {
        self.visible
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Consume the current input, leaving the buffer empty.
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn push_char(&mut self, ch: char) {
        self.input.push(ch);
        self.hint = None;
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
        self.hint = None;
    }

    pub fn set_apps(&mut self, apps: Vec<String>) {
        self.apps = apps;
    }

    /// Complete the command verb, or the app name after `app `.
    ///
    /// A unique candidate is inserted; several candidates extend the input to their common
    /// prefix and are listed as a hint.
    pub fn complete(&mut self) {
        let (prefix, partial, candidates): (&str, String, Vec<&str>) =
            match self.input.strip_prefix("app ") {
                Some(rest) => (
                    "app ",
                    rest.trim_start().to_owned(),
                    self.apps.iter().map(String::as_str).collect(),
                ),
                None if !self.input.contains(' ') => ("", self.input.clone(), COMMANDS.to_vec()),
                None => return,
            };

        let matches: Vec<&str> = candidates
            .into_iter()
            .filter(|candidate| candidate.starts_with(partial.as_str()))
            .collect();

        match matches.as_slice() {
            [] => self.hint = Some(format!("no match for '{partial}'")),
            [single] => {
                self.input = format!("{prefix}{single}");
                if prefix.is_empty() && *single == "app" {
                    self.input.push(' ');
                }
                self.hint = None;
            }
            many => {
                let common = common_prefix(many);
                self.input = format!("{prefix}{common}");
                self.hint = Some(many.join("  "));
            }
        }
    }
}

fn common_prefix(words: &[&str]) -> String {
    let Some((first, rest)) = words.split_first() else {
        return String::new();
    };
    let mut len = first.len();
    for word in rest {
        len = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((idx, ch), _)| idx + ch.len_utf8())
            .unwrap_or(0)
            .min(len);
    }
    first[..len].to_owned()
}

/// Visual component that renders the command palette overlay.
#[derive(Debug, Default)]
pub struct CommandPalette;

impl CommandPalette {
    /// Draw the palette if it is visible.
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &CommandPaletteState) {
        if !state.is_open() {
            return;
        }

        let width = area.width.saturating_sub(10).min(80);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(6),
            width,
            height: 5,
        };

        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title("Command Palette")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        frame.render_widget(block.clone(), popup);

        let inner = block.inner(popup);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        let prompt = Paragraph::new(format!(":{}", state.input()))
            .style(Style::default().fg(Color::White));
        frame.render_widget(prompt, layout[0]);

        let hint = state
            .hint()
            .map(str::to_owned)
            .unwrap_or_else(|| COMMANDS.join(" · "));
        let paragraph = Paragraph::new(hint)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(paragraph, layout[1]);
    }
}
