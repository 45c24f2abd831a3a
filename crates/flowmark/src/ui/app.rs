//! Application loop for the TUI.

use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};

use crate::app::registry::AppRegistry;
use crate::app::search::{SearchHit, SearchQuery, search_flows};
use crate::app::session::{SessionSnapshot, SessionStore};
use crate::app::tree::{FlowSource, TreeNode};
use crate::app::workspace::Workspace;
use crate::domain::model::FlowKind;
use crate::infra::config::Config;
use crate::infra::git;
use crate::ui::components::command_palette::{CommandPalette, CommandPaletteState};
use crate::ui::components::flow_tree::{FlowTree, FlowTreeState};
use crate::ui::components::steps::{Steps, StepsState};

const TICK_RATE: Duration = Duration::from_millis(120);
const DEFAULT_EDITOR: &str = "vi";
const HELP: &str =
    "app <name> · reload · reset · filter <text> · clear · search <keywords> · apps · help";

/// Primary entry point for running the interactive TUI.
pub struct UiApp {
    root: PathBuf,
    config: Config,
    requested_app: Option<String>,
    registry: Option<AppRegistry>,
    active_app: Option<String>,
    branch: Option<String>,
    tree: FlowTreeState,
    flow_tree: FlowTree,
    steps: StepsState,
    steps_component: Steps,
    session_store: SessionStore,
    palette_state: CommandPaletteState,
    palette_component: CommandPalette,
    pending_edit: Option<EditTarget>,
    status: Option<StatusMessage>,
    focus: FocusTarget,
    should_quit: bool,
}

impl UiApp {
    pub fn new(root: PathBuf, config: Config, app: Option<String>) -> Self {
        Self {
            session_store: SessionStore::new(&root),
            root,
            config,
            requested_app: app,
            registry: None,
            active_app: None,
            branch: None,
            tree: FlowTreeState::default(),
            flow_tree: FlowTree,
            steps: StepsState::default(),
            steps_component: Steps,
            palette_state: CommandPaletteState::default(),
            palette_component: CommandPalette,
            pending_edit: None,
            status: None,
            focus: FocusTarget::Tree,
            should_quit: false,
        }
    }

    /// Launch the terminal UI and enter the event loop.
    pub fn run(&mut self) -> Result<()> {
        self.bootstrap()?;

        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;
        terminal.hide_cursor().ok();

        let event_loop_result = self.event_loop(&mut terminal);

        disable_raw_mode().ok();
        let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
        let _ = terminal.show_cursor();

        self.save_session()?;
        event_loop_result
    }

    fn bootstrap(&mut self) -> Result<()> {
        self.branch = git::current_branch(&self.root);
        let workspace = Workspace::discover(&self.root, &self.config.workspace)
            .context("failed to discover apps")?;

        let without = workspace.apps_without_bookmarks();
        if !without.is_empty() {
            tracing::info!(apps = ?without, "apps without bookmark files");
        }
        self.palette_state
            .set_apps(workspace.app_names().into_iter().map(str::to_owned).collect());
        self.registry = Some(AppRegistry::new(workspace));

        let session = match self.session_store.load() {
            Ok(session) => session.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable session");
                SessionSnapshot::default()
            }
        };

        let app = self
            .requested_app
            .clone()
            .or(session.active_app)
            .or_else(|| self.config.defaults.app.clone());
        match app {
            Some(app) => self.select_app(&app),
            None => self.set_status(StatusLevel::Info, "No app loaded · :app <name>"),
        }
        if let Some(filter) = session.filter {
            self.tree.set_filter(filter);
        }
        Ok(())
    }

    fn registry(&self) -> Result<&AppRegistry> {
        self.registry
            .as_ref()
            .ok_or_else(|| anyhow!("workspace not loaded"))
    }

    /// Load `app` and show its flows; failures keep the current tree.
    fn select_app(&mut self, app: &str) {
        let loaded = self.registry().and_then(|registry| Ok(registry.load_app(app)?));
        match loaded {
            Ok(source) => {
                let flows = source.basic_flows().len();
                let joined = source.joined_flows().len();
                self.tree.set_data(source);
                self.steps.clear();
                self.active_app = Some(app.to_owned());
                tracing::info!(app, flows, joined, "app loaded");
                self.set_status(
                    StatusLevel::Success,
                    format!("{app}: {flows} flows, {joined} joined flows"),
                );
            }
            Err(err) => {
                tracing::error!(app, error = %err, "failed to load app");
                self.set_status(StatusLevel::Error, err.to_string());
            }
        }
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;
            self.tick();

            if self.should_quit {
                break;
            }

            if let Some(target) = self.pending_edit.take() {
                self.open_in_editor(terminal, target)?;
                continue;
            }

            if event::poll(TICK_RATE)? {
                let ev = event::read()?;
                self.handle_event(ev)?;
            }
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) {
        let size = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(2),
            ])
            .split(size);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(layout[0]);

        let focus_tree = matches!(self.focus, FocusTarget::Tree);
        let focus_steps = matches!(self.focus, FocusTarget::Steps);
        self.flow_tree
            .render(frame, main_chunks[0], &self.tree, focus_tree);
        self.steps_component
            .render(frame, main_chunks[1], &self.steps, focus_steps);

        let keys = &self.config.keybindings;
        let key = |text: String| Span::styled(text, Style::default().fg(Color::Cyan));
        let hints = Paragraph::new(Line::from(vec![
            key(format!("{}/{}", keys.down_key(), keys.up_key())),
            Span::raw(" move · "),
            key("h/l".into()),
            Span::raw(" fold · "),
            key("↵".into()),
            Span::raw(" open · "),
            key(keys.filter_key().to_string()),
            Span::raw(" filter · "),
            key(keys.palette_key().to_string()),
            Span::raw(" palette · "),
            key("q".into()),
            Span::raw(" quit"),
        ]))
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Gray));
        frame.render_widget(hints, layout[1]);

        self.render_status(frame, layout[2]);
        self.palette_component
            .render(frame, size, &self.palette_state);
    }

    fn render_status(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let message = self.status.as_ref().map(|status| {
            let style = match status.level {
                StatusLevel::Info => Style::default().fg(Color::Gray),
                StatusLevel::Success => Style::default().fg(Color::Green),
                StatusLevel::Error => Style::default().fg(Color::Red),
            };
            Line::styled(status.text.clone(), style)
        });

        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let line = message.unwrap_or_else(|| {
            let app = self.active_app.as_deref().unwrap_or("no app");
            let text = match &self.branch {
                Some(branch) => format!("Ready · {app} on {branch} · press : for commands"),
                None => format!("Ready · {app} · press : for commands"),
            };
            Line::styled(text, Style::default().fg(Color::DarkGray))
        });
        frame.render_widget(Paragraph::new(line), inner);
    }

    fn tick(&mut self) {
        if let Some(status) = &self.status
            && status.is_expired()
        {
            self.status = None;
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => self.handle_key_event(key)?,
            Event::Resize(..) => {}
            Event::Mouse(_) => {}
            Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        if self.palette_state.is_open() {
            return self.handle_palette_key(key);
        }

        match self.focus {
            FocusTarget::Tree => self.handle_tree_key(key),
            FocusTarget::Steps => self.handle_steps_key(key),
        }
    }

    fn handle_tree_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.tree.is_filter_active() {
            return self.handle_filter_input(key);
        }

        let keys = &self.config.keybindings;
        let (up, down, filter, palette) = (
            keys.up_key(),
            keys.down_key(),
            keys.filter_key(),
            keys.palette_key(),
        );

        match key.code {
            KeyCode::Char(ch) if ch == filter => self.tree.begin_filter(),
            KeyCode::Char(ch) if ch == palette => self.palette_state.open(),
            KeyCode::Char(ch) if ch == down => self.tree.select_next(),
            KeyCode::Char(ch) if ch == up => self.tree.select_previous(),
            KeyCode::Down => self.tree.select_next(),
            KeyCode::Up => self.tree.select_previous(),
            KeyCode::Char('h') | KeyCode::Left => self.tree.collapse_or_parent(),
            KeyCode::Char('l') | KeyCode::Right => self.tree.expand_or_enter(),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Tab => {
                if !self.steps.is_empty() {
                    self.focus = FocusTarget::Steps;
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn handle_steps_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.steps.is_filter_active() {
            return self.handle_steps_filter_input(key);
        }

        let keys = &self.config.keybindings;
        let (up, down, filter, palette) = (
            keys.up_key(),
            keys.down_key(),
            keys.filter_key(),
            keys.palette_key(),
        );

        match key.code {
            KeyCode::Char(ch) if ch == filter => self.steps.begin_filter(),
            KeyCode::Char(ch) if ch == down => self.steps.select_next(),
            KeyCode::Char(ch) if ch == up => self.steps.select_previous(),
            KeyCode::Char(ch) if ch == palette => self.palette_state.open(),
            KeyCode::Down => self.steps.select_next(),
            KeyCode::Up => self.steps.select_previous(),
            KeyCode::Enter => self.queue_edit(),
            KeyCode::Esc if !self.steps.filter().is_empty() => self.steps.clear_filter(),
            KeyCode::Esc | KeyCode::Tab | KeyCode::Left | KeyCode::Char('h') => {
                self.focus = FocusTarget::Tree;
            }
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn handle_palette_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.palette_state.close();
            }
            KeyCode::Enter => {
                let command = self.palette_state.take_input();
                self.palette_state.close();
                if let Err(err) = self.execute_command(command.trim()) {
                    self.set_status(StatusLevel::Error, err.to_string());
                }
            }
            KeyCode::Tab => {
                self.palette_state.complete();
            }
            KeyCode::Backspace => {
                self.palette_state.pop_char();
            }
            KeyCode::Char(ch) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.palette_state.push_char(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_filter_input(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.tree.end_filter();
            }
            KeyCode::Backspace => {
                self.tree.pop_filter_char();
            }
            KeyCode::Char(ch) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.tree.push_filter_char(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_steps_filter_input(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.steps.clear_filter(),
            KeyCode::Enter => self.steps.end_filter(),
            KeyCode::Backspace => self.steps.pop_filter_char(),
            KeyCode::Char(ch) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.steps.push_filter_char(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolve the flow under the cursor into the step pane; categories fold instead.
    fn open_selected(&mut self) {
        let target = match self.tree.selected_node() {
            Some(TreeNode::Flow {
                label, app, kind, ..
            }) => (app.clone(), label.clone(), *kind),
            Some(TreeNode::Subflow { label, app, .. }) => {
                (app.clone(), label.clone(), FlowKind::Basic)
            }
            Some(TreeNode::Category { .. }) => {
                self.tree.toggle_expansion();
                return;
            }
            None => return,
        };

        let (app, flow, kind) = target;
        let resolved = self
            .registry()
            .and_then(|registry| Ok(registry.resolve_flow(&app, &flow, kind)?));
        match resolved {
            Ok(steps) => {
                tracing::debug!(%app, %flow, steps = steps.len(), "flow opened");
                self.steps.open(format!("{app}/{flow}"), steps);
                self.focus = FocusTarget::Steps;
            }
            Err(err) => {
                tracing::error!(%app, %flow, error = %err, "failed to open flow");
                self.set_status(StatusLevel::Error, err.to_string());
            }
        }
    }

    fn queue_edit(&mut self) {
        let Some(resolved) = self.steps.selected() else {
            return;
        };
        let step = &resolved.step;
        if step.is_not_found() || step.path.is_empty() {
            self.set_status(StatusLevel::Info, "Flow not found; nothing to open");
            return;
        }
        let Ok(registry) = self.registry() else {
            return;
        };
        let target = EditTarget {
            path: registry.workspace().resolve_path(&step.path),
            line: step.line().unwrap_or(1),
        };
        self.pending_edit = Some(target);
    }

    /// Suspend the TUI while `$VISUAL`/`$EDITOR` shows the step location.
    fn open_in_editor<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        target: EditTarget,
    ) -> Result<()> {
        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| DEFAULT_EDITOR.to_string());

        disable_raw_mode().ok();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let status = Command::new(&editor)
            .arg(format!("+{}", target.line))
            .arg(&target.path)
            .status();
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen)
            .context("failed to enter alternate screen")?;
        terminal.clear()?;

        match status {
            Ok(code) if code.success() => {}
            Ok(code) => self.set_status(StatusLevel::Error, format!("{editor} exited with {code}")),
            Err(err) => {
                tracing::error!(%editor, error = %err, "failed to launch editor");
                self.set_status(StatusLevel::Error, format!("failed to launch {editor}: {err}"));
            }
        }
        Ok(())
    }

    fn execute_command(&mut self, command: &str) -> Result<()> {
        if command.is_empty() {
            return Ok(());
        }

        let mut parts = command.split_whitespace();
        let verb = parts.next().unwrap_or("");
        let rest = command[verb.len()..].trim();

        match verb {
            "app" => {
                if rest.is_empty() {
                    bail!("usage: app <name>");
                }
                self.select_app(rest);
                self.save_session()?;
            }
            "reload" => {
                let app = self
                    .active_app
                    .clone()
                    .ok_or_else(|| anyhow!("no app loaded"))?;
                self.select_app(&app);
            }
            "reset" => {
                self.registry()?.reset();
                self.tree.set_data(FlowSource::empty());
                self.steps.clear();
                self.focus = FocusTarget::Tree;
                self.active_app = None;
                self.save_session()?;
                self.set_status(StatusLevel::Info, "Bookmarks reset");
            }
            "filter" => {
                self.tree.set_filter(rest);
                self.set_status(StatusLevel::Success, "Filter applied");
            }
            "clear" => {
                self.tree.clear_filter();
                self.set_status(StatusLevel::Info, "Filter cleared");
            }
            "search" => {
                let query = SearchQuery::new([rest]);
                if query.is_empty() {
                    bail!("usage: search <keywords>");
                }
                let hits = search_flows(&self.root, &self.config.workspace, &query)?;
                let count = hits.len();
                tracing::debug!(keywords = rest, hits = count, "palette search");
                self.steps.clear();
                self.steps.open(
                    format!("search: {rest}"),
                    hits.into_iter().map(SearchHit::into_resolved).collect(),
                );
                if count > 0 {
                    self.focus = FocusTarget::Steps;
                }
                self.set_status(StatusLevel::Info, format!("{count} matches for '{rest}'"));
            }
            "apps" => {
                let workspace = self.registry()?.workspace();
                let with = workspace.apps_with_bookmarks().join(", ");
                let without = workspace.apps_without_bookmarks().join(", ");
                let text = if without.is_empty() {
                    format!("apps: {with}")
                } else {
                    format!("apps: {with} · without bookmarks: {without}")
                };
                self.set_status(StatusLevel::Info, text);
            }
            "help" => self.set_status(StatusLevel::Info, HELP),
            other => bail!("unknown command: {other}"),
        }
        Ok(())
    }

    fn save_session(&self) -> Result<()> {
        let filter = self.tree.filter_input();
        let snapshot = SessionSnapshot {
            active_app: self.active_app.clone(),
            filter: (!filter.is_empty()).then(|| filter.to_owned()),
        };
        self.session_store.save(&snapshot)
    }

    fn set_status<S: Into<String>>(&mut self, level: StatusLevel, text: S) {
        self.status = Some(StatusMessage::new(level, text.into()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Tree,
    Steps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EditTarget {
    path: PathBuf,
    line: usize,
}

#[derive(Debug)]
struct StatusMessage {
    level: StatusLevel,
    text: String,
    expires_at: Instant,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: String) -> Self {
        Self {
            level,
            text,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusLevel {
    Info,
    Success,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::path::Path;

    use ratatui::backend::TestBackend;

    fn write_app(root: &Path, app: &str, bookmarks: Option<&str>, joined: Option<&str>) {
        let dir = root.join("packages/apps").join(app);
        fs::create_dir_all(&dir).unwrap();
        if let Some(bookmarks) = bookmarks {
            fs::write(dir.join("multiColorBookmarks.json"), bookmarks).unwrap();
        }
        if let Some(joined) = joined {
            fs::write(dir.join("joinedBookmarks.json"), joined).unwrap();
        }
    }

    fn fixture() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        write_app(
            temp.path(),
            "cart",
            Some(r#"{"packages/apps/cart/src/add.ts": {"4": ["open cart","AddItem",0,"add()"]}}"#),
            Some(r#"{"Checkout": [{"app":"cart","flow":"AddItem"},{"app":"pay","flow":"Pay"}]}"#),
        );
        write_app(
            temp.path(),
            "pay",
            Some(r#"{"packages/apps/pay/src/pay.ts": {"20": ["charge","Pay",0,"charge()"]}}"#),
            None,
        );
        write_app(temp.path(), "admin", None, None);
        temp
    }

    fn ui(root: &Path, app: Option<&str>) -> UiApp {
        let mut ui = UiApp::new(root.to_path_buf(), Config::default(), app.map(str::to_owned));
        ui.bootstrap().unwrap();
        ui
    }

    fn press(ui: &mut UiApp, code: KeyCode) {
        ui.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    #[test]
    fn bootstrap_restores_session() {
        let temp = fixture();
        SessionStore::new(temp.path())
            .save(&SessionSnapshot {
                active_app: Some("cart".into()),
                filter: Some("pay".into()),
            })
            .unwrap();

        let ui = ui(temp.path(), None);
        assert_eq!(ui.active_app.as_deref(), Some("cart"));
        assert_eq!(ui.tree.provider().filter().as_str(), "PAY");
        assert_eq!(ui.tree.filter_input(), "pay");
    }

    #[test]
    fn palette_switches_app_and_persists_session() {
        let temp = fixture();
        let mut ui = ui(temp.path(), None);
        assert!(ui.active_app.is_none());

        ui.execute_command("app pay").unwrap();
        assert_eq!(ui.tree.provider().source().app_name(), "pay");
        let saved = SessionStore::new(temp.path()).load().unwrap().unwrap();
        assert_eq!(saved.active_app.as_deref(), Some("pay"));

        ui.execute_command("app nope").unwrap();
        assert_eq!(ui.active_app.as_deref(), Some("pay"));
        assert_eq!(
            ui.status.as_ref().map(|s| s.level),
            Some(StatusLevel::Error)
        );

        assert!(ui.execute_command("frobnicate").is_err());
        assert!(ui.execute_command("app").is_err());
    }

    #[test]
    fn reset_clears_tree() {
        let temp = fixture();
        let mut ui = ui(temp.path(), Some("cart"));
        ui.execute_command("reset").unwrap();
        assert_eq!(ui.tree.provider().source().app_name(), "None");
        assert!(ui.active_app.is_none());
        assert!(ui.execute_command("reload").is_err());
    }

    #[test]
    fn enter_opens_joined_flow_steps() {
        let temp = fixture();
        let mut ui = ui(temp.path(), Some("cart"));

        // Basic Flows (collapsed), Joined Flows, Checkout
        press(&mut ui, KeyCode::Char('j'));
        press(&mut ui, KeyCode::Char('j'));
        press(&mut ui, KeyCode::Enter);

        assert_eq!(ui.focus, FocusTarget::Steps);
        assert_eq!(ui.steps.title(), Some("cart/Checkout"));
        let step = ui.steps.selected().unwrap();
        assert_eq!(step.step.description, "open cart");

        press(&mut ui, KeyCode::Char('j'));
        press(&mut ui, KeyCode::Enter);
        let target = ui.pending_edit.clone().unwrap();
        assert_eq!(target.line, 20);
        assert!(target.path.ends_with("packages/apps/pay/src/pay.ts"));
    }

    #[test]
    fn live_filter_and_palette_completion() {
        let temp = fixture();
        let mut ui = ui(temp.path(), Some("cart"));

        press(&mut ui, KeyCode::Char('/'));
        for ch in "add".chars() {
            press(&mut ui, KeyCode::Char(ch));
        }
        press(&mut ui, KeyCode::Enter);
        assert!(!ui.tree.is_filter_active());
        assert_eq!(ui.tree.provider().filter().as_str(), "ADD");

        press(&mut ui, KeyCode::Char(':'));
        for ch in "app p".chars() {
            press(&mut ui, KeyCode::Char(ch));
        }
        press(&mut ui, KeyCode::Tab);
        assert_eq!(ui.palette_state.input(), "app pay");
        press(&mut ui, KeyCode::Enter);
        assert_eq!(ui.active_app.as_deref(), Some("pay"));
    }

    #[test]
    fn steps_pane_filter_and_escape() {
        let temp = fixture();
        let mut ui = ui(temp.path(), Some("cart"));
        press(&mut ui, KeyCode::Char('j'));
        press(&mut ui, KeyCode::Char('j'));
        press(&mut ui, KeyCode::Enter);
        assert_eq!(ui.steps.visible_len(), 2);

        press(&mut ui, KeyCode::Char('/'));
        assert!(ui.steps.is_filter_active());
        for ch in "charge".chars() {
            press(&mut ui, KeyCode::Char(ch));
        }
        press(&mut ui, KeyCode::Enter);
        assert!(!ui.steps.is_filter_active());
        assert_eq!(ui.steps.visible_len(), 1);
        assert_eq!(ui.steps.selected().map(|s| s.app.as_str()), Some("pay"));
        assert_eq!(ui.tree.provider().filter().as_str(), "");

        press(&mut ui, KeyCode::Esc);
        assert_eq!(ui.focus, FocusTarget::Steps);
        assert_eq!(ui.steps.visible_len(), 2);

        press(&mut ui, KeyCode::Esc);
        assert_eq!(ui.focus, FocusTarget::Tree);
    }

    #[test]
    fn palette_search_lists_hits_across_apps() {
        let temp = fixture();
        let mut ui = ui(temp.path(), Some("cart"));

        ui.execute_command("search charge").unwrap();
        assert_eq!(ui.focus, FocusTarget::Steps);
        assert_eq!(ui.steps.title(), Some("search: charge"));
        let hit = ui.steps.selected().unwrap();
        assert_eq!((hit.app.as_str(), hit.flow.as_str()), ("pay", "Pay"));

        press(&mut ui, KeyCode::Enter);
        let target = ui.pending_edit.clone().unwrap();
        assert_eq!(target.line, 20);

        assert!(ui.execute_command("search").is_err());
    }

    #[test]
    fn renders_panes() {
        let temp = fixture();
        let mut ui = ui(temp.path(), Some("cart"));
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| ui.render(frame)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Flows · cart"));
        assert!(text.contains("Steps"));
        assert!(text.contains("Joined Flows"));
    }
}
