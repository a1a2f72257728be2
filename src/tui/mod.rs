//! Terminal inspector for dials using ratatui
//!
//! Renders the overlay: a searchable, grouped dial list with a detail pane,
//! inline editing, and reset. Deferred registry notifications are flushed
//! once per event-loop tick.

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

use crate::models::{Dial, DialConfig, DialValue};
use crate::overlay::{Overlay, Visibility};
use crate::registry::DialRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    Edit,
}

/// Inspector application state
pub struct InspectorApp {
    overlay: Overlay,
    list_state: ListState,
    mode: InputMode,
    input: String,
    status_message: Option<String>,
    should_quit: bool,
}

impl InspectorApp {
    pub fn new(registry: &DialRegistry) -> Self {
        let overlay = Overlay::new(registry);
        let mut list_state = ListState::default();
        if !overlay.visible_dials().is_empty() {
            list_state.select(Some(0));
        }

        Self {
            overlay,
            list_state,
            mode: InputMode::Normal,
            input: String::new(),
            status_message: None,
            should_quit: false,
        }
    }

    /// Run the inspector until the user quits
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.run_app(&mut terminal);

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        res
    }

    fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            self.tick();
            terminal.draw(|f| self.ui(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Deliver queued registry notifications and rebuild the list if needed
    fn tick(&mut self) {
        self.overlay.registry().flush_notifications();
        if self.overlay.refresh() {
            self.clamp_selection();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.mode {
            InputMode::Search => self.handle_search_key(key),
            InputMode::Edit => self.handle_edit_key(key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        self.status_message = None;

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.next_dial(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_dial(),
            KeyCode::Char('/') => {
                self.mode = InputMode::Search;
                self.input = self.overlay.query().to_string();
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(dial) = self.selected_dial() {
                    self.input = dial.current_value.to_string();
                    self.mode = InputMode::Edit;
                }
            }
            KeyCode::Char(' ') => self.toggle_selected_boolean(),
            KeyCode::Char('r') => {
                if let Some(id) = self.selected_dial().map(|d| d.id.clone()) {
                    self.overlay.reset(&id);
                    self.status_message = Some(format!("Reset {}", id));
                }
            }
            KeyCode::Char('R') => {
                self.overlay.reset_all();
                self.status_message = Some("Reset all dials".to_string());
            }
            KeyCode::Char('c') => self.overlay.toggle_collapsed(),
            KeyCode::Char('h') => self.overlay.toggle_hidden(),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input.clear();
                self.overlay.set_query("");
                self.mode = InputMode::Normal;
            }
            KeyCode::Enter => self.mode = InputMode::Normal,
            KeyCode::Backspace => {
                self.input.pop();
                self.overlay.set_query(self.input.clone());
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                self.overlay.set_query(self.input.clone());
            }
            _ => {}
        }
        self.clamp_selection();
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input.clear();
                self.mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                self.apply_edit();
                self.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn apply_edit(&mut self) {
        let Some(id) = self.selected_dial().map(|d| d.id.clone()) else {
            return;
        };

        self.status_message = Some(match self.overlay.edit(&id, &self.input) {
            Ok(value) => format!("{} = {}", id, value),
            Err(e) => format!("Error: {}", e),
        });
        self.input.clear();
    }

    fn toggle_selected_boolean(&mut self) {
        let Some(dial) = self.selected_dial() else {
            return;
        };
        if let (DialConfig::Boolean(_), DialValue::Bool(current)) = (&dial.config, &dial.current_value) {
            let id = dial.id.clone();
            let next = !*current;
            self.overlay.registry().set_value(&id, next);
            self.status_message = Some(format!("{} = {}", id, next));
        }
    }

    fn selected_dial(&self) -> Option<&Dial> {
        let index = self.list_state.selected()?;
        self.overlay.visible_dials().get(index).copied()
    }

    fn clamp_selection(&mut self) {
        let len = self.overlay.visible_dials().len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            Some(_) => {}
        }
    }

    fn next_dial(&mut self) {
        let len = self.overlay.visible_dials().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous_dial(&mut self) {
        let len = self.overlay.visible_dials().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    /// Draw the UI
    fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Content
                Constraint::Length(3), // Footer
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);

        match self.overlay.visibility() {
            Visibility::Open => {
                let content = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
                    .split(chunks[1]);
                self.render_dial_list(f, content[0]);
                self.render_detail(f, content[1]);
            }
            Visibility::Collapsed => self.render_collapsed(f, chunks[1]),
            Visibility::Hidden => {}
        }

        self.render_footer(f, chunks[2]);

        if self.mode == InputMode::Edit {
            self.render_edit_popup(f);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let registry = self.overlay.registry();
        let scope = registry.project_id().unwrap_or_else(|| "default".to_string());
        let title = format!(
            " Dials Inspector   scope: {}   dials: {}   [{}]",
            scope,
            registry.len(),
            self.overlay.visibility()
        );
        let header = Paragraph::new(title)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        f.render_widget(header, area);
    }

    fn render_dial_list(&self, f: &mut Frame, area: Rect) {
        let mut items: Vec<ListItem> = Vec::new();
        let mut selectable_to_row: Vec<usize> = Vec::new();

        for group in self.overlay.groups() {
            items.push(
                ListItem::new(format!("▾ {}", group.name)).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            );
            for dial in &group.dials {
                selectable_to_row.push(items.len());
                let marker = if dial.is_default() { ' ' } else { '•' };
                items.push(ListItem::new(format!(
                    "  {} {:<22} {}",
                    marker,
                    dial.display_label(),
                    dial.current_value
                )));
            }
        }

        // Group headings occupy rows, so map the dial index onto a list row
        let mut row_state = ListState::default();
        row_state.select(
            self.list_state
                .selected()
                .and_then(|i| selectable_to_row.get(i).copied()),
        );

        let title = if self.overlay.query().is_empty() {
            format!("Dials ({})", selectable_to_row.len())
        } else {
            format!("Dials /{} ({})", self.overlay.query(), selectable_to_row.len())
        };

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD))
            .highlight_symbol(">> ");

        f.render_stateful_widget(list, area, &mut row_state);
    }

    fn render_detail(&self, f: &mut Frame, area: Rect) {
        let Some(dial) = self.selected_dial() else {
            let empty = Paragraph::new("No dial selected")
                .block(Block::default().borders(Borders::ALL).title("Details"))
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(empty, area);
            return;
        };

        let mut text = format!(
            "Id:       {}\nKind:     {}\nGroup:    {}\nValue:    {}\nDefault:  {}\n",
            dial.id,
            dial.kind,
            dial.config.group_or_default(),
            dial.current_value,
            dial.config.default_value()
        );

        if let DialConfig::Number(c) = &dial.config {
            if let (Some(min), Some(max)) = (c.min, c.max) {
                text.push_str(&format!("Range:    {} .. {}\n", min, max));
            }
            if let Some(step) = c.step {
                text.push_str(&format!("Step:     {}\n", step));
            }
        }

        let options = dial.config.options();
        if !options.is_empty() {
            text.push_str(&format!("Options:  {}\n", options.join(", ")));
        }
        if let Some(description) = dial.config.description() {
            text.push_str(&format!("\n{}\n", description));
        }

        let detail = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(dial.display_label().to_string()),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(detail, area);
    }

    fn render_collapsed(&self, f: &mut Frame, area: Rect) {
        let changed = self
            .overlay
            .visible_dials()
            .iter()
            .filter(|d| !d.is_default())
            .count();
        let summary = Paragraph::new(format!(
            "{} groups, {} dials ({} changed). Press c to expand.",
            self.overlay.groups().len(),
            self.overlay.visible_dials().len(),
            changed
        ))
        .block(Block::default().borders(Borders::ALL).title("Dials"))
        .style(Style::default().fg(Color::DarkGray));
        f.render_widget(summary, area);
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let footer_text = match self.mode {
            InputMode::Search => format!("  Search: {}█   Enter: Keep  Esc: Clear", self.input),
            InputMode::Edit => "  Enter: Apply  Esc: Cancel".to_string(),
            InputMode::Normal => match &self.status_message {
                Some(msg) => format!("  {}", msg),
                None => "  ↑/↓: Navigate  /: Search  Enter: Edit  Space: Toggle  r/R: Reset/All  c: Collapse  h: Hide  q: Quit".to_string(),
            },
        };

        let footer = Paragraph::new(footer_text)
            .style(Style::default().fg(Color::White).bg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, area);
    }

    fn render_edit_popup(&self, f: &mut Frame) {
        let Some(dial) = self.selected_dial() else {
            return;
        };
        let area = centered_rect(60, 20, f.area());
        f.render_widget(Clear, area);

        let hint = match &dial.config {
            DialConfig::Boolean(_) => "true / false".to_string(),
            DialConfig::Number(c) => match (c.min, c.max) {
                (Some(min), Some(max)) => format!("number in {} .. {}", min, max),
                _ => "number".to_string(),
            },
            DialConfig::Variant(c) => c.options.join(" | "),
            DialConfig::Color(_) | DialConfig::Spacing(_) => dial.config.options().join(" | "),
        };

        let popup = Paragraph::new(format!("{}█\n\n{}", self.input, hint))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Edit {}", dial.id)),
            )
            .style(Style::default().fg(Color::Cyan))
            .wrap(Wrap { trim: true });
        f.render_widget(popup, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BooleanConfig, NumberConfig};
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> (DialRegistry, InspectorApp) {
        let registry = DialRegistry::in_memory();
        registry.register("shadow", BooleanConfig::new(true));
        registry.register("opacity", NumberConfig::new(0.5));
        let app = InspectorApp::new(&registry);
        (registry, app)
    }

    #[test]
    fn test_edit_sets_value() {
        let (registry, mut app) = app();
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode, InputMode::Edit);

        app.input.clear();
        for c in "0.8".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(registry.get_value("opacity"), Some(DialValue::Number(0.8)));
        assert_eq!(app.status_message.as_deref(), Some("opacity = 0.8"));
    }

    #[test]
    fn test_space_toggles_boolean_and_r_resets() {
        let (registry, mut app) = app();
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(registry.get_value("shadow"), Some(DialValue::Bool(false)));

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(registry.get_value("shadow"), Some(DialValue::Bool(true)));
    }

    #[test]
    fn test_search_filters_and_tick_picks_up_new_dials() {
        let (registry, mut app) = app();
        app.handle_key(key(KeyCode::Char('/')));
        for c in "opa".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(app.overlay.visible_dials().len(), 1);
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.overlay.visible_dials().len(), 2);

        registry.register("gap", NumberConfig::new(8.0));
        assert_eq!(app.overlay.visible_dials().len(), 2);
        app.tick();
        assert_eq!(app.overlay.visible_dials().len(), 3);
    }

    #[test]
    fn test_draw_with_test_backend() {
        let (_registry, mut app) = app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| app.ui(f)).unwrap();

        app.handle_key(key(KeyCode::Char('c')));
        terminal.draw(|f| app.ui(f)).unwrap();
        assert_eq!(app.overlay.visibility(), Visibility::Collapsed);
    }
}
