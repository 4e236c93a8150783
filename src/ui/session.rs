use crate::ui::cursor::{CursorPos, GridShape, Move};
use crate::ui::filter::{HostEntry, filter};
use crate::ui::grid::{GridFrame, layout};
use crate::ui::viewport::ViewportConfig;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use std::collections::BTreeMap;

const SEARCH_PROMPT: &str = "Search: ";
const HELP_TEXT: &str = "arrows move · Enter connect · Ctrl-C quit";
const ACCENT: Color = Color::Cyan;
const ACCENT_DIM: Color = Color::DarkGray;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated(String),
}

/// Where the session reads input from. Blocks until the next event.
pub trait EventSource {
    fn next_event(&mut self) -> Result<Event>;
}

pub struct TerminalEvents;

impl EventSource for TerminalEvents {
    fn next_event(&mut self) -> Result<Event> {
        event::read().context("Unable to read terminal event")
    }
}

/// Interactive host picker state: keyword, matches and cursor.
#[derive(Debug)]
pub struct Session {
    hosts: Vec<String>,
    viewport: ViewportConfig,
    keyword: String,
    matches: BTreeMap<String, HostEntry>,
    cursor: CursorPos,
    state: SessionState,
}

impl Session {
    pub fn new(hosts: Vec<String>, viewport: ViewportConfig) -> Self {
        let matches = filter(&hosts, "");
        Self {
            hosts,
            viewport,
            keyword: String::new(),
            matches,
            cursor: CursorPos::default(),
            state: SessionState::Running,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn cursor(&self) -> CursorPos {
        self.cursor
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn matches(&self) -> &BTreeMap<String, HostEntry> {
        &self.matches
    }

    pub fn frame(&self) -> GridFrame {
        layout(&self.matches, self.cursor, &self.viewport)
    }

    fn shape(&self) -> GridShape {
        GridShape::new(
            self.viewport.rows_per_column(),
            self.matches.len().min(self.viewport.capacity()),
        )
    }

    /// Draw, wait for input, repeat until the user picks a host or aborts.
    pub fn run<B>(mut self, terminal: &mut Terminal<B>, events: &mut impl EventSource) -> Result<String>
    where
        B: Backend,
        B::Error: Send + Sync + 'static,
    {
        tracing::debug!(hosts = self.hosts.len(), "host picker started");
        loop {
            terminal.draw(|f| self.draw(f))?;
            let event = events.next_event()?;
            self.handle_event(event);
            if let SessionState::Terminated(result) = &self.state {
                tracing::debug!(selected = %result, "host picker finished");
                return Ok(result.clone());
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        if self.state != SessionState::Running {
            return;
        }
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state = SessionState::Terminated(String::new());
            }
            KeyCode::Esc => self.state = SessionState::Terminated(String::new()),
            KeyCode::Enter => {
                let frame = self.frame();
                let host = frame.host_at(frame.cursor()).unwrap_or_default().to_string();
                self.state = SessionState::Terminated(host);
            }
            KeyCode::Up => self.move_cursor(Move::Up),
            KeyCode::Down => self.move_cursor(Move::Down),
            KeyCode::Left => self.move_cursor(Move::Left),
            KeyCode::Right => self.move_cursor(Move::Right),
            KeyCode::Backspace => {
                if self.keyword.pop().is_some() {
                    self.refilter();
                }
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.keyword.push(ch);
                self.refilter();
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, direction: Move) {
        let shape = self.shape();
        self.cursor.move_in(direction, shape);
    }

    fn refilter(&mut self) {
        self.matches = filter(&self.hosts, &self.keyword);
        let shape = self.shape();
        self.cursor.clamp(shape);
    }

    fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        let search = Line::from(vec![
            Span::styled(
                SEARCH_PROMPT,
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw(self.keyword.clone()),
        ]);
        f.render_widget(Paragraph::new(search), chunks[0]);

        let frame = self.frame();
        if frame.is_empty() {
            let empty = Line::styled("No matching hosts", Style::default().fg(ACCENT_DIM));
            f.render_widget(Paragraph::new(empty), chunks[1]);
        } else {
            f.render_widget(Paragraph::new(Text::from(frame.to_lines())), chunks[1]);
        }

        let mut status = format!("{}/{} hosts", frame.len(), self.matches.len());
        if frame.hidden() > 0 {
            status.push_str(&format!(" (+{} hidden, type to narrow)", frame.hidden()));
        }
        let status = Line::from(vec![
            Span::raw(status),
            Span::raw("  "),
            Span::styled(HELP_TEXT, Style::default().fg(ACCENT_DIM)),
        ]);
        f.render_widget(Paragraph::new(status), chunks[2]);

        let x = chunks[0].x + (SEARCH_PROMPT.len() + self.keyword.chars().count()) as u16;
        f.set_cursor_position((x.min(chunks[0].right().saturating_sub(1)), chunks[0].y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use ratatui::backend::TestBackend;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Event>);

    impl Scripted {
        fn new(events: Vec<Event>) -> Self {
            Self(events.into())
        }
    }

    impl EventSource for Scripted {
        fn next_event(&mut self) -> Result<Event> {
            self.0.pop_front().ok_or_else(|| anyhow!("event script exhausted"))
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl_c() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
    }

    fn typed(text: &str) -> Vec<Event> {
        text.chars().map(|ch| key(KeyCode::Char(ch))).collect()
    }

    fn hosts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn run(list: &[&str], events: Vec<Event>) -> Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        let viewport = ViewportConfig::new(80, 10, 20);
        Session::new(hosts(list), viewport).run(&mut terminal, &mut Scripted::new(events))
    }

    fn screen(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn typing_then_moving_down_selects_second_match() {
        let mut events = typed("web");
        events.push(key(KeyCode::Down));
        events.push(key(KeyCode::Enter));
        let selected = run(&["web-1", "web-2", "db-1"], events).unwrap();
        assert_eq!(selected, "web-2");
    }

    #[test]
    fn filtering_starts_at_first_sorted_match() {
        let mut session = Session::new(hosts(&["web-2", "web-1", "db-1"]), ViewportConfig::new(80, 10, 20));
        for event in typed("web") {
            session.handle_event(event);
        }
        let frame = session.frame();
        assert_eq!(frame.shape().rows(), 2);
        assert_eq!(session.cursor(), CursorPos::new(0, 0));
        assert_eq!(frame.host_at(session.cursor()), Some("web-1"));
    }

    #[test]
    fn ctrl_c_aborts_with_empty_result() {
        assert_eq!(run(&["a", "", "b"], vec![ctrl_c()]).unwrap(), "");
        let mut events = typed("a");
        events.push(key(KeyCode::Right));
        events.push(ctrl_c());
        assert_eq!(run(&["a", "", "b"], events).unwrap(), "");
    }

    #[test]
    fn empty_hosts_are_not_listed() {
        let session = Session::new(hosts(&["a", "", "b"]), ViewportConfig::new(80, 10, 20));
        let listed: Vec<&str> = session.matches().keys().map(String::as_str).collect();
        assert_eq!(listed, vec!["a", "b"]);
    }

    #[test]
    fn narrowing_filter_reclamps_cursor() {
        // seven rows per column
        let list = hosts(&["a1", "a2", "a3", "a4", "a5", "a6", "a7", "b1"]);
        let mut session = Session::new(list, ViewportConfig::new(80, 10, 20));
        for _ in 0..10 {
            session.handle_event(key(KeyCode::Down));
        }
        assert_eq!(session.cursor(), CursorPos::new(0, 6));

        session.handle_event(key(KeyCode::Char('b')));
        assert_eq!(session.cursor(), CursorPos::new(0, 0));
        session.handle_event(key(KeyCode::Enter));
        assert_eq!(session.state(), &SessionState::Terminated("b1".to_string()));
    }

    #[test]
    fn backspace_widens_the_filter() {
        let mut session = Session::new(hosts(&["web-1", "db-1"]), ViewportConfig::new(80, 10, 20));
        for event in typed("db") {
            session.handle_event(event);
        }
        assert_eq!(session.matches().len(), 1);
        session.handle_event(key(KeyCode::Backspace));
        session.handle_event(key(KeyCode::Backspace));
        session.handle_event(key(KeyCode::Backspace));
        assert_eq!(session.keyword(), "");
        assert_eq!(session.matches().len(), 2);
    }

    #[test]
    fn enter_on_empty_grid_returns_empty_result() {
        let mut events = typed("zzz");
        events.push(key(KeyCode::Enter));
        assert_eq!(run(&["web-1"], events).unwrap(), "");
    }

    #[test]
    fn events_after_termination_are_ignored() {
        let mut session = Session::new(hosts(&["a"]), ViewportConfig::new(80, 10, 20));
        session.handle_event(ctrl_c());
        session.handle_event(key(KeyCode::Enter));
        assert_eq!(session.state(), &SessionState::Terminated(String::new()));
    }

    #[test]
    fn draws_search_grid_and_status() {
        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        let mut session = Session::new(hosts(&["web-1", "web-2", "db-1"]), ViewportConfig::new(60, 6, 10));
        for event in typed("web") {
            session.handle_event(event);
        }
        terminal.draw(|f| session.draw(f)).unwrap();
        let lines = screen(&terminal);
        assert_eq!(lines[0], "Search: web");
        assert_eq!(lines[1], " > web-1     |");
        assert_eq!(lines[2], "   web-2     |");
        assert!(lines[5].starts_with("2/2 hosts"));

        let again = {
            terminal.draw(|f| session.draw(f)).unwrap();
            screen(&terminal)
        };
        assert_eq!(lines, again);
    }

    #[test]
    fn status_reports_hidden_hosts() {
        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        let list: Vec<String> = (0..20).map(|i| format!("h{i:02}")).collect();
        // one column of three rows fits a 20 wide viewport
        let session = Session::new(list, ViewportConfig::new(20, 6, 10));
        terminal.draw(|f| session.draw(f)).unwrap();
        let lines = screen(&terminal);
        assert!(lines[5].starts_with("3/20 hosts (+17 hidden"), "{}", lines[5]);
    }

    #[test]
    fn script_exhaustion_is_an_error() {
        assert!(run(&["a"], typed("a")).is_err());
    }
}
