pub mod cursor;
pub mod filter;
pub mod grid;
pub mod session;
pub mod viewport;

use crate::config::UiConfig;
use anyhow::{Context, Result};
use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use session::{Session, TerminalEvents};
use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use viewport::ViewportConfig;

pub type AppTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Set while a `TerminalGuard` holds the terminal.
static TERMINAL_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Owns the terminal in raw mode on the alternate screen and gives it back
/// when dropped.
pub struct TerminalGuard {
    terminal: AppTerminal,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Unable to enable raw mode")?;
        match enter_terminal() {
            Ok(terminal) => {
                TERMINAL_ACTIVE.store(true, Ordering::SeqCst);
                Ok(Self { terminal })
            }
            Err(err) => {
                let _ = restore();
                Err(err)
            }
        }
    }

    pub fn terminal_mut(&mut self) -> &mut AppTerminal {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        TERMINAL_ACTIVE.store(false, Ordering::SeqCst);
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn enter_terminal() -> Result<AppTerminal> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Unable to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Unable to initialize terminal")?;
    Ok(terminal)
}

fn restore() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, Show)?;
    Ok(())
}

/// Clears the active flag, returning whether the picker held the terminal.
fn release_active() -> bool {
    TERMINAL_ACTIVE.swap(false, Ordering::SeqCst)
}

/// Restore the terminal before the default panic message is printed. Panics
/// outside the picker leave the terminal alone.
pub fn install_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if release_active() {
            let _ = restore();
        }
        hook(info);
    }));
}

/// Show the host picker and return the chosen host, or `""` if the user
/// backed out.
pub fn select_host(hosts: Vec<String>, ui: &UiConfig) -> Result<String> {
    let viewport = ViewportConfig::from_terminal(ui)?;
    let mut guard = TerminalGuard::enter()?;
    Session::new(hosts, viewport).run(guard.terminal_mut(), &mut TerminalEvents)
}
