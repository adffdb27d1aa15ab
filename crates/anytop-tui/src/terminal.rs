//! Terminal lifecycle management.
//!
//! The monitor draws on the alternate screen with the cursor hidden. Raw
//! mode stays off so Ctrl+C still reaches the process as a signal.
//! Terminal state is restored on:
//! - Normal exit and errors (via [`RestoreGuard`])
//! - A forced exit on the second Ctrl+C (via the interrupt restore hook)
//! - Panic

use std::io::{self, Stdout};
use std::panic;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::debug;

pub type MonitorTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Sets up the terminal for the monitor.
///
/// - Enters alternate screen
/// - Hides the cursor
/// - Creates the terminal instance
///
/// Call `install_panic_hook()` before this to ensure terminal restore on panic.
///
/// # Errors
/// Returns an error if the terminal cannot be switched or queried.
pub fn setup_terminal() -> Result<MonitorTerminal> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    debug!("terminal ready");
    Ok(terminal)
}

/// Restores terminal state.
///
/// Safe to call more than once.
///
/// # Errors
/// Returns an error if the escape sequences cannot be written.
pub fn restore_terminal() -> Result<()> {
    execute!(io::stdout(), Show, LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    Ok(())
}

/// Installs a panic hook that restores the terminal before printing the panic.
///
/// Call this BEFORE `setup_terminal()` to ensure terminal restore on panic.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

/// Restores the terminal when dropped.
#[must_use = "the terminal is restored when the guard is dropped"]
pub struct RestoreGuard;

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if let Err(err) = restore_terminal() {
            debug!("terminal restore failed: {err:#}");
        }
    }
}
