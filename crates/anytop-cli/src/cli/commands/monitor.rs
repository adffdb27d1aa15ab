//! The live view: stdin in, redrawn distribution out.

use std::io::{self, BufReader, IsTerminal};
use std::num::NonZeroUsize;

use anyhow::{Context, Result, bail};
use anytop_core::config::Config;
use anytop_core::{Accumulator, Mode, interrupt};
use anytop_tui::terminal::{self, RestoreGuard};
use anytop_tui::{RenderOptions, run_monitor};

pub async fn run(mode: Mode, window: Option<NonZeroUsize>, config: &Config) -> Result<()> {
    if !io::stdout().is_terminal() {
        bail!("stdout is not a terminal; anytop needs one to draw on");
    }

    terminal::install_panic_hook();
    interrupt::set_restore_hook(|| {
        let _ = terminal::restore_terminal();
    });
    let screen = terminal::setup_terminal().context("Failed to setup terminal")?;
    let _restore = RestoreGuard;

    run_monitor(
        BufReader::new(io::stdin()),
        screen,
        Accumulator::for_mode(mode, window),
        RenderOptions::from(config),
        interrupt::wait_for_interrupt(),
    )
    .await
}
