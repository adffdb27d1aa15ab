//! Process-level cancellation: Ctrl+C, SIGTERM and SIGHUP.
//!
//! The signal handler only flips a flag and wakes waiters. Whoever is
//! waiting in [`wait_for_interrupt`] turns that into a cooperative stop.
//! A second signal while the first is still being handled restores the
//! terminal and exits immediately.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::sync::Notify;

/// Exit status used when a second interrupt forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static NOTIFY: OnceLock<Notify> = OnceLock::new();
static RESTORE_HOOK: OnceLock<Box<dyn Fn() + Send + Sync>> = OnceLock::new();

fn notify() -> &'static Notify {
    NOTIFY.get_or_init(Notify::new)
}

/// Installs the signal handler.
///
/// # Errors
/// Returns an error if a handler was already installed for this process.
pub fn init() -> Result<()> {
    ctrlc::set_handler(trigger).context("install interrupt handler")
}

/// Marks the process as interrupted. A repeat call force-exits.
pub fn trigger() {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        if let Some(hook) = RESTORE_HOOK.get() {
            hook();
        }
        std::process::exit(FORCED_EXIT_CODE);
    }
    notify().notify_waiters();
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Resolves once an interrupt has been received.
pub async fn wait_for_interrupt() {
    loop {
        // Register before checking the flag so a trigger in between is not lost.
        let notified = notify().notified();
        if is_interrupted() {
            return;
        }
        notified.await;
    }
}

/// Registers a hook run before a forced exit, typically a terminal restore.
///
/// Only the first registration takes effect.
pub fn set_restore_hook<F>(hook: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let _ = RESTORE_HOOK.set(Box::new(hook));
}
