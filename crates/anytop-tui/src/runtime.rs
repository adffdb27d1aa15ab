//! Whole-run orchestration: the ingest thread, the render task, and shutdown.
//!
//! ```text
//! stdin ──> ingest thread ──consume──> Coordinator <──snapshot── render task ──paint──> Screen
//!                                          ^
//!                       interrupt ─────────┘ request_stop
//! ```
//!
//! The render task wakes once per refresh interval, takes a snapshot, and
//! lays it out and paints it with the lock released. A render failure is
//! stored in the coordinator and stops both sides. After a stop the render
//! task is awaited before returning, so nothing is painted once the caller
//! tears the terminal down.

use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use anytop_core::config::Config;
use anytop_core::ingest::spawn_ingest;
use anytop_core::{Accumulator, Coordinator, MonitorError, Snapshot};
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::hist::{HistogramOptions, histogram_rows};
use crate::screen::Screen;
use crate::top::frequency_rows;

/// How the render task draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Time between frames.
    pub interval: Duration,
    pub histogram: HistogramOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(Config::DEFAULT_REFRESH_INTERVAL_MS),
            histogram: HistogramOptions::default(),
        }
    }
}

impl From<&Config> for RenderOptions {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.refresh_interval(),
            histogram: HistogramOptions {
                padding: config.histogram_padding,
                marker: config.bar_marker,
            },
        }
    }
}

/// Draws one frame from a fresh snapshot.
///
/// # Errors
/// Returns an error if the screen cannot be queried or drawn, or the layout
/// does not fit.
pub fn render_frame<S>(
    coordinator: &Coordinator,
    screen: &mut S,
    options: &RenderOptions,
) -> Result<()>
where
    S: Screen + ?Sized,
{
    let snapshot = coordinator.snapshot();
    let (rows, cols) = screen.size()?;
    debug!(rows, cols, "UI: refresh");

    let lines = match &snapshot {
        Snapshot::Frequencies(table) => frequency_rows(table, rows, cols),
        Snapshot::Sample(sample) => histogram_rows(sample, rows, cols, &options.histogram)?,
    };
    screen.paint(&lines)
}

/// Repaints on every tick until the run is stopped or a frame fails.
async fn render_loop<S: Screen>(
    coordinator: Arc<Coordinator>,
    mut screen: S,
    options: RenderOptions,
) {
    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut frame: u64 = 0;

    loop {
        tokio::select! {
            () = coordinator.stopped() => break,
            _ = ticker.tick() => {}
        }
        if coordinator.is_stopped() {
            break;
        }
        frame += 1;
        if let Err(err) = render_frame(&coordinator, &mut screen, &options) {
            coordinator.fail(err.context(MonitorError::RenderFault { frame }));
            break;
        }
    }
    debug!(frames = frame, "UI: stopped");
}

/// Monitors `source` on `screen` until `shutdown` resolves or the run fails.
///
/// The ingest thread is not joined: it may be blocked on a read that never
/// returns. It stops feeding the coordinator once the run is stopped.
///
/// # Errors
/// Returns the first fault of the run: an unreadable source, a record that
/// is not a number in histogram mode, or a failed frame. An interrupt is not
/// an error.
pub async fn run_monitor<R, S, F>(
    source: R,
    screen: S,
    accumulator: Accumulator,
    options: RenderOptions,
    shutdown: F,
) -> Result<()>
where
    R: BufRead + Send + 'static,
    S: Screen + Send + 'static,
    F: Future<Output = ()>,
{
    let coordinator = Arc::new(Coordinator::new(accumulator));
    info!(
        mode = ?coordinator.mode(),
        interval_ms = options.interval.as_millis(),
        "monitor starting"
    );

    spawn_ingest(Arc::clone(&coordinator), source, Handle::current())?;
    let render = tokio::spawn(render_loop(Arc::clone(&coordinator), screen, options));

    tokio::select! {
        () = shutdown => info!("interrupt received, stopping"),
        () = coordinator.stopped() => {}
    }
    coordinator.request_stop();
    render.await.context("render task panicked")?;

    match coordinator.take_fault() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
