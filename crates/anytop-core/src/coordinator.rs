//! Shared state between the ingest path and the renderer.
//!
//! The coordinator owns the one live [`Accumulator`], the fault slot and the
//! cancellation token. `consume` and `snapshot` are mutually exclusive; a
//! snapshot always reflects a whole prefix of the consumed records. Ranking,
//! binning and painting happen on the detached snapshot, outside the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::accumulate::{Accumulate, Accumulator, Mode, Record, Snapshot};

struct Shared {
    accumulator: Accumulator,
    /// First fault reported by either task.
    fault: Option<anyhow::Error>,
}

pub struct Coordinator {
    mode: Mode,
    shared: Mutex<Shared>,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(accumulator: Accumulator) -> Self {
        debug!(kind = accumulator.kind(), "coordinator created");
        Self {
            mode: accumulator.mode(),
            shared: Mutex::new(Shared {
                accumulator,
                fault: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Feeds one record to the accumulator.
    ///
    /// Expects a single producer; the renderer only ever reads.
    pub fn consume(&self, record: Record) {
        trace!("INPUT: requesting lock");
        let mut shared = self.lock();
        shared.accumulator.consume(record);
    }

    /// Takes a detached view of the accumulator.
    pub fn snapshot(&self) -> Snapshot {
        debug!("UI: requesting lock");
        let snapshot = self.lock().accumulator.snapshot();
        debug!("UI: lock released");
        snapshot
    }

    /// Flags both tasks to stop. Does not wait for them.
    pub fn request_stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!("stop requested");
        }
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        self.cancel.cancelled().await;
    }

    /// A handle on the cancellation token, for waiting outside the runtime.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Records a fault and stops the run.
    ///
    /// Only the first fault is kept; later ones are logged and dropped.
    pub fn fail(&self, err: anyhow::Error) {
        {
            let mut shared = self.lock();
            if shared.fault.is_none() {
                warn!("run failed: {err:#}");
                shared.fault = Some(err);
            } else {
                debug!("ignoring later fault: {err:#}");
            }
        }
        self.request_stop();
    }

    /// Removes the stored fault, if any.
    pub fn take_fault(&self) -> Option<anyhow::Error> {
        self.lock().fault.take()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A consume either completed or never started, so poisoned state is still whole.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
