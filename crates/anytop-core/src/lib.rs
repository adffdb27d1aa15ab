//! Accumulate-and-render engine for anytop.
//!
//! Everything here is independent of the terminal: the accumulators,
//! numeric binning, the coordinator that guards shared state, and the
//! ingest path that feeds it.

pub mod accumulate;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod frange;
pub mod ingest;
pub mod interrupt;
pub mod logging;

pub use accumulate::{
    Accumulate, Accumulator, FrequencyTable, Mode, NumericSample, Record, Snapshot,
    UnboundedCounter, WindowCounter,
};
pub use coordinator::Coordinator;
pub use error::MonitorError;
pub use frange::{BinnedDistribution, Bucket, FloatRange};
