//! Terminal front end for anytop.
//!
//! Turns coordinator snapshots into rows of text and paints them once per
//! refresh interval.

pub mod hist;
pub mod runtime;
pub mod screen;
pub mod terminal;
pub mod text;
pub mod top;

pub use runtime::{RenderOptions, run_monitor};
pub use screen::Screen;
