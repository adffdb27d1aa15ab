//! Failures that end a monitoring run.
//!
//! Transient read interruptions and operator cancellation are not errors:
//! the former are retried by the ingest reader, the latter ends the run
//! successfully.

use std::fmt;
use std::num::ParseFloatError;

#[derive(Debug)]
pub enum MonitorError {
    /// A record could not be parsed as a number (histogram mode).
    InputParse {
        record: String,
        source: ParseFloatError,
    },
    /// The render task failed to paint a frame.
    RenderFault { frame: u64 },
    /// The terminal has too few rows or columns for the layout.
    TerminalTooSmall { rows: u16, cols: u16 },
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::InputParse { record, .. } => {
                write!(f, "could not parse {record:?} as a number")
            }
            MonitorError::RenderFault { frame } => write!(f, "render failed on frame {frame}"),
            MonitorError::TerminalTooSmall { rows, cols } => {
                write!(f, "terminal too small to draw ({cols}x{rows})")
            }
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::InputParse { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_input_parse_keeps_source() {
        let source = "abc".parse::<f64>().unwrap_err();
        let err = MonitorError::InputParse {
            record: "abc".to_string(),
            source,
        };
        assert_eq!(err.to_string(), "could not parse \"abc\" as a number");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_terminal_too_small_message() {
        let err = MonitorError::TerminalTooSmall { rows: 2, cols: 80 };
        assert_eq!(err.to_string(), "terminal too small to draw (80x2)");
        assert!(err.source().is_none());
    }
}
