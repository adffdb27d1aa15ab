//! Histogram view of a numeric sample.
//!
//! ```text
//! 14 values, 1/1 zoom
//!
//! 1.4   ##
//! 2.8   #
//! 4.2   ####
//! ```
//!
//! Each row is one bucket: its upper bound, then a bar of `count / zoom`
//! markers. The zoom is picked from 1, 2, 3, 5, 10, 20, ... so the scale
//! stays readable.

use anyhow::Result;
use anytop_core::config::Config;
use anytop_core::{FloatRange, MonitorError, NumericSample};
use tracing::debug;

use crate::text::fit_to_width;
use crate::top::HEADER_ROWS;

/// Shown until the sample can span a range.
pub const WAITING: &str = "waiting for data...";

/// Columns between the label and the bar, plus one spare on the right.
const LABEL_GAP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramOptions {
    /// Fraction of the observed span added below the minimum and above the maximum.
    pub padding: f64,
    pub marker: char,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            padding: Config::DEFAULT_HISTOGRAM_PADDING,
            marker: Config::DEFAULT_BAR_MARKER,
        }
    }
}

/// Smallest of 1, 2, 3, 5, 10, 20, 30, 50, ... with `largest / zoom <= width`.
pub fn zoom(largest: usize, width: usize) -> usize {
    let mut scale: usize = 1;
    loop {
        for step in [1usize, 2, 3, 5] {
            let Some(candidate) = step.checked_mul(scale) else {
                return usize::MAX;
            };
            if largest / candidate <= width {
                return candidate;
            }
        }
        match scale.checked_mul(10) {
            Some(next) => scale = next,
            None => return usize::MAX,
        }
    }
}

/// Formats like C's `%g`: six significant digits, no trailing zeros,
/// exponent form for very large or very small magnitudes.
pub fn format_g(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    if !x.is_finite() {
        return x.to_string();
    }

    // Rounding to six digits first decides the exponent, as printf does.
    let sci = format!("{x:.5e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if !(-4..6).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.unsigned_abs())
    } else {
        let decimals = usize::try_from(5 - exp).unwrap_or(0);
        trim_fraction(&format!("{x:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Bounds for the buckets: the finite extremes, padded outward.
fn padded_bounds(sample: &NumericSample, padding: f64) -> Option<(f64, f64)> {
    let mut finite = sample.as_slice().iter().copied().filter(|x| x.is_finite());
    let min = finite.next()?;
    let max = finite.last().unwrap_or(min);
    let span = max - min;
    if span > 0.0 {
        Some((min - span * padding, max + span * padding))
    } else {
        Some((min - 0.5, max + 0.5))
    }
}

/// Lays out the histogram view for a `rows` x `cols` screen.
///
/// # Errors
/// Returns [`MonitorError::TerminalTooSmall`] when there is no room for at
/// least one bucket with a bar.
pub fn histogram_rows(
    sample: &NumericSample,
    rows: u16,
    cols: u16,
    options: &HistogramOptions,
) -> Result<Vec<String>> {
    let width = usize::from(cols);
    let bounds = if sample.len() < 2 {
        None
    } else {
        padded_bounds(sample, options.padding)
    };
    let Some((start, end)) = bounds else {
        return Ok(vec![fit_to_width(WAITING, width)]);
    };

    let buckets = usize::from(rows.saturating_sub(HEADER_ROWS));
    if buckets == 0 {
        return Err(MonitorError::TerminalTooSmall { rows, cols }.into());
    }
    let range = FloatRange::new(start, end, buckets)?;
    let dist = sample.get_dist(&range);

    let labels: Vec<String> = range.iter().map(|bucket| format_g(bucket.end)).collect();
    let label_width = labels.iter().map(String::len).max().unwrap_or(0);
    let bar_width = width.saturating_sub(label_width + LABEL_GAP);
    if bar_width == 0 {
        return Err(MonitorError::TerminalTooSmall { rows, cols }.into());
    }

    let zoom = zoom(dist.largest(), bar_width);
    debug!(buckets, zoom, out_of_range = dist.out_of_range(), "histogram layout");

    let mut lines = Vec::with_capacity(buckets + 2);
    lines.push(fit_to_width(
        &format!("{} values, 1/{zoom} zoom", sample.len()),
        width,
    ));
    lines.push(fit_to_width("", width));
    for (label, (_, count)) in labels.iter().zip(dist.iter()) {
        let bar: String = std::iter::repeat_n(options.marker, count / zoom).collect();
        lines.push(fit_to_width(&format!("{label:<label_width$}  {bar}"), width));
    }
    Ok(lines)
}
