//! Frequency view: the most common keys, one per row.
//!
//! ```text
//! 3 keys, 7 counts
//!
//!       4  GET /index.html
//!       2  GET /about
//!       1  POST /login
//! ```

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use anytop_core::FrequencyTable;

use crate::text::{fit_to_width, truncate_to_width};

/// Minimum width of the count column.
pub const MIN_COUNT_WIDTH: usize = 6;

/// Rows above the first data row (header and a blank separator).
pub const HEADER_ROWS: u16 = 2;

/// The `k` highest-count entries, largest first.
///
/// Uses a bounded min-heap, so the cost is `O(n log k)` rather than a full
/// sort. Which of several equal-count keys make the cut is unspecified.
pub fn select_top(table: &FrequencyTable, k: usize) -> Vec<(u64, &str)> {
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<(u64, &str)>> = BinaryHeap::with_capacity(k + 1);
    for (key, count) in table.iter() {
        if heap.len() < k {
            heap.push(Reverse((count, key)));
        } else if heap.peek().is_some_and(|Reverse((min, _))| count > *min) {
            heap.pop();
            heap.push(Reverse((count, key)));
        }
    }
    // ascending by Reverse is descending by count
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(entry)| entry)
        .collect()
}

/// Header line summarizing the whole table.
pub fn summary(table: &FrequencyTable) -> String {
    format!("{} keys, {} counts", table.len(), table.total())
}

/// Lays out the frequency view for a `rows` x `cols` screen.
pub fn frequency_rows(table: &FrequencyTable, rows: u16, cols: u16) -> Vec<String> {
    let width = usize::from(cols);
    let mut lines = vec![fit_to_width(&summary(table), width)];

    let k = table.len().min(usize::from(rows.saturating_sub(HEADER_ROWS)));
    let largest = select_top(table, k);
    let Some(&(max_count, _)) = largest.first() else {
        return lines;
    };

    let count_width = MIN_COUNT_WIDTH.max(max_count.to_string().len());
    let key_width = width.saturating_sub(count_width + 3);

    lines.push(fit_to_width("", width));
    for (count, key) in largest {
        let row = format!(" {count:>count_width$}  {}", truncate_to_width(key, key_width));
        lines.push(fit_to_width(&row, width));
    }
    lines
}
