//! Display-width aware truncation and padding.
//!
//! Widths are terminal columns, so wide characters (CJK, emoji) count as two.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Longest prefix of `text` that fits in `max_width` columns.
pub fn truncate_to_width(text: &str, max_width: usize) -> &str {
    if text.width() <= max_width {
        return text;
    }
    let mut used = 0;
    for (i, ch) in text.char_indices() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width {
            return &text[..i];
        }
        used += w;
    }
    text
}

/// Truncates or right-pads `text` with spaces to exactly `width` columns.
///
/// Padding erases whatever a longer row left at the same position. A wide
/// character that would straddle the edge is dropped and replaced by a space.
pub fn fit_to_width(text: &str, width: usize) -> String {
    let fitted = truncate_to_width(text, width);
    let pad = width.saturating_sub(fitted.width());
    let mut row = String::with_capacity(fitted.len() + pad);
    row.push_str(fitted);
    row.extend(std::iter::repeat_n(' ', pad));
    row
}
