// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row packing for inline and reply keyboards.

use parley_core::Keyboard;

/// Button id that forces a row break instead of rendering a button.
pub const ROW_BREAK: &str = "__SPLITTER__";

/// Packs `items` left-to-right into rows of at most `max_per_row`.
///
/// Row boundaries fall on every position (sentinels included) that is a
/// multiple of `max_per_row`, and on every sentinel. Sentinels are dropped
/// and empty rows are never emitted.
pub fn pack_rows<T>(
    items: impl IntoIterator<Item = T>,
    max_per_row: usize,
    is_break: impl Fn(&T) -> bool,
) -> Vec<Vec<T>> {
    let max = max_per_row.max(1);
    let mut rows = Vec::new();
    let mut row = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        let brk = is_break(&item);
        if (i % max == 0 || brk) && !row.is_empty() {
            rows.push(std::mem::take(&mut row));
        }
        if !brk {
            row.push(item);
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

/// Reply keyboard whose buttons send their own label.
pub fn reply_keyboard<S: Into<String>>(
    options: impl IntoIterator<Item = S>,
    max_per_row: usize,
    one_time: bool,
) -> Keyboard {
    let rows = pack_rows(options.into_iter().map(Into::into), max_per_row, |_| false);
    Keyboard::Reply { rows, one_time }
}
