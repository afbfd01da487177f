//! Helpers for working with extracted statement text.
//!
//! PDF text extraction is inconsistent about spacing (`Detalle de tus
//! movimientos` comes out as `Detalledetusmovimientos` from some producers),
//! so section markers are matched ignoring whitespace and ASCII case.

use std::ops::Range;

/// Byte range of `needle` in `haystack[from..]`, ignoring whitespace and ASCII case.
pub fn find_loose(haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
    let needle: Vec<char> = needle
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if needle.is_empty() || from > haystack.len() {
        return None;
    }

    let chars: Vec<(usize, char)> = haystack[from..]
        .char_indices()
        .filter(|(_, c)| !c.is_whitespace())
        .map(|(i, c)| (from + i, c.to_ascii_lowercase()))
        .collect();

    chars
        .windows(needle.len())
        .find(|window| window.iter().map(|(_, c)| *c).eq(needle.iter().copied()))
        .map(|window| {
            let (start, _) = window[0];
            let (last, c) = window[window.len() - 1];
            start..last + c.len_utf8()
        })
}

/// Text between `start` and `end` markers, trimmed.
///
/// When either marker is missing the whole text is returned unchanged so a
/// layout variation never drops a statement outright.
pub fn narrow_section<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let Some(start_range) = find_loose(text, start, 0) else {
        return text;
    };
    let Some(end_range) = find_loose(text, end, start_range.end) else {
        return text;
    };
    text[start_range.end..end_range.start].trim()
}

/// Collapse runs of whitespace into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
