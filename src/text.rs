//! Plain-text helpers used by the template filters: sentence-aware and
//! word-boundary truncation, and markup stripping.
//!
//! All lengths and indices are counted in `char`s (Unicode scalar values), not
//! bytes, so a cut never lands inside a multi-byte character.

use once_cell::sync::Lazy;
use regex::Regex;

/// The default bound for [`truncate_sentences`].
pub const DEFAULT_EXCERPT_LENGTH: usize = 350;

/// The default bound for [`truncate`].
pub const DEFAULT_TRUNCATE_LENGTH: usize = 150;

/// A sentence or word boundary closer than this to the start of the text is
/// considered too early to cut at.
const MIN_BOUNDARY: usize = 100;

const ELLIPSIS: &str = "...";

/// Shortens `text` to about `max_length` characters for use in previews,
/// preferring to end on a sentence terminator (`.`, `!` or `?`), then on a
/// space, and finally falling back to a hard cut. Word-boundary and hard cuts
/// get an ellipsis appended; sentence cuts keep their own punctuation.
///
/// Text that already fits is returned unchanged. Otherwise the result is at
/// most `max_length + 3` characters, which can exceed the input length.
pub fn truncate_sentences(text: &str, max_length: usize) -> String {
    let buffer = match prefix(text, max_length) {
        None => return text.to_owned(),
        Some(buffer) => buffer,
    };

    // (char index, byte index) of the rightmost candidates
    let mut last_sentence_end: Option<(usize, usize)> = None;
    let mut last_space: Option<(usize, usize)> = None;
    for (position, (offset, c)) in buffer.char_indices().enumerate() {
        match c {
            '.' | '!' | '?' => last_sentence_end = Some((position, offset)),
            ' ' => last_space = Some((position, offset)),
            _ => {}
        }
    }

    if let Some((position, offset)) = last_sentence_end {
        if position >= MIN_BOUNDARY {
            // terminators are all single-byte
            return buffer[..=offset].to_owned();
        }
    }

    match last_space {
        Some((position, offset)) if position >= MIN_BOUNDARY => {
            format!("{}{}", &buffer[..offset], ELLIPSIS)
        }
        _ => format!("{}{}", buffer, ELLIPSIS),
    }
}

/// Shortens `text` to about `max_length` characters by cutting at the
/// nearest space before the bound and appending an ellipsis. Unlike
/// [`truncate_sentences`] there is no sentence step and no minimum position
/// for the cut. A text without any space in range is cut hard at the bound.
/// Trailing whitespace before the ellipsis is dropped; leading whitespace is
/// kept so the result stays a prefix of `text`.
pub fn truncate(text: &str, max_length: usize) -> String {
    let buffer = match prefix(text, max_length) {
        None => return text.to_owned(),
        Some(buffer) => buffer,
    };

    let cut = match buffer.rfind(' ') {
        Some(offset) => &buffer[..offset],
        None => buffer,
    };
    format!("{}{}", cut.trim_end(), ELLIPSIS)
}

/// Removes every markup tag (anything between `<` and the next `>`) from
/// `text`. Entities are left alone.
pub fn strip_tags(text: &str) -> String {
    static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
    TAG.replace_all(text, "").into_owned()
}

/// Returns the first `max_length` characters of `text`, or `None` if the
/// whole text fits.
fn prefix(text: &str, max_length: usize) -> Option<&str> {
    text.char_indices()
        .nth(max_length)
        .map(|(offset, _)| &text[..offset])
}
