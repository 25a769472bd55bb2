//! Chunking utilities.
//!
//! Text is cut into sentence-like units (a run of text closed by `.`, `!`, `?`
//! or a newline) which are then packed greedily into chunks no longer than the
//! configured limit. A single unit longer than the limit becomes its own
//! oversize chunk; units are never split.

use crate::text_utils::char_len;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default chunk size, in characters.
pub const DEFAULT_CHUNK_CHARS: usize = 500;

static RE_SENTENCE_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?\n]*[.!?\n]+").unwrap());
static RE_WORD_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\S+").unwrap());

/// Split `text` into chunks of at most `limit` characters.
pub fn chunk(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for unit in split_units(text) {
        let unit_len = char_len(unit);
        if !current.is_empty() && current_len + unit_len > limit {
            flush(&mut chunks, &mut current);
            current_len = 0;
        }
        current.push_str(unit);
        current_len += unit_len;
    }
    flush(&mut chunks, &mut current);

    if chunks.is_empty() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            tracing::warn!(
                chars = char_len(trimmed),
                "Chunker produced no boundaries; keeping text as one chunk"
            );
        }
        chunks.push(trimmed.to_string());
    }

    chunks
}

/// Sentence-like units in order; the tail after the last terminator is
/// broken into whitespace-delimited tokens.
fn split_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut consumed = 0usize;

    for found in RE_SENTENCE_UNIT.find_iter(text) {
        if found.start() > consumed {
            let gap = &text[consumed..found.start()];
            units.extend(RE_WORD_UNIT.find_iter(gap).map(|m| m.as_str()));
        }
        units.push(found.as_str());
        consumed = found.end();
    }

    if consumed < text.len() {
        units.extend(RE_WORD_UNIT.find_iter(&text[consumed..]).map(|m| m.as_str()));
    }

    units
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}
