//! Whitespace cleanup shared by extraction, paste ingestion and chunking.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_CRLF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").unwrap());
static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());
static RE_SPACE_AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n ?").unwrap());
static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Collapse 3+ newlines to a blank line, runs of spaces/tabs to one space, trim.
pub fn clean_text(input: &str) -> String {
    let text = RE_CRLF.replace_all(input, "\n");
    let text = RE_HORIZONTAL_WS.replace_all(&text, " ");
    let text = RE_SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = RE_EXCESS_NEWLINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Length in characters, the unit every size limit in the crate is measured in.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Suffix of `text` starting at character `offset` (empty when past the end).
pub fn tail_from_char(text: &str, offset: usize) -> &str {
    match text.char_indices().nth(offset) {
        Some((byte_idx, _)) => &text[byte_idx..],
        None => "",
    }
}

/// Move `offset` back to the first character of the word containing it.
pub fn word_start(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut idx = offset.min(chars.len());
    while idx > 0 && !chars[idx - 1].is_whitespace() {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_blank_lines() {
        let raw = "  Title\t\t here \r\n\r\n\r\n\r\nBody   text \n\n\n\nend  ";
        assert_eq!(clean_text(raw), "Title here\n\nBody text\n\nend");
    }

    #[test]
    fn keeps_single_blank_line() {
        assert_eq!(clean_text("a\n\nb\nc"), "a\n\nb\nc");
    }

    #[test]
    fn tail_respects_multibyte_chars() {
        assert_eq!(tail_from_char("안녕하세요 세계", 6), "세계");
        assert_eq!(tail_from_char("abc", 3), "");
        assert_eq!(tail_from_char("abc", 10), "");
    }

    #[test]
    fn word_start_snaps_back() {
        let text = "hello brave world";
        assert_eq!(word_start(text, 8), 6);
        assert_eq!(word_start(text, 6), 6);
        assert_eq!(word_start(text, 2), 0);
        assert_eq!(word_start(text, 99), 12);
    }
}
