//! Word-count policy shared by the new-note and edit flows.
//!
//! A "word" is a maximal run of non-whitespace characters. Counting and
//! truncation tokenize identically so a truncated text always counts to
//! exactly the ceiling.

/// Result of truncating a text to a word ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub text: String,
    pub was_truncated: bool,
    pub total_words: usize,
}

/// Count whitespace-separated words. Blank text counts as zero.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keep at most `max_words` words.
///
/// Text already within the ceiling is returned unchanged (original spacing
/// preserved). Longer text is rejoined with single spaces.
pub fn truncate_to_words(text: &str, max_words: usize) -> Truncation {
    let words: Vec<&str> = text.split_whitespace().collect();
    let total_words = words.len();

    if total_words <= max_words {
        return Truncation {
            text: text.to_string(),
            was_truncated: false,
            total_words,
        };
    }

    Truncation {
        text: words[..max_words].join(" "),
        was_truncated: true,
        total_words,
    }
}

/// Short preview of a text for chat messages, `...` appended when cut.
pub fn preview_text(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    format!("{} ...", words[..max_words].join(" "))
}

/// Collapse whitespace and ellipsize to `max_len` characters (button labels).
pub fn first_line(text: &str, max_len: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_len {
        return collapsed;
    }
    let kept: String = collapsed.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}
