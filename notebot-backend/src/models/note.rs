use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published note.
///
/// `word_count` always matches `crate::words::count_words(&content)`; the store
/// recomputes it on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub content: String,
    pub word_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Telegram message the note was authored from (kept private to the feed)
    #[serde(skip_serializing, default)]
    pub source_message_id: Option<String>,
    /// Telegram chat the note was authored from (kept private to the feed)
    #[serde(skip_serializing, default)]
    pub source_chat_id: Option<String>,
}

impl Note {
    /// UTC calendar date of creation, `YYYY-MM-DD`
    pub fn date_utc(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// Where a new note came from, so thoughts can be threaded back to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSource {
    pub message_id: Option<String>,
    pub chat_id: Option<String>,
}

/// Notes created on the same UTC calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesDayGroup {
    pub date_utc: String,
    pub notes: Vec<Note>,
}

/// One page of the public feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesPage {
    pub page: usize,
    pub page_size: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub total_pages: usize,
    pub groups: Vec<NotesDayGroup>,
}

impl NotesPage {
    /// Total notes across all groups on this page
    pub fn note_count(&self) -> usize {
        self.groups.iter().map(|g| g.notes.len()).sum()
    }
}
