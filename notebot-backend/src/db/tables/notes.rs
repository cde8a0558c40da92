//! Note storage: the only writer of `notes`.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::super::sqlite::{format_timestamp, parse_timestamp};
use super::super::{Database, DbResult};
use crate::models::{Note, NoteSource};
use crate::words::count_words;

/// Upper bound for `list_recent_notes`
pub const MAX_RECENT_NOTES: usize = 50;

const NOTE_COLUMNS: &str =
    "id, content, word_count, created_at, updated_at, source_message_id, source_chat_id";

impl Database {
    /// Insert a note; the word count is derived from `content`
    pub fn insert_note(&self, content: &str, source: &NoteSource) -> DbResult<Note> {
        let conn = self.conn()?;
        let now_str = format_timestamp(&Utc::now());
        // Reparsed so the returned note matches the stored millisecond precision
        let now = parse_timestamp(0, &now_str)?;
        let word_count = count_words(content) as i64;

        conn.execute(
            "INSERT INTO notes (content, word_count, source, source_message_id, source_chat_id, created_at, updated_at)
             VALUES (?1, ?2, 'telegram', ?3, ?4, ?5, ?5)",
            params![
                content,
                word_count,
                source.message_id,
                source.chat_id,
                &now_str,
            ],
        )?;

        Ok(Note {
            id: conn.last_insert_rowid(),
            content: content.to_string(),
            word_count,
            created_at: now,
            updated_at: now,
            source_message_id: source.message_id.clone(),
            source_chat_id: source.chat_id.clone(),
        })
    }

    /// Replace a note's content. Returns false when the note no longer exists.
    pub fn update_note(&self, note_id: i64, content: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let now_str = format_timestamp(&Utc::now());
        let word_count = count_words(content) as i64;

        let changed = conn.execute(
            "UPDATE notes SET content = ?1, word_count = ?2, updated_at = ?3 WHERE id = ?4",
            params![content, word_count, &now_str, note_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a note. Returns false when it was already gone.
    pub fn delete_note(&self, note_id: i64) -> DbResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM notes WHERE id = ?1", params![note_id])?;
        Ok(changed > 0)
    }

    pub fn get_note(&self, note_id: i64) -> DbResult<Option<Note>> {
        let conn = self.conn()?;
        let note = conn
            .query_row(
                &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
                params![note_id],
                Self::row_to_note,
            )
            .optional()?;
        Ok(note)
    }

    /// All notes, newest first (created_at DESC, id DESC)
    pub fn list_notes(&self) -> DbResult<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes ORDER BY created_at DESC, id DESC",
            NOTE_COLUMNS
        ))?;
        let notes = stmt
            .query_map([], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    /// Most recent notes for chat menus; `limit` is clamped to `[1, MAX_RECENT_NOTES]`
    pub fn list_recent_notes(&self, limit: usize) -> DbResult<Vec<Note>> {
        let limit = limit.clamp(1, MAX_RECENT_NOTES) as i64;
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes ORDER BY created_at DESC, id DESC LIMIT ?1",
            NOTE_COLUMNS
        ))?;
        let notes = stmt
            .query_map(params![limit], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    fn row_to_note(row: &Row) -> rusqlite::Result<Note> {
        let created_at_str: String = row.get(3)?;
        let updated_at_str: String = row.get(4)?;

        Ok(Note {
            id: row.get(0)?,
            content: row.get(1)?,
            word_count: row.get(2)?,
            created_at: parse_timestamp(3, &created_at_str)?,
            updated_at: parse_timestamp(4, &updated_at_str)?,
            source_message_id: row.get(5)?,
            source_chat_id: row.get(6)?,
        })
    }
}
