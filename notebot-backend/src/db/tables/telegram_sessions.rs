//! Conversational session storage, one row per Telegram user.
//!
//! Expiry is lazy: `get_session` deletes and hides a row whose `expires_at`
//! has passed, so callers never see the difference between expired and absent.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::super::sqlite::{format_timestamp, parse_timestamp};
use super::super::{Database, DbResult};
use crate::models::{ConversationState, SessionState, TelegramSession};

struct SessionRow {
    state: String,
    selected_note_id: Option<i64>,
    pending_content: Option<String>,
    expires_at: DateTime<Utc>,
}

impl Database {
    /// Load the user's live session, purging it first if expired or malformed
    pub fn get_session(&self, user_id: &str) -> DbResult<Option<TelegramSession>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT state, selected_note_id, pending_content, expires_at
                 FROM telegram_sessions WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let expires_at_str: String = row.get(3)?;
                    Ok(SessionRow {
                        state: row.get(0)?,
                        selected_note_id: row.get(1)?,
                        pending_content: row.get(2)?,
                        expires_at: parse_timestamp(3, &expires_at_str)?,
                    })
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        if row.expires_at <= Utc::now() {
            log::debug!("[DB] Session for {} expired at {}, discarding", user_id, row.expires_at);
            delete_session(&conn, user_id)?;
            return Ok(None);
        }

        let state = row
            .state
            .parse::<SessionState>()
            .ok()
            .and_then(|s| ConversationState::from_columns(s, row.selected_note_id, row.pending_content));

        match state {
            Some(state) => Ok(Some(TelegramSession {
                user_id: user_id.to_string(),
                state,
                expires_at: row.expires_at,
            })),
            None => {
                log::warn!("[DB] Discarding malformed session row for {} (state '{}')", user_id, row.state);
                delete_session(&conn, user_id)?;
                Ok(None)
            }
        }
    }

    /// Write the user's session with a fresh expiry `ttl` from now.
    /// `Idle` clears the row instead.
    pub fn upsert_session(&self, user_id: &str, state: &ConversationState, ttl: Duration) -> DbResult<()> {
        self.upsert_session_until(user_id, state, Utc::now() + ttl)
    }

    /// Write the user's session with an explicit expiry
    pub fn upsert_session_until(
        &self,
        user_id: &str,
        state: &ConversationState,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let Some(session_state) = state.session_state() else {
            return self.clear_session(user_id);
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO telegram_sessions (user_id, state, selected_note_id, pending_content, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                state = excluded.state,
                selected_note_id = excluded.selected_note_id,
                pending_content = excluded.pending_content,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![
                user_id,
                session_state.as_ref(),
                state.selected_note_id(),
                state.pending_content(),
                format_timestamp(&expires_at),
                format_timestamp(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    pub fn clear_session(&self, user_id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        delete_session(&conn, user_id)?;
        Ok(())
    }
}

fn delete_session(conn: &Connection, user_id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM telegram_sessions WHERE user_id = ?1", params![user_id])
}
