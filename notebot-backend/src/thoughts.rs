//! Anonymous "thoughts" on published notes, relayed to the author's chat.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::db::{Database, DbError};
use crate::models::{Note, RateLimitDecision};
use crate::telegram::{ChatTransport, OutboundMessage};

static X_HANDLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,15}$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("NOTE_NOT_FOUND")]
    NoteNotFound,
    #[error("chat transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Store(#[from] DbError),
}

/// `@handle` senders get a profile link; anything else is shown verbatim
pub fn format_sender_line(sender: &str) -> String {
    let sender = sender.trim();
    match sender.strip_prefix('@') {
        Some(handle) if X_HANDLE.is_match(handle) => format!("{} (https://x.com/{})", sender, handle),
        _ => sender.to_string(),
    }
}

fn thought_text(note_id: i64, sender: &str, message: &str, received_at: DateTime<Utc>) -> String {
    format!(
        "💬 New thought on note #{}\nFrom: {}\nReceived: {}\n\n{}",
        note_id,
        format_sender_line(sender),
        received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        message
    )
}

/// Where a thought about `note` should go: the originating chat when known,
/// threaded under the original message when that is known too.
fn destination(note: &Note, fallback_chat_id: &str) -> (String, Option<i64>) {
    let source_chat = note
        .source_chat_id
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let reply_to = source_chat.and(
        note.source_message_id
            .as_deref()
            .and_then(|id| id.trim().parse::<i64>().ok())
            .filter(|id| *id > 0),
    );

    let chat_id = source_chat.unwrap_or(fallback_chat_id).to_string();
    (chat_id, reply_to)
}

pub struct ThoughtRelay {
    db: Arc<Database>,
    transport: Arc<dyn ChatTransport>,
    fallback_chat_id: String,
}

impl ThoughtRelay {
    pub fn new(db: Arc<Database>, transport: Arc<dyn ChatTransport>, fallback_chat_id: impl Into<String>) -> Self {
        Self {
            db,
            transport,
            fallback_chat_id: fallback_chat_id.into(),
        }
    }

    /// Forward a validated thought. Call only after the rate limiter allowed it.
    pub async fn relay(&self, note_id: i64, sender: &str, message: &str) -> Result<(), RelayError> {
        let note = self.db.get_note(note_id)?.ok_or(RelayError::NoteNotFound)?;

        let (chat_id, reply_to) = destination(&note, &self.fallback_chat_id);
        let mut outbound = OutboundMessage::text(chat_id, thought_text(note.id, sender, message, Utc::now()));
        if let Some(message_id) = reply_to {
            outbound = outbound.replying_to(message_id);
        }

        self.transport.send_message(outbound).await.map_err(|e| {
            log::warn!("[THOUGHTS] Relay for note #{} failed: {}", note.id, e);
            RelayError::Transport(e)
        })?;

        log::info!("[THOUGHTS] Relayed thought on note #{}", note.id);
        Ok(())
    }
}

/// Fixed-window limiter over the `thought_rate_limits` table
pub struct ThoughtRateLimiter {
    db: Arc<Database>,
    max_requests: u32,
    window_secs: i64,
}

impl ThoughtRateLimiter {
    pub fn new(db: Arc<Database>, max_requests: u32, window_secs: i64) -> Self {
        Self {
            db,
            max_requests,
            window_secs,
        }
    }

    pub fn check(&self, key: &str) -> Result<RateLimitDecision, DbError> {
        let decision = self
            .db
            .consume_rate_limit(key, self.max_requests, self.window_secs, Utc::now())?;
        if !decision.allowed {
            log::info!(
                "[THOUGHTS] Rate limit hit for {} (retry in {}s)",
                key,
                decision.retry_after_seconds
            );
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::test_support::temp_db;
    use crate::models::NoteSource;
    use crate::telegram::client::test_support::RecordingTransport;
    use chrono::TimeZone;

    #[test]
    fn test_sender_line() {
        assert_eq!(format_sender_line("@jdoe"), "@jdoe (https://x.com/jdoe)");
        assert_eq!(format_sender_line("@!!!"), "@!!!");
        assert_eq!(format_sender_line("@this_handle_is_too_long"), "@this_handle_is_too_long");
        assert_eq!(format_sender_line("@"), "@");
        assert_eq!(format_sender_line("Jane Doe"), "Jane Doe");
    }

    #[test]
    fn test_thought_text_layout() {
        let at = Utc.with_ymd_and_hms(2026, 2, 24, 8, 30, 0).unwrap();
        assert_eq!(
            thought_text(7, "@jdoe", "nice one", at),
            "💬 New thought on note #7\nFrom: @jdoe (https://x.com/jdoe)\nReceived: 2026-02-24T08:30:00.000Z\n\nnice one"
        );
    }

    #[tokio::test]
    async fn test_deleted_note_is_not_found_and_nothing_sent() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);
        let note = db.insert_note("gone soon", &NoteSource::default()).unwrap();
        db.delete_note(note.id).unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let relay = ThoughtRelay::new(db, transport.clone(), "1001");

        let err = relay.relay(note.id, "anon", "hello").await.unwrap_err();
        assert!(matches!(err, RelayError::NoteNotFound));
        assert_eq!(err.to_string(), "NOTE_NOT_FOUND");
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reply_threads_under_source_message() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);
        let source = NoteSource {
            message_id: Some("321".to_string()),
            chat_id: Some("-100200".to_string()),
        };
        let note = db.insert_note("threaded", &source).unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let relay = ThoughtRelay::new(db, transport.clone(), "1001");
        relay.relay(note.id, "@jdoe", "great note").await.unwrap();

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent.chat_id, "-100200");
        assert_eq!(sent.reply_to_message_id, Some(321));
        assert!(sent.text.ends_with("\n\ngreat note"));
    }

    #[tokio::test]
    async fn test_fallback_destination_without_source() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);
        let orphan_message = NoteSource {
            message_id: Some("44".to_string()),
            chat_id: None,
        };
        let a = db.insert_note("no source", &NoteSource::default()).unwrap();
        let b = db.insert_note("message id only", &orphan_message).unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let relay = ThoughtRelay::new(db, transport.clone(), "1001");
        relay.relay(a.id, "anon", "one").await.unwrap();
        relay.relay(b.id, "anon", "two").await.unwrap();

        for sent in transport.sent() {
            assert_eq!(sent.chat_id, "1001");
            assert_eq!(sent.reply_to_message_id, None);
        }
    }

    #[tokio::test]
    async fn test_bad_source_message_id_sends_standalone() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);
        let source = NoteSource {
            message_id: Some("not-a-number".to_string()),
            chat_id: Some("555".to_string()),
        };
        let note = db.insert_note("odd source", &source).unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let relay = ThoughtRelay::new(db, transport.clone(), "1001");
        relay.relay(note.id, "anon", "hi").await.unwrap();

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent.chat_id, "555");
        assert_eq!(sent.reply_to_message_id, None);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);
        let note = db.insert_note("will fail", &NoteSource::default()).unwrap();

        let relay = ThoughtRelay::new(db, Arc::new(RecordingTransport::failing()), "1001");
        let err = relay.relay(note.id, "anon", "hi").await.unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
    }

    #[test]
    fn test_rate_limiter_exhausts() {
        let (_dir, db) = temp_db();
        let limiter = ThoughtRateLimiter::new(Arc::new(db), 2, 3600);

        assert!(limiter.check("thought:1.2.3.4").unwrap().allowed);
        assert!(limiter.check("thought:1.2.3.4").unwrap().allowed);
        let denied = limiter.check("thought:1.2.3.4").unwrap();
        assert!(!denied.allowed);
        assert!(denied.retry_after_seconds >= 1);
        assert!(limiter.check("thought:5.6.7.8").unwrap().allowed);
    }
}
