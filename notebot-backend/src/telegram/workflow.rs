//! Note authoring workflow driven by Telegram updates.
//!
//! Every update is handled statelessly: the only thing carried between two
//! updates is the per-user row in `telegram_sessions`. Store writes are made
//! before any chat notification, and notification failures are logged and
//! swallowed so a flaky Bot API never leaves the store half-updated.

use chrono::Duration;
use std::sync::Arc;

use super::client::{ChatTransport, OutboundMessage};
use super::commands::{CallbackAction, Command};
use super::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update};
use crate::db::{Database, DbResult};
use crate::models::{ConversationState, NoteSource};
use crate::words::{count_words, first_line, preview_text, truncate_to_words, Truncation};

/// Number of notes offered by the edit and delete menus
pub const MENU_NOTE_LIMIT: usize = 20;
const TRUNCATION_PREVIEW_WORDS: usize = 80;

const EMPTY_TEXT_HINT: &str = "Please send text. Use /newnote <text>, /editnote, or /deletenote.";
const NEWNOTE_USAGE: &str = "Usage: /newnote <your note text>";
const IDLE_TEXT_HINT: &str = "Ignored. Use /newnote <text>, /editnote, or /deletenote.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteMenu {
    Edit,
    Delete,
}

impl NoteMenu {
    fn prompt(self) -> &'static str {
        match self {
            NoteMenu::Edit => "Select a note to edit:",
            NoteMenu::Delete => "Select a note to delete:",
        }
    }

    fn empty_text(self) -> &'static str {
        match self {
            NoteMenu::Edit => "No notes available to edit.",
            NoteMenu::Delete => "No notes available to delete.",
        }
    }

    fn button(self, note_id: i64, content: &str) -> InlineKeyboardButton {
        match self {
            NoteMenu::Edit => InlineKeyboardButton::new(
                format!("#{} {}", note_id, first_line(content, 50)),
                CallbackAction::EditSelect(note_id).to_string(),
            ),
            NoteMenu::Delete => InlineKeyboardButton::new(
                format!("Delete #{} {}", note_id, first_line(content, 42)),
                CallbackAction::DeleteSelect(note_id).to_string(),
            ),
        }
    }
}

/// What to say back after a button press
struct CallbackReply {
    answer: String,
    follow_up: Option<String>,
}

impl CallbackReply {
    fn answer(text: impl Into<String>) -> Self {
        Self {
            answer: text.into(),
            follow_up: None,
        }
    }

    fn with_follow_up(mut self, text: impl Into<String>) -> Self {
        self.follow_up = Some(text.into());
        self
    }
}

pub struct NoteWorkflow {
    db: Arc<Database>,
    transport: Arc<dyn ChatTransport>,
    allowed_id: String,
    max_words: usize,
    session_ttl: Duration,
}

impl NoteWorkflow {
    pub fn new(
        db: Arc<Database>,
        transport: Arc<dyn ChatTransport>,
        allowed_id: impl Into<String>,
        max_words: usize,
        session_ttl: Duration,
    ) -> Self {
        Self {
            db,
            transport,
            allowed_id: allowed_id.into(),
            max_words,
            session_ttl,
        }
    }

    /// Process one webhook update. Only store failures surface as errors.
    pub async fn handle_update(&self, update: Update) -> DbResult<()> {
        if let Some(message) = update.message {
            self.handle_message(message).await
        } else if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await
        } else {
            log::debug!("[WORKFLOW] Update {} carries nothing to handle", update.update_id);
            Ok(())
        }
    }

    fn is_allowed(&self, actor_id: &str, chat_id: &str) -> bool {
        actor_id == self.allowed_id || chat_id == self.allowed_id
    }

    async fn handle_message(&self, message: Message) -> DbResult<()> {
        let chat_id = message.chat.id.to_string();
        let user_id = message
            .from
            .as_ref()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| chat_id.clone());

        if !self.is_allowed(&user_id, &chat_id) {
            log::debug!("[WORKFLOW] Dropping message from unauthorized chat {}", chat_id);
            return Ok(());
        }

        let text = message.text.as_deref().map(str::trim).unwrap_or("");
        if text.is_empty() {
            self.notify(OutboundMessage::text(&chat_id, EMPTY_TEXT_HINT)).await;
            return Ok(());
        }

        match Command::parse(text) {
            Command::NewNote { body: None } => {
                self.notify(OutboundMessage::text(&chat_id, NEWNOTE_USAGE)).await;
                Ok(())
            }
            Command::NewNote { body: Some(body) } => {
                self.create_note(&user_id, &chat_id, message.message_id, &body).await
            }
            Command::EditNote => self.send_note_menu(&chat_id, NoteMenu::Edit).await,
            Command::DeleteNote => self.send_note_menu(&chat_id, NoteMenu::Delete).await,
            Command::Text(text) => self.handle_free_text(&user_id, &chat_id, &text).await,
        }
    }

    async fn create_note(&self, user_id: &str, chat_id: &str, message_id: i64, body: &str) -> DbResult<()> {
        let truncation = truncate_to_words(body, self.max_words);
        if truncation.was_truncated {
            let prompt = self.truncation_prompt("Your note", &truncation);
            let state = ConversationState::AwaitingNewnoteTruncateConfirm {
                pending_content: truncation.text,
            };
            self.db.upsert_session(user_id, &state, self.session_ttl)?;
            log::info!(
                "[WORKFLOW] New note over limit ({} words), awaiting truncate confirmation",
                truncation.total_words
            );

            let markup = InlineKeyboardMarkup::single_column([
                InlineKeyboardButton::new("Save truncated", CallbackAction::NewnoteSaveTruncated.to_string()),
                InlineKeyboardButton::new("Cancel/Edit", CallbackAction::NewnoteCancel.to_string()),
            ]);
            self.notify(OutboundMessage::text(chat_id, prompt).with_markup(markup)).await;
            return Ok(());
        }

        let source = NoteSource {
            message_id: Some(message_id.to_string()),
            chat_id: Some(chat_id.to_string()),
        };
        let note = self.db.insert_note(body, &source)?;
        self.db.clear_session(user_id)?;
        log::info!("[WORKFLOW] Saved note #{} ({} words)", note.id, note.word_count);

        self.notify(OutboundMessage::text(
            chat_id,
            format!("Saved note #{} ({} words).", note.id, note.word_count),
        ))
        .await;
        Ok(())
    }

    async fn send_note_menu(&self, chat_id: &str, menu: NoteMenu) -> DbResult<()> {
        let notes = self.db.list_recent_notes(MENU_NOTE_LIMIT)?;
        if notes.is_empty() {
            self.notify(OutboundMessage::text(chat_id, menu.empty_text())).await;
            return Ok(());
        }

        let markup = InlineKeyboardMarkup::single_column(notes.iter().map(|n| menu.button(n.id, &n.content)));
        self.notify(OutboundMessage::text(chat_id, menu.prompt()).with_markup(markup)).await;
        Ok(())
    }

    async fn handle_free_text(&self, user_id: &str, chat_id: &str, text: &str) -> DbResult<()> {
        let state = self
            .db
            .get_session(user_id)?
            .map(|s| s.state)
            .unwrap_or(ConversationState::Idle);

        match state {
            ConversationState::AwaitingEditText { note_id } => {
                self.apply_edit_text(user_id, chat_id, note_id, text).await
            }
            _ => {
                self.notify(OutboundMessage::text(chat_id, IDLE_TEXT_HINT)).await;
                Ok(())
            }
        }
    }

    async fn apply_edit_text(&self, user_id: &str, chat_id: &str, note_id: i64, text: &str) -> DbResult<()> {
        let truncation = truncate_to_words(text, self.max_words);
        if truncation.was_truncated {
            let prompt = self.truncation_prompt("Your edited note", &truncation);
            let state = ConversationState::AwaitingEditTruncateConfirm {
                note_id,
                pending_content: truncation.text,
            };
            self.db.upsert_session(user_id, &state, self.session_ttl)?;
            log::info!(
                "[WORKFLOW] Edit of note #{} over limit ({} words), awaiting truncate confirmation",
                note_id,
                truncation.total_words
            );

            let markup = InlineKeyboardMarkup::single_column([
                InlineKeyboardButton::new("Save truncated edit", CallbackAction::EditSaveTruncated.to_string()),
                InlineKeyboardButton::new("Cancel/Edit", CallbackAction::EditCancel.to_string()),
            ]);
            self.notify(OutboundMessage::text(chat_id, prompt).with_markup(markup)).await;
            return Ok(());
        }

        let updated = self.db.update_note(note_id, text)?;
        self.db.clear_session(user_id)?;

        let reply = if updated {
            log::info!("[WORKFLOW] Updated note #{}", note_id);
            format!("Updated note #{} ({} words).", note_id, count_words(text))
        } else {
            log::info!("[WORKFLOW] Note #{} vanished before its edit was applied", note_id);
            format!("Could not find note #{}.", note_id)
        };
        self.notify(OutboundMessage::text(chat_id, reply)).await;
        Ok(())
    }

    async fn handle_callback(&self, callback: CallbackQuery) -> DbResult<()> {
        let user_id = callback.from.id.to_string();

        let Some(chat_id) = callback.message.as_ref().map(|m| m.chat.id.to_string()) else {
            if user_id == self.allowed_id {
                self.answer(&callback.id, "Missing chat context.").await;
            }
            return Ok(());
        };

        if !self.is_allowed(&user_id, &chat_id) {
            log::debug!("[WORKFLOW] Dropping callback from unauthorized user {}", user_id);
            return Ok(());
        }

        let action = CallbackAction::parse(callback.data.as_deref().unwrap_or(""));
        let reply = self.apply_callback(&user_id, &chat_id, action).await?;

        self.answer(&callback.id, &reply.answer).await;
        if let Some(text) = reply.follow_up {
            self.notify(OutboundMessage::text(&chat_id, text)).await;
        }
        Ok(())
    }

    async fn apply_callback(&self, user_id: &str, chat_id: &str, action: CallbackAction) -> DbResult<CallbackReply> {
        let reply = match action {
            CallbackAction::NewnoteSaveTruncated => {
                let state = self.current_state(user_id)?;
                let ConversationState::AwaitingNewnoteTruncateConfirm { pending_content } = state else {
                    return Ok(CallbackReply::answer("No pending truncated note found."));
                };

                let source = NoteSource {
                    message_id: None,
                    chat_id: Some(chat_id.to_string()),
                };
                let note = self.db.insert_note(&pending_content, &source)?;
                self.db.clear_session(user_id)?;
                log::info!("[WORKFLOW] Saved truncated note #{} ({} words)", note.id, note.word_count);

                CallbackReply::answer("Saved truncated note.").with_follow_up(format!(
                    "Saved truncated note #{} ({} words).",
                    note.id, note.word_count
                ))
            }
            CallbackAction::NewnoteCancel => {
                self.db.clear_session(user_id)?;
                CallbackReply::answer("Cancelled. Send /newnote with revised content.")
            }
            CallbackAction::EditSelect(note_id) => {
                let state = ConversationState::AwaitingEditText { note_id };
                self.db.upsert_session(user_id, &state, self.session_ttl)?;
                CallbackReply::answer(format!("Selected note #{}.", note_id))
                    .with_follow_up(format!("Send replacement text for note #{}.", note_id))
            }
            CallbackAction::EditSaveTruncated => {
                let state = self.current_state(user_id)?;
                let ConversationState::AwaitingEditTruncateConfirm { note_id, pending_content } = state else {
                    return Ok(CallbackReply::answer("No pending truncated edit found."));
                };

                let updated = self.db.update_note(note_id, &pending_content)?;
                self.db.clear_session(user_id)?;
                if !updated {
                    log::info!("[WORKFLOW] Note #{} vanished before its truncated edit was saved", note_id);
                    return Ok(CallbackReply::answer("Note no longer exists."));
                }

                log::info!("[WORKFLOW] Updated note #{} with truncated content", note_id);
                CallbackReply::answer("Saved truncated edit.").with_follow_up(format!(
                    "Updated note #{} with truncated content ({} words).",
                    note_id,
                    count_words(&pending_content)
                ))
            }
            CallbackAction::EditCancel => {
                if let Some(note_id) = self.current_state(user_id)?.selected_note_id() {
                    let state = ConversationState::AwaitingEditText { note_id };
                    self.db.upsert_session(user_id, &state, self.session_ttl)?;
                }
                CallbackReply::answer("Cancelled truncation. Send revised replacement text.")
            }
            CallbackAction::DeleteSelect(note_id) => {
                if self.db.delete_note(note_id)? {
                    log::info!("[WORKFLOW] Deleted note #{}", note_id);
                    CallbackReply::answer(format!("Deleted note #{}.", note_id))
                        .with_follow_up(format!("Deleted note #{}.", note_id))
                } else {
                    CallbackReply::answer("Note no longer exists.").with_follow_up(format!(
                        "Could not delete note #{}; it may have already been removed.",
                        note_id
                    ))
                }
            }
            CallbackAction::InvalidSelection => CallbackReply::answer("Invalid note selection."),
            CallbackAction::Unrecognized(data) => {
                log::debug!("[WORKFLOW] Unrecognized callback data {:?}", data);
                CallbackReply::answer("Unknown action.")
            }
        };
        Ok(reply)
    }

    fn current_state(&self, user_id: &str) -> DbResult<ConversationState> {
        Ok(self
            .db
            .get_session(user_id)?
            .map(|s| s.state)
            .unwrap_or(ConversationState::Idle))
    }

    fn truncation_prompt(&self, subject: &str, truncation: &Truncation) -> String {
        format!(
            "{} has {} words. The max is {}. It will truncate after word {}.\n\nTruncated preview:\n{}",
            subject,
            truncation.total_words,
            self.max_words,
            self.max_words,
            preview_text(&truncation.text, TRUNCATION_PREVIEW_WORDS)
        )
    }

    async fn notify(&self, message: OutboundMessage) {
        let chat_id = message.chat_id.clone();
        if let Err(e) = self.transport.send_message(message).await {
            log::warn!("[TELEGRAM] Failed to send message to chat {}: {}", chat_id, e);
        }
    }

    async fn answer(&self, callback_id: &str, text: &str) {
        if let Err(e) = self.transport.answer_callback(callback_id, text).await {
            log::warn!("[TELEGRAM] Failed to answer callback {}: {}", callback_id, e);
        }
    }
}
