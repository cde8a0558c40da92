//! Conversational session state for the Telegram authoring workflow.
//!
//! The stored row is a single slot per user. `ConversationState` is the total
//! view used by the workflow: "no row" (or an expired row) is `Idle`, and the
//! data each waiting state needs is carried by the variant itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Value of the `state` column in `telegram_sessions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    AwaitingEditText,
    AwaitingNewnoteTruncateConfirm,
    AwaitingEditTruncateConfirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    /// A note was picked from the edit menu; next free text replaces it
    AwaitingEditText { note_id: i64 },
    /// An over-limit `/newnote` was truncated and awaits confirmation
    AwaitingNewnoteTruncateConfirm { pending_content: String },
    /// An over-limit edit was truncated and awaits confirmation
    AwaitingEditTruncateConfirm { note_id: i64, pending_content: String },
}

impl ConversationState {
    /// Column value for this state, `None` for `Idle` (which is never stored)
    pub fn session_state(&self) -> Option<SessionState> {
        match self {
            Self::Idle => None,
            Self::AwaitingEditText { .. } => Some(SessionState::AwaitingEditText),
            Self::AwaitingNewnoteTruncateConfirm { .. } => {
                Some(SessionState::AwaitingNewnoteTruncateConfirm)
            }
            Self::AwaitingEditTruncateConfirm { .. } => Some(SessionState::AwaitingEditTruncateConfirm),
        }
    }

    pub fn selected_note_id(&self) -> Option<i64> {
        match self {
            Self::AwaitingEditText { note_id } | Self::AwaitingEditTruncateConfirm { note_id, .. } => {
                Some(*note_id)
            }
            _ => None,
        }
    }

    pub fn pending_content(&self) -> Option<&str> {
        match self {
            Self::AwaitingNewnoteTruncateConfirm { pending_content }
            | Self::AwaitingEditTruncateConfirm { pending_content, .. } => Some(pending_content),
            _ => None,
        }
    }

    /// Rebuild from stored columns. Returns `None` when the row breaks the
    /// per-state requirements (missing note id or pending content).
    pub fn from_columns(
        state: SessionState,
        selected_note_id: Option<i64>,
        pending_content: Option<String>,
    ) -> Option<Self> {
        match state {
            SessionState::AwaitingEditText => {
                selected_note_id.map(|note_id| Self::AwaitingEditText { note_id })
            }
            SessionState::AwaitingNewnoteTruncateConfirm => pending_content
                .map(|pending_content| Self::AwaitingNewnoteTruncateConfirm { pending_content }),
            SessionState::AwaitingEditTruncateConfirm => match (selected_note_id, pending_content) {
                (Some(note_id), Some(pending_content)) => {
                    Some(Self::AwaitingEditTruncateConfirm { note_id, pending_content })
                }
                _ => None,
            },
        }
    }
}

/// A live (non-expired) session row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSession {
    pub user_id: String,
    pub state: ConversationState,
    pub expires_at: DateTime<Utc>,
}
