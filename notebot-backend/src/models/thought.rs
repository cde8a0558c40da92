use serde::{Deserialize, Serialize};

pub const MAX_SENDER_CHARS: usize = 80;
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Body of `POST /api/notes/{id}/thoughts`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThoughtSubmission {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ThoughtSubmission {
    /// Trim and length-check both fields, returning `(sender, message)`
    pub fn validate(&self) -> Result<(String, String), String> {
        let sender = self.sender.as_deref().unwrap_or("").trim();
        let message = self.message.as_deref().unwrap_or("").trim();

        if sender.is_empty() || sender.chars().count() > MAX_SENDER_CHARS {
            return Err(format!(
                "sender is required and must be <= {} characters",
                MAX_SENDER_CHARS
            ));
        }
        if message.is_empty() || message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(format!(
                "message is required and must be <= {} characters",
                MAX_MESSAGE_CHARS
            ));
        }

        Ok((sender.to_string(), message.to_string()))
    }
}

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after_seconds: i64,
}
