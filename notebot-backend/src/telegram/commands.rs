//! Inbound chat commands and button callback tokens.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static NEWNOTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^/newnote(?:@\w+)?(?:\s+(.+))?$").unwrap());
static EDITNOTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/editnote(?:@\w+)?$").unwrap());
static DELETENOTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/deletenote(?:@\w+)?$").unwrap());

/// A text message classified by command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/newnote <text>`; `body` is `None` when nothing follows the command
    NewNote { body: Option<String> },
    EditNote,
    DeleteNote,
    /// Anything else, interpreted against the current session
    Text(String),
}

impl Command {
    /// Classify already-trimmed message text. Commands are case-sensitive and
    /// may carry a `@botname` suffix.
    pub fn parse(text: &str) -> Self {
        if let Some(caps) = NEWNOTE_PATTERN.captures(text) {
            let body = caps
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .filter(|b| !b.is_empty());
            return Command::NewNote { body };
        }
        if EDITNOTE_PATTERN.is_match(text) {
            return Command::EditNote;
        }
        if DELETENOTE_PATTERN.is_match(text) {
            return Command::DeleteNote;
        }
        Command::Text(text.to_string())
    }
}

const EDIT_SELECT_PREFIX: &str = "edit_select_";
const DELETE_SELECT_PREFIX: &str = "delete_select_";

/// Button callback data, as a closed set of actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    NewnoteSaveTruncated,
    NewnoteCancel,
    EditSelect(i64),
    EditSaveTruncated,
    EditCancel,
    DeleteSelect(i64),
    /// A select token whose id is not a positive integer
    InvalidSelection,
    Unrecognized(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        match data {
            "newnote_save_truncated" => return CallbackAction::NewnoteSaveTruncated,
            "newnote_cancel" => return CallbackAction::NewnoteCancel,
            "edit_save_truncated" => return CallbackAction::EditSaveTruncated,
            "edit_cancel" => return CallbackAction::EditCancel,
            _ => {}
        }

        if let Some(id) = data.strip_prefix(EDIT_SELECT_PREFIX) {
            return parse_note_id(id).map_or(CallbackAction::InvalidSelection, CallbackAction::EditSelect);
        }
        if let Some(id) = data.strip_prefix(DELETE_SELECT_PREFIX) {
            return parse_note_id(id).map_or(CallbackAction::InvalidSelection, CallbackAction::DeleteSelect);
        }

        CallbackAction::Unrecognized(data.to_string())
    }
}

fn parse_note_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Renders the callback data token sent with a button
impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::NewnoteSaveTruncated => f.write_str("newnote_save_truncated"),
            CallbackAction::NewnoteCancel => f.write_str("newnote_cancel"),
            CallbackAction::EditSelect(id) => write!(f, "{}{}", EDIT_SELECT_PREFIX, id),
            CallbackAction::EditSaveTruncated => f.write_str("edit_save_truncated"),
            CallbackAction::EditCancel => f.write_str("edit_cancel"),
            CallbackAction::DeleteSelect(id) => write!(f, "{}{}", DELETE_SELECT_PREFIX, id),
            CallbackAction::InvalidSelection => f.write_str("invalid_selection"),
            CallbackAction::Unrecognized(raw) => f.write_str(raw),
        }
    }
}
