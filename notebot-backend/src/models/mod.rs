pub mod note;
pub mod session;
pub mod thought;

pub use note::{Note, NoteSource, NotesDayGroup, NotesPage};
pub use session::{ConversationState, SessionState, TelegramSession};
pub use thought::{RateLimitDecision, ThoughtSubmission};
