//! Table operations: each module adds an `impl Database` block.

mod notes;
mod telegram_sessions;
mod thought_rate_limits;

pub use notes::MAX_RECENT_NOTES;
