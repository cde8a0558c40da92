pub mod client;
pub mod commands;
pub mod types;
pub mod workflow;

pub use client::{ChatTransport, OutboundMessage, TelegramClient};
pub use types::Update;
pub use workflow::NoteWorkflow;
