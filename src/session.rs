//! Session domain: durable per-conversation state and its compact summary.

pub mod state;
pub mod summary;

pub use state::{ConversationTurn, SessionFault, SessionState, TurnRole};
pub use summary::summarize;
