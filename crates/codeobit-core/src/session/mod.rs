//! Session domain module.
//!
//! - `turn`: conversation turn types (`TurnRole`, `ConversationTurn`)
//! - `context`: bounded session state (`SessionContext`, `ProjectRef`, `Theme`)
//! - `usage`: estimated token usage

mod context;
mod turn;
mod usage;

pub use context::{DEFAULT_MAX_TURNS, ProjectRef, SessionContext, Theme};
pub use turn::{ConversationTurn, TurnRole};
pub use usage::{TokenUsage, estimate_tokens};
