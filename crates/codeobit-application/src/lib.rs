//! Application layer for codeobit.
//!
//! Use cases that coordinate the domain (`codeobit-core`), storage
//! (`codeobit-infrastructure`) and remote collaborators
//! (`codeobit-interaction`) behind a single line-oriented entry point.

pub mod autosave_scheduler;
pub mod file_context;
pub mod interaction_service;
pub mod project_service;
pub mod prompts;
pub mod result;

pub use autosave_scheduler::{AutoSaveScheduler, FlushStatus, flush_with_timeout};
pub use interaction_service::InteractionService;
pub use project_service::ProjectService;
pub use result::{InteractionResult, Notice, NoticeLevel};
