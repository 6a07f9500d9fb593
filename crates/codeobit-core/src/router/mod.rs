//! Input routing.
//!
//! - `action`: the closed `Action` set and typed `Command`s
//! - `builtin`: builtin slash command table
//! - `parse`: slash command argument parsing (`ArgError`)
//! - `mentions`: `@path` reference extraction and resolution
//! - `intent`: keyword intent classification
//! - `command_router`: `CommandRouter::route`

mod action;
pub mod builtin;
mod command_router;
mod intent;
mod mentions;
mod parse;

pub use action::{
    Action, Command, DesignEntry, FileReference, GenerateOperation, GenerateRequest,
    NaturalLanguageRequest, ProjectCommand, ProviderCommand, SlashCommand,
};
pub use builtin::{BuiltinSlashCommand, builtin_commands, find_builtin_command};
pub use command_router::CommandRouter;
pub use intent::Intent;
pub use mentions::{MentionResolver, WELL_KNOWN_DIRS, extract_mentions};
pub use parse::ArgError;
