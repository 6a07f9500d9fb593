//! Builtin slash commands.
//!
//! The table is built once on first access and drives name/alias lookup,
//! `/help` output and REPL completion.

use serde::Serialize;
use std::sync::OnceLock;

/// A builtin slash command.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinSlashCommand {
    /// Command name (without the leading /)
    pub name: &'static str,
    /// Alternative names, also without the leading /
    pub aliases: &'static [&'static str],
    /// Usage format (e.g., "/help [command]")
    pub usage: &'static str,
    /// Human-readable description
    pub description: &'static str,
}

impl BuiltinSlashCommand {
    pub const fn new(
        name: &'static str,
        aliases: &'static [&'static str],
        usage: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            aliases,
            usage,
            description,
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

static BUILTIN_COMMANDS: OnceLock<Vec<BuiltinSlashCommand>> = OnceLock::new();

/// Returns all builtin slash commands.
pub fn builtin_commands() -> &'static [BuiltinSlashCommand] {
    BUILTIN_COMMANDS.get_or_init(|| {
        vec![
            BuiltinSlashCommand::new(
                "help",
                &["h"],
                "/help [command]",
                "Show available commands and their usage",
            ),
            BuiltinSlashCommand::new(
                "quickstart",
                &["q"],
                "/quickstart",
                "Show a short guide to the most common workflows",
            ),
            BuiltinSlashCommand::new(
                "status",
                &["s"],
                "/status",
                "Show provider, project, token usage and pending auto-saves",
            ),
            BuiltinSlashCommand::new(
                "history",
                &["hist"],
                "/history",
                "Show conversation history",
            ),
            BuiltinSlashCommand::new(
                "clear",
                &["cls", "c"],
                "/clear",
                "Clear the screen and conversation history",
            ),
            BuiltinSlashCommand::new(
                "theme",
                &["t"],
                "/theme [auto|dark|light]",
                "Show or change the color theme",
            ),
            BuiltinSlashCommand::new(
                "provider",
                &[],
                "/provider [list|set <id>]",
                "List AI providers or switch the active one",
            ),
            BuiltinSlashCommand::new(
                "project",
                &[],
                "/project [status|new|open|requirements|design|notes|save|help]",
                "Manage the project notebook",
            ),
            BuiltinSlashCommand::new(
                "generate",
                &[],
                "/generate <prompt> [--out <path>]",
                "Generate code and save it as an artifact",
            ),
            BuiltinSlashCommand::new(
                "analyze",
                &[],
                "/analyze <prompt>",
                "Analyze code or a design and save a report",
            ),
            BuiltinSlashCommand::new(
                "test",
                &[],
                "/test <prompt> [--out <path>]",
                "Generate tests and save them as an artifact",
            ),
            BuiltinSlashCommand::new(
                "docs",
                &[],
                "/docs <prompt> [--out <path>]",
                "Generate documentation and save it as an artifact",
            ),
            BuiltinSlashCommand::new(
                "browse",
                &[],
                "/browse <url>",
                "Fetch a web page and save a summary report",
            ),
            BuiltinSlashCommand::new(
                "versions",
                &[],
                "/versions <path>",
                "List saved versions of an artifact",
            ),
            BuiltinSlashCommand::new(
                "recover",
                &[],
                "/recover <path> [--version <n>]",
                "Show the latest (or a specific) saved version of an artifact",
            ),
            BuiltinSlashCommand::new(
                "exit",
                &["quit", "bye"],
                "/exit",
                "Flush pending saves and leave",
            ),
        ]
    })
}

/// Find a builtin command by name or alias (case-insensitive).
pub fn find_builtin_command(name: &str) -> Option<&'static BuiltinSlashCommand> {
    builtin_commands().iter().find(|cmd| cmd.matches(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_commands_initialized() {
        let commands = builtin_commands();
        assert!(!commands.is_empty());
        assert!(commands.iter().any(|c| c.name == "help"));
        assert!(commands.iter().any(|c| c.name == "project"));
    }

    #[test]
    fn test_find_builtin_command_by_alias() {
        assert_eq!(find_builtin_command("hist").map(|c| c.name), Some("history"));
        assert_eq!(find_builtin_command("CLS").map(|c| c.name), Some("clear"));
        assert_eq!(find_builtin_command("bye").map(|c| c.name), Some("exit"));
        assert_eq!(find_builtin_command("q").map(|c| c.name), Some("quickstart"));
        assert!(find_builtin_command("nonexistent").is_none());
    }
}
