use clap::Parser;
use std::path::PathBuf;

/// Interactive AI software engineering assistant.
#[derive(Parser, Debug)]
#[command(name = "codeobit", version, about = "codeobit - AI software engineering assistant", long_about = None)]
pub struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level used when CODEOBIT_LOG is not set
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Mirror logs to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory for versioned auto-saves (overrides autosave.directory)
    #[arg(long, value_name = "DIR")]
    pub autosave_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["codeobit"]).unwrap();
        assert_eq!(cli.log_level, "info");
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        assert!(cli.autosave_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "codeobit",
            "--config",
            "/tmp/c.toml",
            "-v",
            "--log-level",
            "debug",
            "--autosave-dir",
            "saves",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(cli.verbose);
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.autosave_dir, Some(PathBuf::from("saves")));
    }
}
