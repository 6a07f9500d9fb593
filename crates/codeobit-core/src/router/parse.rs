//! Argument parsing for builtin slash commands.

use super::action::{
    Command, DesignEntry, GenerateOperation, GenerateRequest, ProjectCommand, ProviderCommand,
};
use crate::session::Theme;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Why a slash command's arguments were rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("missing required argument <{0}>")]
    MissingArgument(&'static str),

    #[error("flag --{0} requires a value")]
    MissingFlagValue(String),

    #[error("unknown flag --{0}")]
    UnknownFlag(String),

    #[error("invalid {name} '{value}' (expected {expected})")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

/// Positional arguments and `--flag value` pairs.
#[derive(Debug, Default)]
struct ParsedArgs {
    positional: Vec<String>,
    flags: BTreeMap<String, String>,
}

impl ParsedArgs {
    /// Splits `--name value` and `--name=value` flags from positionals.
    fn parse(args: &[String], allowed: &[&str]) -> Result<Self, ArgError> {
        let mut parsed = ParsedArgs::default();
        let mut iter = args.iter().peekable();

        while let Some(arg) = iter.next() {
            let Some(flag) = arg.strip_prefix("--").filter(|f| !f.is_empty()) else {
                parsed.positional.push(arg.clone());
                continue;
            };

            let (name, inline_value) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (flag, None),
            };
            if !allowed.contains(&name) {
                return Err(ArgError::UnknownFlag(name.to_string()));
            }

            let value = match inline_value {
                Some(value) => value,
                None => iter
                    .next_if(|next| !next.starts_with("--"))
                    .cloned()
                    .ok_or_else(|| ArgError::MissingFlagValue(name.to_string()))?,
            };
            if value.is_empty() {
                return Err(ArgError::MissingFlagValue(name.to_string()));
            }
            parsed.flags.insert(name.to_string(), value);
        }

        Ok(parsed)
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    fn no_positional(&self) -> Result<(), ArgError> {
        match self.positional.first() {
            Some(extra) => Err(ArgError::UnexpectedArgument(extra.clone())),
            None => Ok(()),
        }
    }

    fn at_most_one(&self) -> Result<Option<&str>, ArgError> {
        if let Some(extra) = self.positional.get(1) {
            return Err(ArgError::UnexpectedArgument(extra.clone()));
        }
        Ok(self.positional.first().map(String::as_str))
    }

    fn exactly_one(&self, name: &'static str) -> Result<&str, ArgError> {
        self.at_most_one()?.ok_or(ArgError::MissingArgument(name))
    }
}

fn joined(parts: &[String]) -> Option<String> {
    let text = parts.join(" ");
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses arguments for a canonical builtin command name.
///
/// Returns `None` when `name` is not a parseable builtin (callers map that to
/// `UnknownCommand`).
pub(crate) fn parse_command(name: &str, args: &[String]) -> Option<Result<Command, ArgError>> {
    let result = match name {
        "help" => ParsedArgs::parse(args, &[]).and_then(|p| {
            Ok(Command::Help {
                topic: p.at_most_one()?.map(|t| t.trim_start_matches('/').to_lowercase()),
            })
        }),
        "quickstart" => no_args(args, Command::Quickstart),
        "status" => no_args(args, Command::Status),
        "history" => no_args(args, Command::History),
        "clear" => no_args(args, Command::Clear),
        "theme" => parse_theme(args),
        "provider" => parse_provider(args),
        "project" => parse_project(args),
        "generate" => parse_generate(GenerateOperation::Generate, args),
        "analyze" => parse_generate(GenerateOperation::Analyze, args),
        "test" => parse_generate(GenerateOperation::Test, args),
        "docs" => parse_generate(GenerateOperation::Docs, args),
        "browse" => ParsedArgs::parse(args, &[]).and_then(|p| {
            Ok(Command::Browse {
                url: p.exactly_one("url")?.to_string(),
            })
        }),
        "versions" => ParsedArgs::parse(args, &[]).and_then(|p| {
            Ok(Command::Versions {
                logical_path: p.exactly_one("path")?.to_string(),
            })
        }),
        "recover" => parse_recover(args),
        _ => return None,
    };
    Some(result)
}

fn no_args(args: &[String], command: Command) -> Result<Command, ArgError> {
    ParsedArgs::parse(args, &[])?.no_positional()?;
    Ok(command)
}

fn parse_theme(args: &[String]) -> Result<Command, ArgError> {
    let parsed = ParsedArgs::parse(args, &[])?;
    let theme = parsed
        .at_most_one()?
        .map(|value| {
            Theme::from_str(value).map_err(|_| ArgError::InvalidValue {
                name: "theme",
                value: value.to_string(),
                expected: "auto, dark or light",
            })
        })
        .transpose()?;
    Ok(Command::Theme { theme })
}

fn parse_provider(args: &[String]) -> Result<Command, ArgError> {
    let parsed = ParsedArgs::parse(args, &[])?;
    let (sub, rest) = match parsed.positional.split_first() {
        None => return Ok(Command::Provider(ProviderCommand::List)),
        Some((sub, rest)) => (sub.to_lowercase(), rest),
    };

    match sub.as_str() {
        "list" => {
            if let Some(extra) = rest.first() {
                return Err(ArgError::UnexpectedArgument(extra.clone()));
            }
            Ok(Command::Provider(ProviderCommand::List))
        }
        "set" => match rest {
            [] => Err(ArgError::MissingArgument("provider-id")),
            [id] => Ok(Command::Provider(ProviderCommand::Set {
                provider_id: id.clone(),
            })),
            [_, extra, ..] => Err(ArgError::UnexpectedArgument(extra.clone())),
        },
        _ => Err(ArgError::InvalidValue {
            name: "subcommand",
            value: sub,
            expected: "list or set",
        }),
    }
}

fn parse_project(args: &[String]) -> Result<Command, ArgError> {
    let parsed = ParsedArgs::parse(args, &["to"])?;
    let (sub, rest) = match parsed.positional.split_first() {
        None => return Ok(Command::Project(ProjectCommand::Status)),
        Some((sub, rest)) => (sub.to_lowercase(), rest),
    };

    if sub != "save" && parsed.flag("to").is_some() {
        return Err(ArgError::UnknownFlag("to".to_string()));
    }

    let command = match sub.as_str() {
        "status" | "help" => {
            if let Some(extra) = rest.first() {
                return Err(ArgError::UnexpectedArgument(extra.clone()));
            }
            if sub == "status" {
                ProjectCommand::Status
            } else {
                ProjectCommand::Help
            }
        }
        "new" | "init" => ProjectCommand::New {
            name: joined(rest).ok_or(ArgError::MissingArgument("name"))?,
        },
        "open" => match rest {
            [] => return Err(ArgError::MissingArgument("path")),
            [path] => ProjectCommand::Open {
                path: PathBuf::from(path),
            },
            [_, extra, ..] => return Err(ArgError::UnexpectedArgument(extra.clone())),
        },
        "requirements" | "req" => ProjectCommand::Requirements {
            add: parse_add(rest)?,
        },
        "design" => ProjectCommand::Design {
            set: parse_design(rest)?,
        },
        "notes" => ProjectCommand::Notes {
            add: parse_add(rest)?,
        },
        "save" => {
            if let Some(extra) = rest.first() {
                return Err(ArgError::UnexpectedArgument(extra.clone()));
            }
            ProjectCommand::Save {
                target: parsed.flag("to").map(PathBuf::from),
            }
        }
        _ => {
            return Err(ArgError::InvalidValue {
                name: "subcommand",
                value: sub,
                expected: "status, new, open, requirements, design, notes, save or help",
            });
        }
    };

    Ok(Command::Project(command))
}

/// `[]` lists, `["set", section, text...]` replaces one section.
fn parse_design(rest: &[String]) -> Result<Option<DesignEntry>, ArgError> {
    match rest.split_first() {
        None => Ok(None),
        Some((verb, args)) if verb.eq_ignore_ascii_case("set") => {
            let (section, text) = args
                .split_first()
                .ok_or(ArgError::MissingArgument("section"))?;
            Ok(Some(DesignEntry {
                section: section.to_lowercase(),
                text: joined(text).ok_or(ArgError::MissingArgument("text"))?,
            }))
        }
        Some((extra, _)) => Err(ArgError::UnexpectedArgument(extra.clone())),
    }
}

/// `[]` lists, `["add", text...]` appends.
fn parse_add(rest: &[String]) -> Result<Option<String>, ArgError> {
    match rest.split_first() {
        None => Ok(None),
        Some((verb, text)) if verb.eq_ignore_ascii_case("add") => {
            joined(text).map(Some).ok_or(ArgError::MissingArgument("text"))
        }
        Some((extra, _)) => Err(ArgError::UnexpectedArgument(extra.clone())),
    }
}

fn parse_generate(operation: GenerateOperation, args: &[String]) -> Result<Command, ArgError> {
    let allowed: &[&str] = match operation {
        GenerateOperation::Analyze => &[],
        _ => &["out"],
    };
    let parsed = ParsedArgs::parse(args, allowed)?;
    let prompt = joined(&parsed.positional).ok_or(ArgError::MissingArgument("prompt"))?;

    Ok(Command::Generate(GenerateRequest {
        operation,
        prompt,
        output: parsed.flag("out").map(PathBuf::from),
    }))
}

fn parse_recover(args: &[String]) -> Result<Command, ArgError> {
    let parsed = ParsedArgs::parse(args, &["version"])?;
    let logical_path = parsed.exactly_one("path")?.to_string();
    let version = parsed
        .flag("version")
        .map(|value| {
            value
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| ArgError::InvalidValue {
                    name: "version",
                    value: value.to_string(),
                    expected: "a positive integer",
                })
        })
        .transpose()?;

    Ok(Command::Recover {
        logical_path,
        version,
    })
}
