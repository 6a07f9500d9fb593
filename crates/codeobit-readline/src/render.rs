//! Colored terminal output for interaction results.

use codeobit_application::{FlushStatus, InteractionResult, Notice, NoticeLevel};
use codeobit_core::session::Theme;
use colored::{ColoredString, Colorize};

/// Light terminals get the plain colors, everything else the bright ones.
fn paint(text: &str, level: NoticeLevel, theme: Theme) -> ColoredString {
    let light = theme == Theme::Light;
    match (level, light) {
        (NoticeLevel::Info, _) => text.normal(),
        (NoticeLevel::Success, false) => text.bright_green(),
        (NoticeLevel::Success, true) => text.green(),
        (NoticeLevel::Warning, false) => text.bright_yellow(),
        (NoticeLevel::Warning, true) => text.yellow(),
        (NoticeLevel::Error, false) => text.bright_red(),
        (NoticeLevel::Error, true) => text.red(),
    }
}

fn notice_line(notice: &Notice, theme: Theme) -> String {
    paint(&notice.text, notice.level, theme).to_string()
}

/// Lines to print for `result`, colors already applied.
pub fn result_lines(result: &InteractionResult, theme: Theme) -> Vec<String> {
    match result {
        InteractionResult::NoOp | InteractionResult::Exit => Vec::new(),
        InteractionResult::Cleared => {
            vec![paint("History cleared", NoticeLevel::Success, theme).to_string()]
        }
        InteractionResult::Notices(notices) => notices
            .iter()
            .map(|notice| notice_line(notice, theme))
            .collect(),
        InteractionResult::AiResponse {
            provider,
            text,
            notices,
        } => {
            let header = format!("[{provider}]");
            let mut lines = vec![if theme == Theme::Light {
                header.magenta().to_string()
            } else {
                header.bright_magenta().to_string()
            }];
            lines.extend(text.lines().map(|line| {
                if theme == Theme::Light {
                    line.blue().to_string()
                } else {
                    line.bright_blue().to_string()
                }
            }));
            if !notices.is_empty() {
                lines.push(String::new());
                lines.extend(notices.iter().map(|notice| notice_line(notice, theme)));
            }
            lines
        }
    }
}

pub fn print_result(result: &InteractionResult, theme: Theme) {
    for line in result_lines(result, theme) {
        println!("{line}");
    }
}

/// Reports the exit flush and returns the process exit code.
pub fn report_flush(status: &FlushStatus) -> u8 {
    match status {
        FlushStatus::Flushed { saved: 0 } => {}
        FlushStatus::Flushed { saved } => {
            println!("{}", format!("Saved {saved} pending artifact(s)").green());
        }
        FlushStatus::Failed { saved, failed } => {
            eprintln!(
                "{}",
                format!(
                    "Auto-save failed for {} artifact(s) ({saved} saved): {}",
                    failed.len(),
                    failed.join(", ")
                )
                .red()
            );
        }
        FlushStatus::TimedOut { pending } => {
            eprintln!(
                "{}",
                format!(
                    "Auto-save flush timed out; unsaved: {}",
                    pending.join(", ")
                )
                .red()
            );
        }
    }
    exit_code(status)
}

pub fn exit_code(status: &FlushStatus) -> u8 {
    if status.is_success() { 0 } else { 2 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeobit_core::provider::ProviderId;

    #[test]
    fn test_ai_response_lines() {
        colored::control::set_override(false);
        let result = InteractionResult::AiResponse {
            provider: ProviderId::Claude,
            text: "line one\nline two".to_string(),
            notices: vec![Notice::success("Queued foo.md for auto-save")],
        };
        assert_eq!(
            result_lines(&result, Theme::Dark),
            vec![
                "[claude]",
                "line one",
                "line two",
                "",
                "Queued foo.md for auto-save"
            ]
        );
    }

    #[test]
    fn test_silent_results() {
        assert!(result_lines(&InteractionResult::NoOp, Theme::Auto).is_empty());
        assert!(result_lines(&InteractionResult::Exit, Theme::Auto).is_empty());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&FlushStatus::Flushed { saved: 3 }), 0);
        assert_eq!(
            exit_code(&FlushStatus::Failed {
                saved: 1,
                failed: vec!["a.md".into()]
            }),
            2
        );
        assert_eq!(exit_code(&FlushStatus::TimedOut { pending: vec![] }), 2);
    }
}
