use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;

use codeobit_application::{
    AutoSaveScheduler, InteractionResult, InteractionService, ProjectService,
};
use codeobit_core::ai::{AiCompleter, WebFetcher};
use codeobit_core::config::AppConfig;
use codeobit_core::router::CommandRouter;
use codeobit_core::session::SessionContext;
use codeobit_infrastructure::autosave::DEFAULT_AUTOSAVE_DIR;
use codeobit_infrastructure::{
    AutoSaveManager, CodeobitPaths, ConfigService, OsFileLookup, TomlProjectRepository,
};
use codeobit_interaction::{HttpWebFetcher, ProviderHub};

mod cli;
mod helper;
mod logging;
mod render;

use cli::Cli;
use helper::CliHelper;

/// How long blocking saves may outlive the exit flush before the process
/// exits regardless.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match logging::init(&cli.log_level, cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_stderr("warn");
            eprintln!("{}", format!("File logging disabled: {e:#}").yellow());
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", format!("Error: failed to start async runtime: {e}").red());
            return ExitCode::from(1);
        }
    };

    let code = runtime.block_on(start(&cli));

    // A save that missed the flush deadline may still hold a blocking thread
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    ExitCode::from(code)
}

async fn start(cli: &Cli) -> u8 {
    let (service, config) = match bootstrap(cli) {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Startup failed");
            eprintln!("{}", format!("Error: {e:#}").red());
            return 1;
        }
    };

    match run(service, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "REPL failed");
            eprintln!("{}", format!("Error: {e:#}").red());
            1
        }
    }
}

/// Loads configuration and wires the service graph for the launch directory.
fn bootstrap(cli: &Cli) -> Result<(InteractionService, AppConfig)> {
    let config_service = ConfigService::new(cli.config.clone())?;
    let mut config = config_service.load().with_context(|| {
        format!(
            "Failed to load configuration from {}",
            config_service.path().display()
        )
    })?;
    if let Some(dir) = &cli.autosave_dir {
        config.autosave.directory = Some(dir.clone());
    }

    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    let autosave_root = autosave_root(&config, &cwd);
    tracing::info!(
        config = %config_service.path().display(),
        autosave = %autosave_root.display(),
        "Starting codeobit"
    );

    let mut session = SessionContext::new(config.registry()?, config.session.max_turns);
    session.set_theme(config.ui.theme);

    let hub = ProviderHub::from_config(&config)?;
    let active = session.active_provider();
    if !hub.is_configured(active) {
        eprintln!(
            "{}",
            format!(
                "No API key for {active}; set {} or switch with /provider set <id>",
                active.api_key_env()
            )
            .yellow()
        );
    }
    let completer: Arc<dyn AiCompleter> = Arc::new(hub);
    let fetcher: Arc<dyn WebFetcher> = Arc::new(HttpWebFetcher::new()?);

    let autosave = Arc::new(AutoSaveManager::new(autosave_root, &cwd));
    let projects = ProjectService::new(Arc::new(TomlProjectRepository), Arc::clone(&autosave));
    let router = CommandRouter::new(Arc::new(OsFileLookup), &cwd);

    let mut service = InteractionService::new(
        router,
        session,
        completer,
        fetcher,
        autosave,
        projects,
        config.session.summary_max_chars,
    );
    service.open_project_if_present(&cwd);
    if let Some(project) = service.session().active_project() {
        tracing::info!(name = %project.name, "Opened project notebook");
    }

    Ok((service, config))
}

fn autosave_root(config: &AppConfig, cwd: &Path) -> PathBuf {
    match &config.autosave.directory {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => cwd.join(dir),
        None => cwd.join(DEFAULT_AUTOSAVE_DIR),
    }
}

/// Runs the REPL until exit and returns the process exit code.
async fn run(mut service: InteractionService, config: &AppConfig) -> Result<u8> {
    let scheduler = AutoSaveScheduler::start(
        Arc::clone(service.autosave()),
        Duration::from_secs(config.autosave.interval_secs),
    );

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));
    let history_file = CodeobitPaths::history_file().ok();
    if let Some(path) = &history_file {
        if let Err(e) = rl.load_history(path) {
            tracing::debug!(error = %e, "No REPL history loaded");
        }
    }

    println!("{}", "=== codeobit ===".bright_magenta().bold());
    println!(
        "{}",
        "Describe what you need, reference files with @path, or type /help.".bright_black()
    );
    if let Some(project) = service.session().active_project() {
        println!("{}", format!("Project: {}", project.name).bright_black());
    }
    println!();

    loop {
        let prompt = format!("[{}] >> ", service.session().active_provider());
        match rl.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }

                let result = tokio::select! {
                    result = service.handle_line(&line) => result,
                    _ = tokio::signal::ctrl_c() => {
                        println!("{}", "Request cancelled.".yellow());
                        continue;
                    }
                };

                match &result {
                    InteractionResult::Exit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    InteractionResult::Cleared => {
                        if let Err(e) = rl.clear_screen() {
                            tracing::debug!(error = %e, "Failed to clear screen");
                        }
                        render::print_result(&result, service.session().theme());
                    }
                    other => render::print_result(other, service.session().theme()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /exit to leave.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let saved = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .map_err(ReadlineError::from)
            .and_then(|()| rl.save_history(path));
        if let Err(e) = saved {
            tracing::warn!(error = %e, "Failed to save REPL history");
        }
    }

    let pending = service.autosave().pending_count();
    if pending > 0 {
        println!("{}", format!("Saving {pending} pending artifact(s)...").bright_black());
    }
    let status = scheduler
        .shutdown(Duration::from_secs(config.autosave.flush_timeout_secs))
        .await;
    Ok(render::report_flush(&status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autosave_root_resolution() {
        let cwd = Path::new("/work/app");
        let mut config = AppConfig::default();
        assert_eq!(
            autosave_root(&config, cwd),
            PathBuf::from("/work/app/.codeobit/autosave")
        );

        config.autosave.directory = Some(PathBuf::from("saves"));
        assert_eq!(autosave_root(&config, cwd), PathBuf::from("/work/app/saves"));

        config.autosave.directory = Some(PathBuf::from("/var/saves"));
        assert_eq!(autosave_root(&config, cwd), PathBuf::from("/var/saves"));
    }

    #[test]
    fn test_runtime_shutdown_does_not_wait_for_stuck_saves() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let (release, parked) = std::sync::mpsc::channel::<()>();
        runtime.spawn_blocking(move || {
            let _ = parked.recv();
        });

        let started = std::time::Instant::now();
        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
        assert!(started.elapsed() < Duration::from_secs(3));
        drop(release);
    }
}
