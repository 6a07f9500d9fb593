//! Background ticker that persists queued artifacts, and the exit flush.

use codeobit_infrastructure::{AutoSaveManager, PendingSave};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout, timeout_at};
use tokio_util::sync::CancellationToken;

/// Result of the final flush performed on shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushStatus {
    /// Every queued artifact was saved (possibly none)
    Flushed { saved: usize },
    /// Some artifacts could not be saved; they are listed by logical path
    Failed { saved: usize, failed: Vec<String> },
    /// The flush did not finish within the timeout
    TimedOut { pending: Vec<String> },
}

impl FlushStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FlushStatus::Flushed { .. })
    }
}

/// Runs [`AutoSaveManager::scheduled_tick`] on a fixed interval.
///
/// Ticks run on the blocking pool so slow disks never stall the REPL, and the
/// manager's per-path locks keep them exclusive with foreground saves.
pub struct AutoSaveScheduler {
    manager: Arc<AutoSaveManager>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl AutoSaveScheduler {
    /// Spawns the ticker on the current tokio runtime.
    pub fn start(manager: Arc<AutoSaveManager>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_ticker(Arc::clone(&manager), period, cancel.clone()));
        tracing::info!(interval_secs = period.as_secs(), "Auto-save scheduler started");
        Self {
            manager,
            cancel,
            handle,
        }
    }

    pub fn manager(&self) -> &Arc<AutoSaveManager> {
        &self.manager
    }

    /// Stops the ticker and flushes everything still queued.
    ///
    /// `flush_timeout` bounds the whole shutdown, including waiting for a
    /// tick that is still writing. A ticker that does not stop in time is
    /// aborted and everything queued is reported as pending.
    pub async fn shutdown(self, flush_timeout: Duration) -> FlushStatus {
        let deadline = Instant::now() + flush_timeout;
        self.cancel.cancel();

        let mut handle = self.handle;
        match timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Auto-save ticker ended abnormally"),
            Err(_) => {
                handle.abort();
                let pending = self.manager.pending_paths();
                tracing::error!(
                    timeout_ms = flush_timeout.as_millis() as u64,
                    pending = pending.len(),
                    "Auto-save ticker still busy at shutdown deadline"
                );
                return FlushStatus::TimedOut { pending };
            }
        }

        flush_with_timeout(self.manager, deadline.saturating_duration_since(Instant::now())).await
    }
}

async fn run_ticker(manager: Arc<AutoSaveManager>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Auto-save ticker cancelled");
                break;
            }
            _ = ticker.tick() => {
                if manager.pending_count() == 0 {
                    continue;
                }
                let tick_manager = Arc::clone(&manager);
                match tokio::task::spawn_blocking(move || tick_manager.scheduled_tick()).await {
                    Ok(results) => log_results("tick", &results),
                    Err(e) => tracing::error!(error = %e, "Auto-save tick panicked"),
                }
            }
        }
    }
}

/// Flushes the manager's queue on the blocking pool, bounded by `limit`.
pub async fn flush_with_timeout(manager: Arc<AutoSaveManager>, limit: Duration) -> FlushStatus {
    let flush_manager = Arc::clone(&manager);
    let flush = tokio::task::spawn_blocking(move || flush_manager.flush());

    match timeout(limit, flush).await {
        Ok(Ok(results)) => {
            log_results("flush", &results);
            let failed: Vec<String> = results
                .iter()
                .filter(|r| r.result.is_err())
                .map(|r| r.logical_path.clone())
                .collect();
            let saved = results.len() - failed.len();
            if failed.is_empty() {
                FlushStatus::Flushed { saved }
            } else {
                FlushStatus::Failed { saved, failed }
            }
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Auto-save flush panicked");
            FlushStatus::Failed {
                saved: 0,
                failed: manager.pending_paths(),
            }
        }
        Err(_) => {
            let pending = manager.pending_paths();
            tracing::error!(
                timeout_ms = limit.as_millis() as u64,
                pending = pending.len(),
                "Auto-save flush timed out"
            );
            FlushStatus::TimedOut { pending }
        }
    }
}

fn log_results(phase: &str, results: &[PendingSave]) {
    for pending in results {
        match &pending.result {
            Ok(outcome) => tracing::debug!(
                phase,
                path = %pending.logical_path,
                version = outcome.version_index,
                "Auto-saved"
            ),
            Err(e) => tracing::warn!(
                phase,
                path = %pending.logical_path,
                error = %e,
                "Auto-save failed; will retry"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeobit_core::artifact::ArtifactKind;
    use codeobit_infrastructure::SaveRequest;
    use tempfile::TempDir;

    fn manager(temp_dir: &TempDir) -> Arc<AutoSaveManager> {
        Arc::new(AutoSaveManager::new(
            temp_dir.path().join("autosave"),
            temp_dir.path(),
        ))
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let scheduler = AutoSaveScheduler::start(Arc::clone(&manager), Duration::from_secs(3600));

        manager
            .mark_dirty(SaveRequest::new("notes.md", "hello", ArtifactKind::Doc))
            .unwrap();
        manager
            .mark_dirty(SaveRequest::new("main.rs", "fn main() {}", ArtifactKind::Code))
            .unwrap();

        let status = scheduler.shutdown(Duration::from_secs(5)).await;
        assert_eq!(status, FlushStatus::Flushed { saved: 2 });
        assert_eq!(manager.pending_count(), 0);
        assert_eq!(manager.recover("notes.md", None).unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_ticker_saves_queued_content() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        let scheduler = AutoSaveScheduler::start(Arc::clone(&manager), Duration::from_millis(20));

        manager
            .mark_dirty(SaveRequest::new("draft.md", "v1", ArtifactKind::Doc))
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while manager.pending_count() > 0 && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(manager.pending_count(), 0);
        assert_eq!(manager.history("draft.md").unwrap().len(), 1);

        let status = scheduler.shutdown(Duration::from_secs(5)).await;
        assert_eq!(status, FlushStatus::Flushed { saved: 0 });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_is_bounded_by_a_stalled_tick() {
        use fs2::FileExt;

        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);

        // Holding the index ledger lock parks the tick inside save()
        let dir = manager.version_dir("stuck.md").unwrap();
        std::fs::create_dir_all(&dir).unwrap();
        let held = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join("index.lock"))
            .unwrap();
        held.lock_exclusive().unwrap();

        let scheduler = AutoSaveScheduler::start(Arc::clone(&manager), Duration::from_millis(20));
        manager
            .mark_dirty(SaveRequest::new("stuck.md", "x", ArtifactKind::Doc))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = std::time::Instant::now();
        let status = scheduler.shutdown(Duration::from_millis(100)).await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(
            status,
            FlushStatus::TimedOut {
                pending: vec!["stuck.md".to_string()],
            }
        );

        // Let the parked tick finish so the runtime can shut down
        held.unlock().unwrap();
    }

    #[tokio::test]
    async fn test_flush_reports_failures() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the auto-save directory should be
        let blocker = temp_dir.path().join("blocked");
        std::fs::write(&blocker, "not a dir").unwrap();
        let manager = Arc::new(AutoSaveManager::new(&blocker, temp_dir.path()));

        manager
            .mark_dirty(SaveRequest::new("lost.md", "x", ArtifactKind::Doc))
            .unwrap();

        let status = flush_with_timeout(Arc::clone(&manager), Duration::from_secs(5)).await;
        assert_eq!(
            status,
            FlushStatus::Failed {
                saved: 0,
                failed: vec!["lost.md".to_string()],
            }
        );
        assert!(!status.is_success());
        assert_eq!(manager.pending_count(), 1);
    }
}
