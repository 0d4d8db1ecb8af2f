use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::updater::{RatesUpdater, UpdateReport};

/// How long `stop()` waits for the background task to finish.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Runs an update cycle every `interval` on a background tokio task.
///
/// The stop signal is checked between cycles and during the wait, so a
/// cycle that is already fetching finishes before the task exits.
pub struct RatesScheduler {
    updater: Arc<RatesUpdater>,
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl RatesScheduler {
    pub fn new(updater: Arc<RatesUpdater>, interval: Duration) -> Self {
        Self {
            updater,
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the background task. Must be called inside a tokio runtime.
    ///
    /// Returns `false` (and logs a warning) if the scheduler is already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            tracing::warn!("Scheduler is already running");
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.updater),
            self.interval,
            stop_rx,
        ));
        *running = Some(Running { stop_tx, handle });
        tracing::info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        true
    }

    /// Signal the task to stop and wait up to [`STOP_TIMEOUT`] for it.
    pub async fn stop(&self) {
        let taken = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(Running {
            stop_tx,
            mut handle,
        }) = taken
        else {
            return;
        };

        let _ = stop_tx.send(true);
        match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
            Ok(_) => tracing::info!("Scheduler stopped"),
            Err(_) => tracing::warn!(
                timeout_secs = STOP_TIMEOUT.as_secs(),
                "Scheduler did not stop in time; leaving the running cycle detached"
            ),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Run one cycle in the foreground. Errors are logged, never raised.
    pub async fn run_once(&self) -> Option<UpdateReport> {
        run_cycle(&self.updater).await
    }
}

async fn run_cycle(updater: &RatesUpdater) -> Option<UpdateReport> {
    match updater.run_update(None).await {
        Ok(report) => {
            tracing::info!(
                ok = report.ok,
                updated_pairs = report.updated_pairs,
                failed = ?report.failed_sources,
                "Scheduled update finished"
            );
            Some(report)
        }
        Err(e) => {
            tracing::error!(error = %e, "Scheduled update failed");
            None
        }
    }
}

async fn run_loop(updater: Arc<RatesUpdater>, interval: Duration, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            break;
        }
        run_cycle(&updater).await;
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                // Err: sender dropped, treat as stop
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}
