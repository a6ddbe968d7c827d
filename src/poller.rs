use crate::api::ApiClient;
use crate::progress::DownloadJobState;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Fixed-period progress poller. It has no notion of the job being done: whoever
/// started it decides when to stop it.
pub struct ProgressPoller {
    api: ApiClient,
    period: Duration,
    // Incremented on every start and stop. A tick only applies its response while
    // the generation it was started under is still current.
    generation: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

impl ProgressPoller {
    pub fn new(api: ApiClient, period: Duration) -> Self {
        Self {
            api,
            period,
            generation: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.token.is_cancelled())
    }

    /// Starts polling, replacing any loop still running. `apply` receives every
    /// successful tick. Dropping the returned guard cancels the loop, so a caller
    /// that is itself cancelled cannot leave it behind.
    pub async fn start<F>(&self, apply: F) -> DropGuard
    where
        F: Fn(DownloadJobState) + Send + 'static,
    {
        self.stop().await;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.generation.clone();
        let token = CancellationToken::new();
        let child = token.clone();
        let api = self.api.clone();
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let result = tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    result = api.progress() => result,
                };

                match result {
                    Ok(state) if current.load(Ordering::SeqCst) == generation => apply(state),
                    Ok(_) => {
                        debug!("Discarding stale progress response (generation {})", generation);
                        break;
                    }
                    Err(e) => warn!("Error fetching progress: {}", e),
                }
            }
        });

        info!("Progress polling started (every {:?})", self.period);
        let guard = token.clone().drop_guard();
        *self.running.lock().await = Some(Running { token, handle });
        guard
    }

    /// Stops the loop and waits for its task to finish, so no tick can land
    /// after this returns.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        if let Some(Running { token, handle }) = running {
            self.generation.fetch_add(1, Ordering::SeqCst);
            token.cancel();
            if let Err(e) = handle.await {
                warn!("Progress poller task ended abnormally: {}", e);
            }
            info!("Progress polling stopped");
        }
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.token.cancel();
        }
    }
}
