//! Background expiry sweeps.
//!
//! The [`Reaper`] is a tokio task that periodically calls [`Sweep::sweep`]
//! on its target, removing expired entries even for keys nobody reads
//! again. It is stopped with a watch-channel signal checked between sweeps;
//! [`Reaper::shutdown`] waits for an in-flight sweep to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{HuginnError, Result};

/// Something the reaper can sweep.
pub trait Sweep: Send + Sync + 'static {
    /// Remove expired entries, returning how many were removed.
    fn sweep(&self) -> usize;
}

/// Handle to a running sweep task.
#[derive(Debug)]
pub struct Reaper {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Spawn the sweep loop onto the current tokio runtime.
    ///
    /// The first sweep runs one `interval` after spawning. Returns a
    /// configuration error when called outside a runtime.
    pub fn spawn<S: Sweep>(target: Arc<S>, interval: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            HuginnError::Configuration("cache reaper requires a tokio runtime".to_string())
        })?;
        if interval.is_zero() {
            return Err(HuginnError::Configuration(
                "reaper interval must be non-zero".to_string(),
            ));
        }

        let (stop, mut stopped) = watch::channel(false);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "cache reaper started");

            loop {
                tokio::select! {
                    biased;
                    // Err means every sender is gone; treat it as a stop.
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        let removed = target.sweep();
                        if removed > 0 {
                            debug!(removed, "reaper swept expired entries");
                        }
                    }
                }
            }

            info!("cache reaper stopped");
        });

        Ok(Self { stop, handle })
    }

    /// Signal the task to exit without waiting for it.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the task and wait until it has exited.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "cache reaper exited abnormally");
        }
    }
}
