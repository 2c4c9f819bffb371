//! Background compaction trigger.
//!
//! A single periodic task counts the segment files. At or above the
//! threshold it offers a [`Request::Compact`] to a one-slot channel that a
//! single compaction worker drains. If the slot is taken a compaction is
//! already pending and the tick is dropped, so requests never pile up.

use crate::dispatcher::{Dispatcher, Reply};
use crate::error::ServerResult;
use crate::request::Request;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Handle to the running trigger and compaction worker.
#[derive(Debug)]
pub struct CompactionTrigger {
    shutdown: watch::Sender<bool>,
    ticker: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl CompactionTrigger {
    /// Starts the trigger on the current tokio runtime.
    pub fn spawn(dispatcher: Dispatcher, threshold: usize, period: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let (tx, mut rx) = mpsc::channel::<Request>(1);

        let engine = dispatcher.engine().clone();
        let ticker = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        let engine = engine.clone();
                        let count = match tokio::task::spawn_blocking(move || engine.segment_count()).await {
                            Ok(Ok(count)) => count,
                            Ok(Err(e)) => {
                                error!(error = %e, "segment count failed");
                                continue;
                            }
                            Err(e) => {
                                error!(error = %e, "segment count task failed");
                                continue;
                            }
                        };

                        if count < threshold {
                            continue;
                        }
                        match tx.try_send(Request::Compact) {
                            Ok(()) => info!(segments = count, threshold, "compaction requested"),
                            Err(TrySendError::Full(_)) => {
                                debug!(segments = count, "compaction already pending");
                            }
                            Err(TrySendError::Closed(_)) => break,
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("compaction trigger stopped");
                        break;
                    }
                }
            }
        });

        let worker = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match dispatcher.submit(request).await {
                    Ok(Reply::Error(message)) => warn!(error = %message, "compaction failed"),
                    Ok(_) => debug!("compaction pass finished"),
                    Err(e) => error!(error = %e, "compaction task failed"),
                }
            }
        });

        Self {
            shutdown,
            ticker,
            worker,
        }
    }

    /// Stops the trigger and waits for any queued compaction to finish.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ServerError::Join`] if either task panicked.
    pub async fn shutdown(self) -> ServerResult<()> {
        let _ = self.shutdown.send(true);
        self.ticker.await?;
        self.worker.await?;
        Ok(())
    }
}
