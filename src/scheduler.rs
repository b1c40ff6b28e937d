//! Periodic background refresh bound to the lifetime of a handle.

use crate::core::Event;
use crate::store::RateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Owns the refresh timer. Refreshes once immediately, then every
/// `interval`, posting each outcome to the session's event channel. The timer
/// stops on [`RefreshTask::cancel`] or when the handle is dropped.
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub fn spawn(store: Arc<RateStore>, interval: Duration, events: UnboundedSender<Event>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("Scheduled refresh");
                if let Some(event) = store.refresh().await {
                    if events.send(event).is_err() {
                        debug!("Event receiver closed, stopping refresh timer");
                        break;
                    }
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(self) {
        // Drop aborts the task.
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        debug!("Cancelling refresh timer");
        self.handle.abort();
    }
}
