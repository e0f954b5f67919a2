//! Status Synchronizer
//!
//! Owns the cached status snapshot: fetches fresh snapshots from the
//! backend (periodically and on demand), replaces the cache whole on
//! success, and republishes to observers. A failed fetch never touches the
//! cache; last-known-good wins.

use crate::backend::{with_timeout, Backend};
use crate::core::config::Config;
use crate::core::events::AppEvent;
use crate::core::state::{OperationOutcome, SharedState};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub struct StatusSynchronizer<B> {
    backend: Arc<B>,
    state: Arc<SharedState>,
    events: mpsc::UnboundedSender<AppEvent>,
    config: Config,
}

impl<B> Clone for StatusSynchronizer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            config: self.config.clone(),
        }
    }
}

impl<B: Backend + 'static> StatusSynchronizer<B> {
    pub fn new(
        backend: Arc<B>,
        state: Arc<SharedState>,
        events: mpsc::UnboundedSender<AppEvent>,
        config: Config,
    ) -> Self {
        Self {
            backend,
            state,
            events,
            config,
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// One-time startup fetches: identifiers, driver info, first status.
    ///
    /// Any of these may fail without being fatal; placeholders stay in
    /// place and the periodic poll catches up later.
    pub async fn bootstrap(&self) {
        self.load_identifiers().await;
        self.refresh_driver_info().await;
        self.fetch_status(false).await;
    }

    /// Fetch a fresh snapshot and replace the cache atomically.
    ///
    /// `manual` fetches surface their result to the user: a short-lived
    /// "refreshed" notice on success, an error outcome on failure.
    /// Automatic fetches fail silently (logged only) and the stale
    /// snapshot is retained.
    pub async fn fetch_status(&self, manual: bool) {
        match with_timeout(self.config.fetch_timeout(), self.backend.get_device_status()).await {
            Ok(snapshot) => {
                debug!(?manual, "status fetch completed");
                self.state.set_status(snapshot.clone());
                let _ = self.events.send(AppEvent::StatusUpdated(snapshot));
                if manual {
                    self.state.publish_outcome(
                        &self.events,
                        OperationOutcome::success("Status refreshed"),
                        self.config.refresh_notice(),
                    );
                }
            }
            Err(e) => {
                if manual {
                    warn!("manual status fetch failed: {}", e);
                    self.state.publish_outcome(
                        &self.events,
                        OperationOutcome::failure(format!("Failed to refresh status: {}", e)),
                        self.config.outcome_display(),
                    );
                } else {
                    debug!("periodic status fetch failed: {}", e);
                }
            }
        }
    }

    /// One-time identifier fetch. On failure the zero-valued placeholders
    /// stay in place; identifiers are never polled.
    pub async fn load_identifiers(&self) {
        match with_timeout(
            self.config.fetch_timeout(),
            self.backend.get_device_identifiers(),
        )
        .await
        {
            Ok(identifiers) => {
                info!("device identifiers loaded");
                self.state.set_identifiers(identifiers.clone());
                let _ = self.events.send(AppEvent::IdentifiersLoaded(identifiers));
            }
            Err(e) => {
                warn!("failed to load device identifiers: {}", e);
            }
        }
    }

    /// Refresh driver info; called at startup and after every
    /// driver-mutating command
    pub async fn refresh_driver_info(&self) {
        match with_timeout(self.config.fetch_timeout(), self.backend.get_driver_info()).await {
            Ok(info) => {
                debug!(current = %info.current_driver, "driver info refreshed");
                self.state.set_driver_info(info.clone());
                let _ = self.events.send(AppEvent::DriverInfoUpdated(info));
            }
            Err(e) => {
                warn!("failed to refresh driver info: {}", e);
            }
        }
    }

    /// Start the periodic poll loop. Each tick issues one fetch and awaits
    /// it before the next tick, so the timer never overlaps its own
    /// fetches. Runs until the returned handle is stopped or dropped.
    pub fn spawn_periodic(&self) -> PollHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let sync = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sync.config.poll_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; bootstrap
            // already fetched, so skip it
            ticker.tick().await;
            info!(
                interval_ms = sync.config.poll_interval_ms,
                "status poll loop started"
            );
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => sync.fetch_status(false).await,
                }
            }
            debug!("status poll loop stopped");
        });
        PollHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// Handle over the periodic poll loop.
///
/// Stopping cancels only the timer: a fetch already in flight completes
/// and writes the cache one last time, which nothing observes afterwards.
/// Stop is idempotent; dropping the handle stops the loop too.
pub struct PollHandle {
    stop: Option<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Request the poll loop to stop. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(true);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
