//! The Scheduler drives the poll → detect → notify → persist cycle and the
//! daily reset of the known set.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local, NaiveDate};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{
    alert_manager::{AlertManager, AlertOutcome},
    detector::detect,
    status::StatusTracker,
};
use crate::{
    config::AppConfig,
    models::{EventCategory, KnownSet, NotificationEvent, TimeWindow},
    persistence::{
        error::PersistenceError,
        traits::{KnownSetStore, ResetReason},
    },
    providers::{SnapshotError, SnapshotSource},
};

/// Errors that end a single iteration early. None of them stop the loop.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The snapshot could not be fetched; nothing was learned.
    #[error("Snapshot fetch failed: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The known set could not be written; it stays dirty in memory.
    #[error("Known set persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Timing settings of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Sleep after a successful iteration.
    pub poll_interval: Duration,
    /// Sleep after a failed iteration.
    pub retry_interval: Duration,
    /// Daily window in which the known set is cleared.
    pub reset_window: TimeWindow,
}

impl From<&AppConfig> for SchedulerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            retry_interval: config.retry_interval,
            reset_window: config.reset_window.window(),
        }
    }
}

/// Counters describing one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The known set was reset at the start of this iteration.
    pub reset: bool,
    /// Distinct entities in the snapshot.
    pub snapshot_size: usize,
    /// Entities seen for the first time.
    pub new_entities: usize,
    /// Events produced by the status pass.
    pub status_events: usize,
    /// Events delivered to at least one destination.
    pub delivered: usize,
    /// Events dropped by the eligibility policy.
    pub suppressed: usize,
    /// Events that reached no destination at all.
    pub failed: usize,
    /// The known set was written during this iteration.
    pub persisted: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: &AlertOutcome) {
        match outcome {
            AlertOutcome::Suppressed(_) => self.suppressed += 1,
            AlertOutcome::Dispatched(report) if report.overall_success() => self.delivered += 1,
            AlertOutcome::Dispatched(_) => self.failed += 1,
        }
    }
}

/// The Scheduler service.
///
/// Owns the in-memory known set, which stays authoritative for the process
/// lifetime even when writing it to the store fails.
pub struct Scheduler {
    settings: SchedulerSettings,
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn KnownSetStore>,
    alerts: AlertManager,
    status: StatusTracker,
    known: KnownSet,
    dirty: bool,
    last_reset: Option<NaiveDate>,
    cancellation_token: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler starting from the already-loaded `known` set.
    pub fn new(
        settings: SchedulerSettings,
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn KnownSetStore>,
        alerts: AlertManager,
        known: KnownSet,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            settings,
            source,
            store,
            alerts,
            status: StatusTracker::new(),
            known,
            dirty: false,
            last_reset: None,
            cancellation_token,
        }
    }

    /// The in-memory known set.
    pub fn known(&self) -> &KnownSet {
        &self.known
    }

    /// Returns `true` if the known set has changes not yet written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The alert manager, for service notices.
    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    /// Runs iterations until the cancellation token fires.
    ///
    /// The first iteration starts immediately. An iteration in progress is
    /// always completed; cancellation is only observed between iterations.
    pub async fn run(&mut self) {
        let cancellation_token = self.cancellation_token.clone();
        let mut delay = Duration::ZERO;
        loop {
            let polling_delay = tokio::time::sleep(delay);

            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    tracing::info!("Scheduler cancellation signal received, shutting down...");
                    break;
                }

                _ = polling_delay => {
                    delay = match self.run_cycle(Local::now()).await {
                        Ok(report) => {
                            tracing::debug!(?report, "Poll iteration finished.");
                            self.settings.poll_interval
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Error during poll iteration. Retrying after shortened delay...");
                            self.settings.retry_interval
                        }
                    };
                }
            }
        }
        tracing::info!("Scheduler has shut down.");
    }

    /// Performs one iteration as of `now`.
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&mut self, now: DateTime<Local>) -> Result<CycleReport, SchedulerError> {
        let mut report = CycleReport { reset: self.maybe_reset(now).await, ..Default::default() };

        let snapshot = self.source.fetch().await?;
        let preferences = self.alerts.preferences().load();
        report.snapshot_size = snapshot.id_set().len();
        if snapshot.is_empty() {
            tracing::warn!("Snapshot is empty, treating it as no new information.");
        }

        let new_ids = detect(&snapshot.id_set(), &self.known);
        report.new_entities = new_ids.len();
        if !new_ids.is_empty() {
            tracing::info!(count = new_ids.len(), "New trains detected.");
        }
        let mut deferred = 0;
        for id in new_ids {
            let attributes = snapshot.attributes_of(&id);
            let event = NotificationEvent::new(EventCategory::NewEntity, id.clone())
                .with_delay(attributes.delay_minutes())
                .with_entity_type(attributes.entity_type());
            let outcome = self.alerts.process_event(&event, &attributes, &preferences, now).await;
            report.record(&outcome);
            // Held back by quiet hours or the rate limit: detect it again next poll.
            if outcome.is_deferred() {
                deferred += 1;
                continue;
            }
            self.known.insert(id);
            self.dirty = true;
        }
        if deferred > 0 {
            tracing::info!(deferred, "New trains held back until notifications are allowed again.");
        }

        let status_events = self.status.evaluate(&snapshot);
        report.status_events = status_events.len();
        for event in &status_events {
            let attributes = snapshot.attributes_of(&event.entity_id);
            let outcome = self.alerts.process_event(event, &attributes, &preferences, now).await;
            report.record(&outcome);
        }

        if self.dirty {
            self.persist().await?;
            report.persisted = true;
        }
        Ok(report)
    }

    /// Writes the known set if it has unsaved changes.
    pub async fn flush(&mut self) -> Result<(), PersistenceError> {
        if self.dirty {
            self.persist().await?;
            tracing::info!(count = self.known.len(), "Known set flushed.");
        }
        Ok(())
    }

    async fn persist(&mut self) -> Result<(), PersistenceError> {
        match self.store.save(&self.known).await {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    count = self.known.len(),
                    "Could not persist known set; keeping it in memory and retrying next iteration."
                );
                Err(e)
            }
        }
    }

    /// Clears the known set once per day while `now` is inside the reset
    /// window. Returns whether a reset happened.
    async fn maybe_reset(&mut self, now: DateTime<Local>) -> bool {
        let today = now.date_naive();
        if !self.settings.reset_window.contains(now.time()) || self.last_reset == Some(today) {
            return false;
        }

        tracing::info!(cleared = self.known.len(), "Inside reset window, clearing known set.");
        self.known.clear();
        self.last_reset = Some(today);
        match self.store.reset(ResetReason::Scheduled).await {
            Ok(()) => self.dirty = false,
            Err(e) => {
                tracing::error!(error = %e, "Failed to reset persisted known set.");
                self.dirty = true;
            }
        }

        self.alerts.send_reset_notice(now).await;
        true
    }
}
