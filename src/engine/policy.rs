//! Notification eligibility: quiet hours, rate limiting and content filters.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. quiet hours
//! 2. rolling-hour rate limit (consumes quota when it passes)
//! 3. category toggle
//! 4. entity-type filter
//! 5. delay threshold, for `delay` events only
//!
//! Quota taken at step 2 is kept even when a later step rejects the event,
//! so the limit caps candidate volume rather than sent volume.

use std::{fmt, sync::Arc};

use arc_swap::ArcSwap;
use chrono::{DateTime, Local, Utc};

use crate::models::{EventCategory, NotificationEvent, NotificationPreferences, RateWindowState};

/// Why an event was not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// `now` is inside the configured quiet hours.
    QuietHours,
    /// The rolling-hour quota is exhausted.
    RateLimited,
    /// The event's category is switched off.
    CategoryDisabled,
    /// The event's type tag is switched off.
    EntityTypeFiltered,
    /// A `delay` event below the minimum delay.
    BelowDelayThreshold,
    /// A `delay` event without a numeric delay.
    MissingDelay,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DenialReason::QuietHours => "quiet_hours",
            DenialReason::RateLimited => "rate_limited",
            DenialReason::CategoryDisabled => "category_disabled",
            DenialReason::EntityTypeFiltered => "entity_type_filtered",
            DenialReason::BelowDelayThreshold => "below_delay_threshold",
            DenialReason::MissingDelay => "missing_delay",
        };
        f.write_str(reason)
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The event may be sent.
    Allowed,
    /// The event must be dropped.
    Denied(DenialReason),
}

impl PolicyDecision {
    /// Returns `true` for [`PolicyDecision::Allowed`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allowed)
    }
}

/// Evaluates one event against `preferences`.
///
/// Returns the decision and the rate state to carry forward. The input
/// state is never mutated, so callers can discard the output to simulate.
pub fn should_notify(
    event: &NotificationEvent,
    preferences: &NotificationPreferences,
    rate_state: RateWindowState,
    now: DateTime<Local>,
) -> (PolicyDecision, RateWindowState) {
    if preferences.quiet_hours.is_quiet_at(now.time()) {
        return (PolicyDecision::Denied(DenialReason::QuietHours), rate_state);
    }

    let rate_state = rate_state.refreshed(now.with_timezone(&Utc));
    if rate_state.count >= preferences.max_notifications_per_hour {
        return (PolicyDecision::Denied(DenialReason::RateLimited), rate_state);
    }
    let rate_state = rate_state.consumed();

    (content_decision(event, preferences), rate_state)
}

fn content_decision(
    event: &NotificationEvent,
    preferences: &NotificationPreferences,
) -> PolicyDecision {
    if !preferences.categories.is_enabled(event.category) {
        return PolicyDecision::Denied(DenialReason::CategoryDisabled);
    }

    if let Some(entity_type) = event.entity_type
        && !preferences.allows_entity_type(entity_type)
    {
        return PolicyDecision::Denied(DenialReason::EntityTypeFiltered);
    }

    if event.category == EventCategory::Delay {
        match event.delay_minutes {
            None => return PolicyDecision::Denied(DenialReason::MissingDelay),
            Some(delay) if delay < preferences.min_delay_minutes => {
                return PolicyDecision::Denied(DenialReason::BelowDelayThreshold);
            }
            Some(_) => {}
        }
    }

    PolicyDecision::Allowed
}

/// Shared, atomically replaceable preferences.
///
/// Readers take a snapshot with [`PreferencesHandle::load`] and keep it for
/// the duration of a poll iteration; [`PreferencesHandle::replace`] swaps
/// the whole record without disturbing a snapshot already taken.
#[derive(Clone)]
pub struct PreferencesHandle {
    inner: Arc<ArcSwap<NotificationPreferences>>,
}

impl PreferencesHandle {
    /// Wraps the initial preferences.
    pub fn new(preferences: NotificationPreferences) -> Self {
        Self { inner: Arc::new(ArcSwap::from_pointee(preferences)) }
    }

    /// The current preferences.
    pub fn load(&self) -> Arc<NotificationPreferences> {
        self.inner.load_full()
    }

    /// Replaces the preferences wholesale.
    pub fn replace(&self, preferences: NotificationPreferences) {
        self.inner.store(Arc::new(preferences));
        tracing::info!("Notification preferences replaced.");
    }
}

impl Default for PreferencesHandle {
    fn default() -> Self {
        Self::new(NotificationPreferences::default())
    }
}

/// Stateful wrapper owning the rate window across iterations.
pub struct EligibilityPolicy {
    preferences: PreferencesHandle,
    rate_state: RateWindowState,
}

impl EligibilityPolicy {
    /// Creates a policy whose first rate window opens at `now`.
    pub fn new(preferences: PreferencesHandle, now: DateTime<Utc>) -> Self {
        Self { preferences, rate_state: RateWindowState::new(now) }
    }

    /// The preferences handle, for callers that want to replace them.
    pub fn preferences(&self) -> &PreferencesHandle {
        &self.preferences
    }

    /// The rate state as of the last evaluation.
    pub fn rate_state(&self) -> RateWindowState {
        self.rate_state
    }

    /// Evaluates `event` against a preferences snapshot and folds the
    /// resulting rate state back in.
    pub fn evaluate(
        &mut self,
        event: &NotificationEvent,
        preferences: &NotificationPreferences,
        now: DateTime<Local>,
    ) -> PolicyDecision {
        let (decision, rate_state) = should_notify(event, preferences, self.rate_state, now);
        self.rate_state = rate_state;
        if let PolicyDecision::Denied(reason) = decision {
            tracing::debug!(
                entity = %event.entity_id,
                category = %event.category,
                %reason,
                "Notification suppressed."
            );
        }
        decision
    }
}
