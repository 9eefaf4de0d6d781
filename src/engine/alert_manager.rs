//! Alert management: policy gate, formatting and dispatch for one event.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local};

use super::policy::{DenialReason, EligibilityPolicy, PolicyDecision, PreferencesHandle};
use crate::{
    models::{EntityAttributes, NotificationEvent, NotificationPreferences},
    notification::{ChannelDispatcher, DispatchReport, MessageFormatter},
};

/// What happened to one notification candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    /// The policy dropped the event before anything was sent.
    Suppressed(DenialReason),
    /// The event was sent; the report tells how each destination fared.
    Dispatched(DispatchReport),
}

impl AlertOutcome {
    /// Returns `true` if at least one destination received the message.
    pub fn is_delivered(&self) -> bool {
        matches!(self, AlertOutcome::Dispatched(report) if report.overall_success())
    }

    /// Returns `true` if a global circuit breaker (quiet hours or the rate
    /// limit) held the event back. No attempt was made, so a new train
    /// denied this way must not be remembered yet.
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            AlertOutcome::Suppressed(DenialReason::QuietHours | DenialReason::RateLimited)
        )
    }
}

/// The AlertManager runs events through the eligibility policy and hands
/// allowed ones to the dispatcher. Service notices bypass the policy.
pub struct AlertManager {
    policy: EligibilityPolicy,
    formatter: MessageFormatter,
    dispatcher: Arc<ChannelDispatcher>,
}

impl AlertManager {
    /// Creates a new AlertManager instance.
    pub fn new(policy: EligibilityPolicy, dispatcher: Arc<ChannelDispatcher>) -> Self {
        Self { policy, formatter: MessageFormatter, dispatcher }
    }

    /// The preferences handle shared with the policy.
    pub fn preferences(&self) -> &PreferencesHandle {
        self.policy.preferences()
    }

    /// The policy, for inspecting its rate state.
    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Processes a single event against a preferences snapshot.
    pub async fn process_event(
        &mut self,
        event: &NotificationEvent,
        attributes: &EntityAttributes,
        preferences: &NotificationPreferences,
        now: DateTime<Local>,
    ) -> AlertOutcome {
        if let PolicyDecision::Denied(reason) = self.policy.evaluate(event, preferences, now) {
            return AlertOutcome::Suppressed(reason);
        }

        let message = self.formatter.format(event, attributes, now);
        let report = self.dispatcher.dispatch(&message).await;

        if report.overall_success() {
            tracing::info!(
                entity = %event.entity_id,
                category = %event.category,
                delivered = report.delivered_count(),
                failed = report.failed_count(),
                "Notification sent."
            );
        } else {
            tracing::error!(
                entity = %event.entity_id,
                category = %event.category,
                failed = report.failed_count(),
                "Notification failed on every destination."
            );
        }
        AlertOutcome::Dispatched(report)
    }

    /// Sends the scheduled-reset notice.
    pub async fn send_reset_notice(&self, now: DateTime<Local>) -> DispatchReport {
        let report = self.dispatcher.dispatch(&self.formatter.reset_notice(now)).await;
        log_notice("reset", &report);
        report
    }

    /// Sends the startup notice.
    pub async fn send_startup_notice(
        &self,
        poll_interval: Duration,
        now: DateTime<Local>,
    ) -> DispatchReport {
        let report =
            self.dispatcher.dispatch(&self.formatter.startup_notice(poll_interval, now)).await;
        log_notice("startup", &report);
        report
    }
}

fn log_notice(notice: &str, report: &DispatchReport) {
    if report.overall_success() {
        tracing::info!(notice, delivered = report.delivered_count(), "Service notice sent.");
    } else {
        tracing::warn!(notice, "Service notice could not be delivered.");
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        models::{Destination, DestinationKind, EntityId, EventCategory, MessageFormat},
        notification::traits::MockChannelProvider,
    };

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, hour, minute, 0).unwrap()
    }

    fn manager(provider: MockChannelProvider, preferences: NotificationPreferences) -> AlertManager {
        let dispatcher = ChannelDispatcher::new(Duration::from_secs(1)).with_route(
            "tg",
            Arc::new(provider),
            vec![Destination { address: "42".into(), kind: DestinationKind::Direct }],
        );
        let policy =
            EligibilityPolicy::new(PreferencesHandle::new(preferences), Utc::now());
        AlertManager::new(policy, Arc::new(dispatcher))
    }

    fn attributes() -> EntityAttributes {
        [("FROM-TO", "NDLS-BCT"), ("Start Date", "2026-10-16")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_allowed_event_is_formatted_and_dispatched() {
        let mut provider = MockChannelProvider::new();
        provider
            .expect_send()
            .withf(|destination, text, format| {
                destination == "42"
                    && text.starts_with("🚂 <b>#12951</b>")
                    && text.contains("NDLS-BCT")
                    && *format == MessageFormat::Rich
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let prefs = NotificationPreferences::default();
        let mut manager = manager(provider, prefs.clone());

        let event = NotificationEvent::new(EventCategory::NewEntity, EntityId::new("12951"));
        let outcome = manager.process_event(&event, &attributes(), &prefs, at(12, 0)).await;

        assert!(outcome.is_delivered());
    }

    #[tokio::test]
    async fn test_suppressed_event_sends_nothing() {
        let mut provider = MockChannelProvider::new();
        provider.expect_send().times(0);
        let mut prefs = NotificationPreferences::default();
        prefs.categories.new_entity = false;
        let mut manager = manager(provider, prefs.clone());

        let event = NotificationEvent::new(EventCategory::NewEntity, EntityId::new("12951"));
        let outcome = manager.process_event(&event, &attributes(), &prefs, at(12, 0)).await;

        assert_eq!(outcome, AlertOutcome::Suppressed(DenialReason::CategoryDisabled));
        assert!(!outcome.is_deferred());
        assert_eq!(manager.policy().rate_state().count, 1);
    }

    #[tokio::test]
    async fn test_circuit_breaker_denials_are_deferred() {
        let mut provider = MockChannelProvider::new();
        provider.expect_send().times(0);
        let prefs = NotificationPreferences { max_notifications_per_hour: 0, ..Default::default() };
        let mut manager = manager(provider, prefs.clone());

        let event = NotificationEvent::new(EventCategory::NewEntity, EntityId::new("12951"));
        let outcome = manager.process_event(&event, &attributes(), &prefs, at(12, 0)).await;

        assert_eq!(outcome, AlertOutcome::Suppressed(DenialReason::RateLimited));
        assert!(outcome.is_deferred());
        assert!(AlertOutcome::Suppressed(DenialReason::QuietHours).is_deferred());
    }

    #[tokio::test]
    async fn test_notices_bypass_policy() {
        let mut provider = MockChannelProvider::new();
        provider
            .expect_send()
            .withf(|_, text, _| text.contains("Known Trains List Reset"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let prefs = NotificationPreferences { max_notifications_per_hour: 0, ..Default::default() };
        let manager = manager(provider, prefs);

        let report = manager.send_reset_notice(at(1, 2)).await;

        assert!(report.overall_success());
        assert_eq!(manager.policy().rate_state().count, 0);
    }
}
