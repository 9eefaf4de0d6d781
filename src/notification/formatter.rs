//! Renders events and service notices into channel-ready text.
//!
//! Every per-entity message has the same field order: identifier, route,
//! optional station summary, delay, start date. Missing fields are replaced
//! by fallback tokens rather than dropped, so a reader (human or script) can
//! rely on each field being present.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::models::{
    EntityAttributes, EventCategory, NotificationEvent, RenderedMessage, message::escape_markup,
};

/// Route shown when the source row has none.
pub const UNKNOWN_ROUTE: &str = "UNKNOWN-UNKNOWN";

/// Delay shown when the source row has no numeric delay.
pub const UNKNOWN_DELAY: &str = "N/A";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stateless renderer for notification text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFormatter;

impl MessageFormatter {
    /// Renders a per-entity event. Never fails.
    pub fn format(
        &self,
        event: &NotificationEvent,
        attributes: &EntityAttributes,
        now: DateTime<Local>,
    ) -> RenderedMessage {
        let route = attributes.route().map(escape_markup).unwrap_or_else(|| UNKNOWN_ROUTE.into());
        let delay = event.delay_minutes.or_else(|| attributes.delay_minutes());
        let delay_text = delay.map(|d| d.to_string()).unwrap_or_else(|| UNKNOWN_DELAY.into());
        let start_date = attributes
            .start_date()
            .map(escape_markup)
            .unwrap_or_else(|| now.format(DATE_FORMAT).to_string());

        let mut text = format!("{} <b>#{}</b>", headline(event.category), event.entity_id);
        if let Some(entity_type) = event.entity_type.or_else(|| attributes.entity_type()) {
            text.push_str(&format!(" <i>{}</i>", entity_type.tag()));
        }
        text.push_str(&format!(" | {route}"));
        if let Some(station) = attributes.station() {
            text.push_str(&format!(" | T/O-H/O: {}", escape_markup(station)));
            if let Some(minutes) = delay.filter(|d| *d > 0) {
                text.push_str(&format!(": {minutes} mins late"));
            }
        }
        text.push_str(&format!(" | Delay: {delay_text} mins | Started: {start_date}"));

        RenderedMessage::new(text)
    }

    /// Notice sent after the scheduled reset of the known set.
    pub fn reset_notice(&self, now: DateTime<Local>) -> RenderedMessage {
        RenderedMessage::new(format!(
            "🔄 <b>Known Trains List Reset</b>\n\n\
             The known trains list has been reset on schedule. \
             You will now receive new notifications for all trains.\n\n\
             <i>Reset at: {}</i>",
            now.format(TIMESTAMP_FORMAT)
        ))
    }

    /// Notice sent when the service starts.
    pub fn startup_notice(&self, poll_interval: Duration, now: DateTime<Local>) -> RenderedMessage {
        let minutes = poll_interval.as_secs_f64() / 60.0;
        RenderedMessage::new(format!(
            "🔄 <b>Background Notification Service Started</b>\n\n\
             The notification service is now running and will check for new trains \
             every {minutes:.1} minutes.\n\n\
             <i>Started at: {}</i>",
            now.format(TIMESTAMP_FORMAT)
        ))
    }
}

fn headline(category: EventCategory) -> &'static str {
    match category {
        EventCategory::NewEntity => "🚂",
        EventCategory::StatusChange => "🚄 Status update:",
        EventCategory::Delay => "⏰ Running late:",
        EventCategory::EarlyArrival => "⚡ Running early:",
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::EntityId;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    fn new_entity(id: &str) -> NotificationEvent {
        NotificationEvent::new(EventCategory::NewEntity, EntityId::new(id))
    }

    #[test]
    fn test_format_full_row() {
        let attrs: EntityAttributes = [
            ("FROM-TO", "NDLS-BCT"),
            ("Station", "KOTA"),
            ("Delay", "25"),
            ("Start Date", "15 Oct"),
        ]
        .into_iter()
        .collect();

        let message = MessageFormatter.format(&new_entity("12951"), &attrs, now());
        assert_eq!(
            message.rich(),
            "🚂 <b>#12951</b> | NDLS-BCT | T/O-H/O: KOTA: 25 mins late | Delay: 25 mins | Started: 15 Oct"
        );
    }

    #[test]
    fn test_format_uses_fallback_tokens() {
        let message = MessageFormatter.format(&new_entity("17239"), &EntityAttributes::default(), now());
        assert_eq!(
            message.plain(),
            "🚂 #17239 | UNKNOWN-UNKNOWN | Delay: N/A mins | Started: 2026-10-16"
        );
    }

    #[test]
    fn test_format_escapes_attribute_values() {
        let attrs: EntityAttributes = [("FROM-TO", "A<B")].into_iter().collect();
        let message = MessageFormatter.format(&new_entity("1"), &attrs, now());
        assert!(message.rich().contains("A&lt;B"));
        assert!(message.plain().contains("A<B"));
    }

    #[test]
    fn test_format_delay_event_prefers_event_delay() {
        let event = NotificationEvent::new(EventCategory::Delay, EntityId::new("12951"))
            .with_delay(Some(40));
        let attrs: EntityAttributes = [("Delay", "10")].into_iter().collect();
        let message = MessageFormatter.format(&event, &attrs, now());
        assert!(message.rich().starts_with("⏰ Running late: <b>#12951</b>"));
        assert!(message.rich().contains("Delay: 40 mins"));
    }

    #[test]
    fn test_startup_notice_mentions_interval() {
        let message = MessageFormatter.startup_notice(Duration::from_secs(300), now());
        assert!(message.plain().contains("every 5.0 minutes"));
        assert!(message.plain().contains("Started at: 2026-10-16 09:30:00"));
    }
}
