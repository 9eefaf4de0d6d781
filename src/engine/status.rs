//! Status evaluation between consecutive snapshots.
//!
//! Only entities present in both the previous and the current successful
//! snapshot are compared. Observations live in memory and are lost on
//! restart, so the first snapshot after startup never emits status events.

use std::collections::HashMap;

use crate::models::{
    EntityAttributes, EntityId, EventCategory, NotificationEvent, RunningStatus, Snapshot,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observation {
    station: Option<String>,
    status: Option<RunningStatus>,
}

impl Observation {
    fn from_attributes(attributes: &EntityAttributes) -> Self {
        Self {
            station: attributes.station().map(str::to_string),
            status: attributes.delay_minutes().map(RunningStatus::from_delay),
        }
    }
}

/// Emits `status_change`, `delay` and `early_arrival` events.
#[derive(Debug, Default)]
pub struct StatusTracker {
    previous: HashMap<EntityId, Observation>,
}

impl StatusTracker {
    /// Creates a tracker with no prior observations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities remembered from the last snapshot.
    pub fn tracked_count(&self) -> usize {
        self.previous.len()
    }

    /// Compares `snapshot` with the previous one and returns the resulting
    /// events, then remembers `snapshot` for the next call.
    ///
    /// An empty snapshot is treated as missing data: it yields no events and
    /// keeps the previous observations.
    pub fn evaluate(&mut self, snapshot: &Snapshot) -> Vec<NotificationEvent> {
        if snapshot.is_empty() {
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut current = HashMap::with_capacity(snapshot.attributes.len());

        let mut ids: Vec<&EntityId> = snapshot.attributes.keys().collect();
        ids.sort();

        for id in ids {
            let attributes = snapshot.attributes_of(id);
            let observation = Observation::from_attributes(&attributes);

            if let Some(previous) = self.previous.get(id) {
                let event = |category| {
                    NotificationEvent::new(category, id.clone())
                        .with_delay(attributes.delay_minutes())
                        .with_entity_type(attributes.entity_type())
                };

                if let (Some(before), Some(now)) = (&previous.station, &observation.station)
                    && before != now
                {
                    events.push(event(EventCategory::StatusChange));
                }

                if observation.status != previous.status {
                    match observation.status {
                        Some(RunningStatus::Late) => events.push(event(EventCategory::Delay)),
                        Some(RunningStatus::Early) => {
                            events.push(event(EventCategory::EarlyArrival))
                        }
                        _ => {}
                    }
                }
            }

            current.insert(id.clone(), observation);
        }

        self.previous = current;
        if !events.is_empty() {
            tracing::debug!(count = events.len(), "Status pass produced events.");
        }
        events
    }
}
