//! The railwatch engine: change detection, eligibility, status tracking and
//! the scheduling loop that ties them to the notifier.

pub mod alert_manager;
pub mod detector;
pub mod policy;
pub mod scheduler;
pub mod status;

pub use alert_manager::{AlertManager, AlertOutcome};
pub use detector::detect;
pub use policy::{DenialReason, EligibilityPolicy, PolicyDecision, PreferencesHandle, should_notify};
pub use scheduler::{CycleReport, Scheduler, SchedulerError, SchedulerSettings};
pub use status::StatusTracker;
