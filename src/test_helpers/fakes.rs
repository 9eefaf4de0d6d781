use std::{
    collections::{HashSet, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    models::{KnownSet, MessageFormat, Snapshot},
    notification::{ChannelProvider, error::NotificationError},
    persistence::{
        error::PersistenceError,
        traits::{KnownSetStore, ResetReason},
    },
    providers::{SnapshotError, SnapshotSource},
};

/// One call made to a [`RecordingProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Destination address.
    pub destination: String,
    /// Text as handed to the provider.
    pub text: String,
    /// Requested format.
    pub format: MessageFormat,
}

/// A channel provider that records every send and fails on request.
#[derive(Default)]
pub struct RecordingProvider {
    sent: Mutex<Vec<SentMessage>>,
    failing: HashSet<String>,
    reject_rich: bool,
}

impl RecordingProvider {
    /// Creates a provider that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send to `destination` fail.
    pub fn failing_for(mut self, destination: &str) -> Self {
        self.failing.insert(destination.to_string());
        self
    }

    /// Makes every rich-format send fail.
    pub fn rejecting_rich(mut self) -> Self {
        self.reject_rich = true;
        self
    }

    /// All calls so far, successful or not.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Calls made for `destination`.
    pub fn sent_to(&self, destination: &str) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| m.destination == destination).collect()
    }
}

#[async_trait]
impl ChannelProvider for RecordingProvider {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(SentMessage {
            destination: destination.to_string(),
            text: text.to_string(),
            format,
        });
        if self.failing.contains(destination) {
            return Err(NotificationError::NotifyFailed(format!("{destination} is unreachable")));
        }
        if self.reject_rich && format == MessageFormat::Rich {
            return Err(NotificationError::Rejected {
                status: 400,
                description: "can't parse entities".to_string(),
            });
        }
        Ok(())
    }
}

/// A snapshot source replaying a fixed sequence of results. Once the
/// sequence is exhausted the last result is repeated.
pub struct StaticSnapshotSource {
    results: Mutex<VecDeque<Result<Snapshot, u16>>>,
    last: Mutex<Result<Snapshot, u16>>,
}

impl StaticSnapshotSource {
    /// Creates a source that always returns `snapshot`.
    pub fn new(snapshot: Snapshot) -> Self {
        Self::sequence(vec![Ok(snapshot)])
    }

    /// Creates a source returning `results` in order. An `Err(status)` is
    /// reported as an HTTP status failure.
    pub fn sequence(results: Vec<Result<Snapshot, u16>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            last: Mutex::new(Ok(Snapshot::default())),
        }
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch(&self) -> Result<Snapshot, SnapshotError> {
        let next = self.results.lock().unwrap().pop_front();
        let result = match next {
            Some(result) => {
                *self.last.lock().unwrap() = result.clone();
                result
            }
            None => self.last.lock().unwrap().clone(),
        };
        result.map_err(SnapshotError::Status)
    }
}

/// An in-memory known-set store with switchable write failures.
#[derive(Default)]
pub struct InMemoryKnownSetStore {
    known: Mutex<KnownSet>,
    fail_writes: Mutex<bool>,
    saves: Mutex<usize>,
    resets: Mutex<usize>,
    last_reason: Mutex<Option<ResetReason>>,
}

impl InMemoryKnownSetStore {
    /// Creates a store already holding `known`.
    pub fn with_known(known: KnownSet) -> Self {
        Self { known: Mutex::new(known), ..Default::default() }
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// The currently stored set.
    pub fn stored(&self) -> KnownSet {
        self.known.lock().unwrap().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    /// Number of successful resets.
    pub fn reset_count(&self) -> usize {
        *self.resets.lock().unwrap()
    }

    /// The reason given to the most recent successful reset.
    pub fn last_reset_reason(&self) -> Option<ResetReason> {
        *self.last_reason.lock().unwrap()
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(PersistenceError::io(
                "memory",
                std::io::Error::other("writes disabled"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KnownSetStore for InMemoryKnownSetStore {
    async fn load(&self) -> KnownSet {
        self.stored()
    }

    async fn save(&self, known: &KnownSet) -> Result<(), PersistenceError> {
        self.check_writable()?;
        *self.known.lock().unwrap() = known.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn reset(&self, reason: ResetReason) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.known.lock().unwrap().clear();
        *self.resets.lock().unwrap() += 1;
        *self.last_reason.lock().unwrap() = Some(reason);
        Ok(())
    }
}
