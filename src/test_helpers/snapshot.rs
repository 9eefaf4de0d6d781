use crate::models::{EntityAttributes, EntityId, Snapshot};

/// A builder for creating `Snapshot` instances for testing.
#[derive(Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a train with no attributes.
    pub fn train(self, id: &str) -> Self {
        self.train_with(id, &[])
    }

    /// Adds a train with the given attribute cells.
    pub fn train_with(mut self, id: &str, fields: &[(&str, &str)]) -> Self {
        let attributes: EntityAttributes = fields.iter().copied().collect();
        self.snapshot.push(EntityId::new(id), attributes);
        self
    }

    /// Builds the `Snapshot`.
    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}
