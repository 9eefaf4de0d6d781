//! Change detection against the known set.

use std::collections::{BTreeSet, HashSet};

use crate::models::{EntityId, KnownSet};

/// Returns the identifiers of `current` that are not in `known`.
///
/// Pure: nothing is mutated, so calling it twice with the same inputs gives
/// the same answer, and an empty `current` always gives an empty result.
/// The result is ordered only to make logs and messages stable.
pub fn detect(current: &HashSet<EntityId>, known: &KnownSet) -> BTreeSet<EntityId> {
    current.iter().filter(|id| !known.contains(*id)).cloned().collect()
}
