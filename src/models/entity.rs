//! Tracked entities as they appear in one poll of the snapshot source.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use super::event::EntityType;

/// Stable identifier of a tracked entity (a train number).
///
/// It is the sole deduplication key: two snapshot rows with the same
/// identifier describe the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an identifier from an already-clean token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds an identifier from a raw cell value, keeping only its digits.
    ///
    /// Returns `None` when no digit survives, e.g. for an empty or
    /// placeholder cell.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() { None } else { Some(Self(digits)) }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The set of identifiers already notified about.
///
/// Ordered so the persisted representation is stable between writes.
pub type KnownSet = BTreeSet<EntityId>;

/// Field name to value mapping for one entity in one snapshot.
///
/// Column names of the upstream table are not fixed, so accessors locate
/// fields by case-insensitive key fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityAttributes(HashMap<String, String>);

impl EntityAttributes {
    /// Wraps a raw field map.
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw access by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if no fields are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Route pair, e.g. `NDLS-BCT`.
    pub fn route(&self) -> Option<&str> {
        self.find(|key| key.contains("from") && key.contains("to"))
    }

    /// Raw delay cell.
    pub fn delay_text(&self) -> Option<&str> {
        self.find(|key| key.contains("delay"))
    }

    /// Delay in minutes, negative when running early.
    ///
    /// Accepts cells such as `15`, `-7`, `+3 mins` or `12 min late`; the
    /// first signed integer in the cell wins.
    pub fn delay_minutes(&self) -> Option<i64> {
        self.delay_text().and_then(parse_signed_minutes)
    }

    /// Current or hand-over station summary.
    pub fn station(&self) -> Option<&str> {
        self.find(|key| key == "station" || key.contains("stn"))
    }

    /// Journey start date as supplied by the source.
    pub fn start_date(&self) -> Option<&str> {
        self.find(|key| key.contains("start") && key.contains("date"))
    }

    /// Entity type tag, when the type column holds a known tag.
    pub fn entity_type(&self) -> Option<EntityType> {
        self.find(|key| key.contains("type"))
            .and_then(|value| value.split_whitespace().find_map(EntityType::from_tag))
    }

    fn find(&self, matches: impl Fn(&str) -> bool) -> Option<&str> {
        let mut candidates: Vec<(&String, &String)> =
            self.0.iter().filter(|(key, _)| matches(&key.to_lowercase())).collect();
        // Several columns may match; pick deterministically.
        candidates.sort_by(|a, b| a.0.cmp(b.0));
        candidates
            .into_iter()
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EntityAttributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn parse_signed_minutes(text: &str) -> Option<i64> {
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let signed = (c == '-' || c == '+')
            && chars.peek().is_some_and(|(_, next)| next.is_ascii_digit());
        if c.is_ascii_digit() || signed {
            let end = text[start + 1..]
                .find(|ch: char| !ch.is_ascii_digit())
                .map_or(text.len(), |offset| start + 1 + offset);
            return text[start..end].parse().ok();
        }
    }
    None
}

/// One poll's view of the currently active entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Identifiers in source order, possibly with duplicates.
    pub ids: Vec<EntityId>,
    /// Attributes per identifier.
    pub attributes: HashMap<EntityId, EntityAttributes>,
}

impl Snapshot {
    /// Returns `true` if the snapshot carries no entity at all.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Distinct identifiers of this snapshot.
    pub fn id_set(&self) -> HashSet<EntityId> {
        self.ids.iter().cloned().collect()
    }

    /// Attributes of an entity, empty if the source sent none.
    pub fn attributes_of(&self, id: &EntityId) -> EntityAttributes {
        self.attributes.get(id).cloned().unwrap_or_default()
    }

    /// Appends an entity row. A repeated identifier keeps its first
    /// attributes.
    pub fn push(&mut self, id: EntityId, attributes: EntityAttributes) {
        self.attributes.entry(id.clone()).or_insert(attributes);
        self.ids.push(id);
    }
}
