use std::collections::BTreeSet;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// An opaque token identifying one outstanding challenge. Recommended form
/// is lowercase hex, at least 16 characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reference(String);

impl Reference {
    /// Generate a fresh reference: 16 random bytes, hex-encoded (32 chars).
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Reference(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Reference {
    fn from(s: String) -> Self {
        Reference(s)
    }
}

impl From<&str> for Reference {
    fn from(s: &str) -> Self {
        Reference(s.to_string())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ordered set of references, serialized as a JSON array in the store's
/// `ref` column. The legacy bare-string form (a single reference with no
/// JSON envelope) is accepted on decode for backward compatibility.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefSet(BTreeSet<Reference>);

impl RefSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(r: Reference) -> Self {
        let mut set = BTreeSet::new();
        set.insert(r);
        RefSet(set)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, r: &Reference) -> bool {
        self.0.contains(r)
    }

    pub fn insert(&mut self, r: Reference) {
        self.0.insert(r);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.0.iter()
    }

    /// Set union, preserving ascending sort order (`BTreeSet` does this for free).
    pub fn union(&self, other: &RefSet) -> RefSet {
        RefSet(self.0.union(&other.0).cloned().collect())
    }

    /// Decode the `ref` column: try JSON array first, then fall back to
    /// treating a non-empty bare string as a single-element list.
    pub fn decode(raw: Option<&str>) -> RefSet {
        let raw = match raw {
            Some(r) if !r.is_empty() => r,
            _ => return RefSet::new(),
        };

        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(refs) => RefSet(refs.into_iter().map(Reference).collect()),
            Err(_) => RefSet::single(Reference(raw.to_string())),
        }
    }

    /// Encode as a JSON array, or `None` when empty (so the column can stay NULL).
    pub fn encode(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        let refs: Vec<&str> = self.0.iter().map(|r| r.as_str()).collect();
        Some(serde_json::to_string(&refs).expect("serializing a Vec<&str> cannot fail"))
    }
}

impl FromIterator<Reference> for RefSet {
    fn from_iter<T: IntoIterator<Item = Reference>>(iter: T) -> Self {
        RefSet(iter.into_iter().collect())
    }
}
