use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref ANGLE_ADDR: Regex = Regex::new(r"<([^>]*)>").unwrap();
}

/// A lowercased bare mailbox, e.g. `local@domain`.
///
/// Comparison and hashing use the normalized (lowercase) form; the raw
/// address as supplied by the caller is kept for emission, since headers
/// re-sent to a sender should preserve whatever case they wrote.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct Address {
    raw: String,
    normalized: String,
}

impl Address {
    /// Extract a bare mailbox from an RFC-5321/5322 address form: strips
    /// surrounding whitespace, then if the string contains `<...>`, takes
    /// the angle-bracket contents; otherwise uses the trimmed string as-is.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let bare = match ANGLE_ADDR.captures(trimmed) {
            Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
            None => trimmed,
        };
        Self {
            raw: bare.to_string(),
            normalized: bare.to_lowercase(),
        }
    }

    /// The normalized form used for all store lookups and equality.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// The original-case form, for use when emitting a message.
    pub fn as_raw(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Address::normalize(raw)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Address::normalize(&raw)
    }
}
