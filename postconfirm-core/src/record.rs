use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::address::Address;
use crate::reference::RefSet;

/// Which of the two layered tables a record lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Dynamic,
    Static,
}

/// `(sender, type, action, refs, source)` as stored in `senders`/`senders_static`.
#[derive(Clone, Debug)]
pub struct SenderRecord {
    pub sender: Address,
    pub action: Action,
    pub refs: RefSet,
    pub source: String,
}

/// A `(regex, action)` pair from a `type='P'` row. Patterns never carry refs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    pub action: Action,
}

/// One queued message awaiting release, as stored in `stash`/`stash_static`.
#[derive(Clone, Debug)]
pub struct StashEntry {
    pub id: i64,
    pub sender: Address,
    pub recipients: Vec<Address>,
    pub message: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// An ordered header block plus a raw body, in the form the decider hands
/// to the stash and that the stash hands back out on release.
#[derive(Clone, Debug, Default)]
pub struct Message {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Message {
    /// `header-lines CRLF body`, matching the separator used when the
    /// message was originally captured (see the data model's reconstruction rule).
    pub fn reform(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b":");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }

    /// The `Subject` header's value with leading whitespace trimmed, if present.
    pub fn subject(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("subject"))
            .map(|(_, value)| value.trim_start())
    }
}
