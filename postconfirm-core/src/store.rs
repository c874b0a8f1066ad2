use async_trait::async_trait;

use crate::action::Action;
use crate::address::Address;
use crate::error::StoreError;
use crate::record::{Layer, PatternRule, StashEntry};
use crate::reference::RefSet;

/// `C3`: the two-layer sender→(action, refs) mapping, with a pattern table
/// consulted when no exact record exists.
///
/// Implementations perform the merge described in the data model (dynamic
/// row wins on action, refs union); a transient backend failure should be
/// surfaced as [`StoreError::Transient`] so the decider can fall back to
/// treating the sender as `unknown` rather than propagating an error to the MTA.
#[async_trait]
pub trait SenderStore: Send + Sync {
    async fn get_action(&self, sender: &Address) -> Result<(Action, RefSet), StoreError>;

    /// Upsert into the dynamic table. `refs` replaces or merges depending on
    /// the call site: the challenge-emission path passes the union it wants
    /// stored, the operator path passes a full replacement.
    async fn set_action(
        &self,
        sender: &Address,
        action: Action,
        refs: RefSet,
    ) -> Result<(), StoreError>;

    async fn iter_patterns(&self) -> Result<Vec<PatternRule>, StoreError>;
}

/// `C4`: the durable per-sender queue of stashed messages.
///
/// `peek_next` and `ack` together implement the "deletion driven by
/// iteration" contract: a caller must not consider an entry gone until it
/// has successfully handed it off and called `ack`, so a crash mid-release
/// leaves the remaining entries stashed and re-releasable.
#[async_trait]
pub trait MessageStash: Send + Sync {
    /// Append a new entry to the dynamic stash. Returns its id.
    async fn stash(
        &self,
        sender: &Address,
        recipients: &[Address],
        message: &[u8],
    ) -> Result<i64, StoreError>;

    /// The oldest un-acked entry for `sender`, dynamic table first, then
    /// static, FIFO within each by creation time (ties by id). `None` once
    /// both tables are drained.
    async fn peek_next(&self, sender: &Address) -> Result<Option<(StashEntry, Layer)>, StoreError>;

    /// Delete the entry after it has been successfully handed to the relayer.
    async fn ack(&self, id: i64, layer: Layer) -> Result<(), StoreError>;
}
