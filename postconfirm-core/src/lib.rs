//! Domain types and the sender state machine for the challenge/response
//! mail filter: addresses, actions, references, the two-layer store
//! contract, the durable stash contract, and the `Sender` value object that
//! ties them together.

pub mod action;
pub mod address;
pub mod error;
pub mod record;
pub mod reference;
pub mod regex_cache;
pub mod relay;
pub mod sender;
pub mod store;

pub use action::Action;
pub use address::Address;
pub use error::{ConfigError, PostconfirmError, RelayError, StoreError};
pub use record::{Layer, Message, PatternRule, SenderRecord, StashEntry};
pub use reference::{RefSet, Reference};
pub use relay::Relayer;
pub use sender::Sender;
pub use store::{MessageStash, SenderStore};
