use std::sync::Arc;

use tracing::{debug, warn};

use crate::action::Action;
use crate::address::Address;
use crate::error::StoreError;
use crate::record::Message;
use crate::reference::{RefSet, Reference};
use crate::relay::Relayer;
use crate::store::{MessageStash, SenderStore};

/// `C5`: binds an address to the store, exposing action lookup, reference
/// validation and stash/unstash. Mutations are store writes rather than
/// in-memory field edits, so a `Sender` is cheap to construct and safe to
/// drop across a session's suspension points.
pub struct Sender {
    email: Address,
    store: Arc<dyn SenderStore>,
    stash: Arc<dyn MessageStash>,
}

impl Sender {
    pub fn new(email: Address, store: Arc<dyn SenderStore>, stash: Arc<dyn MessageStash>) -> Self {
        Self { email, store, stash }
    }

    pub fn get_email(&self) -> &Address {
        &self.email
    }

    /// The current action for this sender. A transient store failure is
    /// treated as `unknown` so the decider can proceed cautiously rather
    /// than fail the whole session.
    pub async fn get_action(&self) -> Action {
        match self.store.get_action(&self.email).await {
            Ok((action, _)) => action,
            Err(e) => {
                warn!(sender = %self.email, error = %e, "treating sender as unknown after transient store error");
                Action::Unknown
            }
        }
    }

    /// True iff `candidate` is in the sender's current ref set.
    pub async fn validate_ref(&self, candidate: &Reference) -> bool {
        match self.store.get_action(&self.email).await {
            Ok((_, refs)) => refs.contains(candidate),
            Err(e) => {
                warn!(sender = %self.email, error = %e, "ref validation failed closed after transient store error");
                false
            }
        }
    }

    /// Append `message` to the stash and attach a fresh reference to the
    /// sender's record: a fresh/expired sender moves to `confirm` with just
    /// this reference, an already-`confirm` sender accumulates it.
    pub async fn stash_message(
        &self,
        message: &Message,
        recipients: &[Address],
    ) -> Result<Reference, StoreError> {
        let reference = Reference::generate();
        let raw = message.reform();

        self.stash.stash(&self.email, recipients, &raw).await?;

        let (action, existing_refs) = self.store.get_action(&self.email).await?;
        let refs = match action {
            Action::Confirm | Action::Expired => existing_refs.union(&RefSet::single(reference.clone())),
            _ => RefSet::single(reference.clone()),
        };

        self.store
            .set_action(&self.email, Action::Confirm, refs)
            .await?;

        debug!(sender = %self.email, reference = %reference, "stashed message pending confirmation");
        Ok(reference)
    }

    /// Drain the stash, handing each entry to `relayer` in FIFO order
    /// (dynamic table before static). An entry is only deleted once the
    /// relayer has accepted it, so an aborted release leaves the remainder
    /// stashed. On a fully successful drain the sender is promoted to
    /// `accept` with an empty ref set. Returns the count of entries released.
    pub async fn unstash_messages(&self, relayer: &dyn Relayer) -> Result<usize, StoreError> {
        let mut released = 0usize;
        let mut drained = false;

        loop {
            match self.stash.peek_next(&self.email).await? {
                None => {
                    drained = true;
                    break;
                }
                Some((entry, layer)) => {
                    let recipients: Vec<String> = entry
                        .recipients
                        .iter()
                        .map(|a| a.as_raw().to_string())
                        .collect();

                    match relayer
                        .sendmail(self.email.as_raw(), &recipients, &entry.message)
                        .await
                    {
                        Ok(()) => {
                            self.stash.ack(entry.id, layer).await?;
                            released += 1;
                        }
                        Err(e) => {
                            warn!(sender = %self.email, entry = entry.id, error = %e, "relay failed, leaving entry stashed for retry");
                            break;
                        }
                    }
                }
            }
        }

        if drained {
            self.store
                .set_action(&self.email, Action::Accept, RefSet::new())
                .await?;
        }

        debug!(sender = %self.email, released, drained, "released stashed messages");
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Layer, PatternRule, StashEntry};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        inner: Mutex<std::collections::HashMap<String, (Action, RefSet)>>,
    }

    #[async_trait]
    impl SenderStore for FakeStore {
        async fn get_action(&self, sender: &Address) -> Result<(Action, RefSet), StoreError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .get(sender.as_str())
                .cloned()
                .unwrap_or((Action::Unknown, RefSet::new())))
        }

        async fn set_action(
            &self,
            sender: &Address,
            action: Action,
            refs: RefSet,
        ) -> Result<(), StoreError> {
            self.inner
                .lock()
                .unwrap()
                .insert(sender.as_str().to_string(), (action, refs));
            Ok(())
        }

        async fn iter_patterns(&self) -> Result<Vec<PatternRule>, StoreError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct FakeStash {
        entries: Mutex<Vec<StashEntry>>,
        next_id: Mutex<i64>,
    }

    #[async_trait]
    impl MessageStash for FakeStash {
        async fn stash(
            &self,
            sender: &Address,
            recipients: &[Address],
            message: &[u8],
        ) -> Result<i64, StoreError> {
            let mut next_id = self.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;
            self.entries.lock().unwrap().push(StashEntry {
                id,
                sender: sender.clone(),
                recipients: recipients.to_vec(),
                message: message.to_vec(),
                created_at: Utc::now(),
            });
            Ok(id)
        }

        async fn peek_next(
            &self,
            sender: &Address,
        ) -> Result<Option<(StashEntry, Layer)>, StoreError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .find(|e| &e.sender == sender)
                .cloned()
                .map(|e| (e, Layer::Dynamic)))
        }

        async fn ack(&self, id: i64, _layer: Layer) -> Result<(), StoreError> {
            self.entries.lock().unwrap().retain(|e| e.id != id);
            Ok(())
        }
    }

    struct FakeRelayer {
        fail: bool,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Relayer for FakeRelayer {
        async fn sendmail(
            &self,
            _from: &str,
            recipients: &[String],
            _raw: &[u8],
        ) -> Result<(), crate::error::RelayError> {
            if self.fail {
                return Err(crate::error::RelayError::Submission("boom".into()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push(recipients.join(","));
            Ok(())
        }
    }

    fn sender(store: Arc<FakeStore>, stash: Arc<FakeStash>) -> Sender {
        Sender::new(Address::from("bob@example.org"), store, stash)
    }

    #[tokio::test]
    async fn stash_message_on_unknown_sender_transitions_to_confirm() {
        let store = Arc::new(FakeStore::default());
        let stash = Arc::new(FakeStash::default());
        let s = sender(store.clone(), stash.clone());

        let msg = Message {
            headers: vec![("Subject".into(), " Hi".into())],
            body: b"hello".to_vec(),
        };
        let reference = s
            .stash_message(&msg, &[Address::from("list@example.org")])
            .await
            .unwrap();

        assert_eq!(s.get_action().await, Action::Confirm);
        assert!(s.validate_ref(&reference).await);
    }

    #[tokio::test]
    async fn second_stash_while_confirm_accumulates_refs() {
        let store = Arc::new(FakeStore::default());
        let stash = Arc::new(FakeStash::default());
        let s = sender(store.clone(), stash.clone());
        let msg = Message::default();

        let r1 = s.stash_message(&msg, &[]).await.unwrap();
        let r2 = s.stash_message(&msg, &[]).await.unwrap();

        assert!(s.validate_ref(&r1).await);
        assert!(s.validate_ref(&r2).await);
    }

    #[tokio::test]
    async fn unstash_releases_in_order_and_promotes_to_accept() {
        let store = Arc::new(FakeStore::default());
        let stash = Arc::new(FakeStash::default());
        let s = sender(store.clone(), stash.clone());
        let msg = Message::default();

        s.stash_message(&msg, &[Address::from("r1@example.org")])
            .await
            .unwrap();
        s.stash_message(&msg, &[Address::from("r2@example.org")])
            .await
            .unwrap();

        let relayer = FakeRelayer {
            fail: false,
            delivered: Mutex::new(vec![]),
        };
        let released = s.unstash_messages(&relayer).await.unwrap();

        assert_eq!(released, 2);
        assert_eq!(s.get_action().await, Action::Accept);
        assert_eq!(
            relayer.delivered.lock().unwrap().as_slice(),
            &["r1@example.org".to_string(), "r2@example.org".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_relay_leaves_entry_stashed() {
        let store = Arc::new(FakeStore::default());
        let stash = Arc::new(FakeStash::default());
        let s = sender(store.clone(), stash.clone());
        let msg = Message::default();

        let reference = s.stash_message(&msg, &[]).await.unwrap();

        let relayer = FakeRelayer {
            fail: true,
            delivered: Mutex::new(vec![]),
        };
        let released = s.unstash_messages(&relayer).await.unwrap();

        assert_eq!(released, 0);
        assert_eq!(stash.entries.lock().unwrap().len(), 1);
        assert_eq!(s.get_action().await, Action::Confirm);
        assert!(s.validate_ref(&reference).await);
    }
}
