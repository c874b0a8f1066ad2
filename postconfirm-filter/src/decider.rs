use std::sync::Arc;

use tracing::debug;

use postconfirm_core::{Action, Address, MessageStash, Message, Relayer, Sender, SenderStore};

use crate::challenge_codec::ChallengeCodec;
use crate::challenge_emitter::ChallengeEmitter;
use crate::drop_filter::DropFilter;
use crate::mta_session::{MtaSession, Verdict};
use crate::recipient_policy::RecipientPolicy;

/// `C9`: the state machine that consumes one MTA session and produces
/// exactly one verdict. Owns no per-session state of its own; everything
/// that must survive a suspension point lives in the store or the stash.
pub struct Decider {
    store: Arc<dyn SenderStore>,
    stash: Arc<dyn MessageStash>,
    relayer: Arc<dyn Relayer>,
    drop_filter: DropFilter,
    policy: RecipientPolicy,
    emitter: ChallengeEmitter,
}

impl Decider {
    pub fn new(
        store: Arc<dyn SenderStore>,
        stash: Arc<dyn MessageStash>,
        relayer: Arc<dyn Relayer>,
        drop_filter: DropFilter,
        policy: RecipientPolicy,
        emitter: ChallengeEmitter,
    ) -> Self {
        Self {
            store,
            stash,
            relayer,
            drop_filter,
            policy,
            emitter,
        }
    }

    pub async fn decide(&self, session: &dyn MtaSession) -> Verdict {
        let sender_address = Address::from(session.envelope_from());
        let sender = Sender::new(sender_address.clone(), self.store.clone(), self.stash.clone());

        let recipients: Vec<Address> = session
            .envelope_recipients()
            .iter()
            .map(|r| Address::from(r.as_str()))
            .collect();

        let challenge_recipients = self.policy.challenge_recipients(&recipients);
        if challenge_recipients.is_empty() {
            debug!(sender = %sender_address, recipients = recipients.len(), verdict = "accept", "no recipient requires a challenge");
            return Verdict::Accept;
        }

        let headers = session.headers().to_vec();
        let subject = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("subject"))
            .map(|(_, value)| value.trim_start().to_string())
            .unwrap_or_default();

        let is_challenge_response = ChallengeCodec::is_challenge_response(&subject);
        let should_drop = self.drop_filter.evaluate(&headers);

        if should_drop {
            debug!(sender = %sender_address, recipients = challenge_recipients.len(), verdict = "discard", "drop filter matched");
            return Verdict::Discard;
        }

        if !is_challenge_response {
            return self
                .handle_non_response(&sender, &sender_address, &headers, &subject, &challenge_recipients, session)
                .await;
        }

        self.handle_challenge_response(&sender, &sender_address, &subject).await
    }

    async fn handle_non_response(
        &self,
        sender: &Sender,
        sender_address: &Address,
        headers: &[(String, String)],
        subject: &str,
        challenge_recipients: &[Address],
        session: &dyn MtaSession,
    ) -> Verdict {
        let action = sender.get_action().await;
        match action {
            Action::Accept => {
                debug!(sender = %sender_address, verdict = "accept", action = %action, "known action");
                return Verdict::Accept;
            }
            Action::Reject => {
                debug!(sender = %sender_address, verdict = "reject", action = %action, "known action");
                return Verdict::Reject;
            }
            Action::Discard => {
                debug!(sender = %sender_address, verdict = "discard", action = %action, "known action");
                return Verdict::Discard;
            }
            Action::Unknown | Action::Confirm | Action::Expired => {}
        }

        let body = session.body().await;
        let message = Message {
            headers: headers.to_vec(),
            body,
        };

        let reference = match sender.stash_message(&message, challenge_recipients).await {
            Ok(reference) => reference,
            Err(e) => {
                tracing::warn!(sender = %sender_address, error = %e, "failed to stash message, discarding");
                return Verdict::Discard;
            }
        };

        if matches!(action, Action::Unknown | Action::Expired) {
            let recipient_strings: Vec<String> = challenge_recipients
                .iter()
                .map(|r| r.as_raw().to_string())
                .collect();
            let challenge_id = reference.as_str().to_string();
            self.emitter
                .send_challenge(
                    self.relayer.as_ref(),
                    sender_address,
                    subject,
                    &recipient_strings,
                    &challenge_id,
                    &reference,
                )
                .await;
        }

        debug!(sender = %sender_address, verdict = "discard", action = %action, "stashed pending confirmation");
        Verdict::Discard
    }

    async fn handle_challenge_response(&self, sender: &Sender, sender_address: &Address, subject: &str) -> Verdict {
        let action = sender.get_action().await;
        if action != Action::Confirm {
            debug!(sender = %sender_address, verdict = "accept", action = %action, "challenge response from non-confirm sender");
            return Verdict::Accept;
        }

        let reference = ChallengeCodec::extract(subject);
        let valid = match &reference {
            Some(r) => sender.validate_ref(r).await,
            None => false,
        };

        if !valid {
            debug!(sender = %sender_address, verdict = "reject", "challenge response carries an unknown reference");
            return Verdict::Reject;
        }

        match sender.unstash_messages(self.relayer.as_ref()).await {
            Ok(released) => {
                debug!(sender = %sender_address, released, "released stashed messages after confirmation");
            }
            Err(e) => {
                tracing::warn!(sender = %sender_address, error = %e, "release failed partway through");
            }
        }

        debug!(sender = %sender_address, verdict = "accept", "confirmation accepted");
        Verdict::Accept
    }
}
