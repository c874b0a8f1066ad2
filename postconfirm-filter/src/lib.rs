//! The decision pipeline itself: the bulk-mail drop filter, the challenge
//! subject codec and emitter, the session decider that ties them to the
//! sender state machine, an SMTP relayer, and the recipient policy hook.

pub mod challenge_codec;
pub mod challenge_emitter;
pub mod decider;
pub mod drop_filter;
pub mod mta_session;
pub mod recipient_policy;
pub mod relayer;

pub use challenge_codec::ChallengeCodec;
pub use challenge_emitter::ChallengeEmitter;
pub use decider::Decider;
pub use drop_filter::{DropFilter, DropPredicate};
pub use mta_session::{MtaSession, Verdict};
pub use recipient_policy::RecipientPolicy;
pub use relayer::SmtpRelayer;
