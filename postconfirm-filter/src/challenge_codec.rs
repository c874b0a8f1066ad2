use lazy_static::lazy_static;
use regex::Regex;

use postconfirm_core::Reference;

lazy_static! {
    // Anchored at start (after the caller trims leading whitespace), case-insensitive.
    static ref CHALLENGE_SUBJECT: Regex = Regex::new(r"(?i)^Confirm: ::([a-f0-9]+)").unwrap();
}

/// `C7`: formats the challenge subject line and recognizes/parses it on
/// the way back in.
pub struct ChallengeCodec;

impl ChallengeCodec {
    /// ` Confirm: ::<reference>` — note the single leading space, which
    /// callers must preserve verbatim when emitting the header.
    pub fn format_subject(reference: &Reference) -> String {
        format!(" Confirm: ::{reference}")
    }

    /// `true` iff the (whitespace-trimmed) subject is recognized as a
    /// challenge response.
    pub fn is_challenge_response(subject: &str) -> bool {
        Self::extract(subject).is_some()
    }

    /// The reference carried by a challenge-response subject, or `None` if
    /// the subject does not match — a malformed subject is simply treated
    /// as not being a challenge response, per the error handling design.
    pub fn extract(subject: &str) -> Option<Reference> {
        CHALLENGE_SUBJECT
            .captures(subject.trim_start())
            .and_then(|c| c.get(1))
            .map(|m| Reference::from(m.as_str()))
    }
}
