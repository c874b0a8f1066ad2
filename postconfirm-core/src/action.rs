use serde::{Deserialize, Serialize};

/// The disposition recorded for a sender.
///
/// `Unknown` is the implicit default when no record exists; `Expired` is
/// never stored, it is derived when a `Confirm` row is read past its TTL
/// (see [`Action::materialize`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Accept,
    Reject,
    Discard,
    Confirm,
    Unknown,
    Expired,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Reject => "reject",
            Action::Discard => "discard",
            Action::Confirm => "confirm",
            Action::Unknown => "unknown",
            Action::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Action> {
        match s {
            "accept" => Some(Action::Accept),
            "reject" => Some(Action::Reject),
            "discard" => Some(Action::Discard),
            "confirm" => Some(Action::Confirm),
            "unknown" => Some(Action::Unknown),
            "expired" => Some(Action::Expired),
            _ => None,
        }
    }

    /// Demote a `Confirm` row to `Expired` if it is older than `ttl`. Any
    /// other action, or an unconfigured TTL, passes through unchanged.
    pub fn materialize(self, age: Option<chrono::Duration>, ttl: Option<chrono::Duration>) -> Action {
        match (self, age, ttl) {
            (Action::Confirm, Some(age), Some(ttl)) if age > ttl => Action::Expired,
            _ => self,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn round_trips_through_str() {
        for a in [
            Action::Accept,
            Action::Reject,
            Action::Discard,
            Action::Confirm,
            Action::Unknown,
            Action::Expired,
        ] {
            assert_eq!(Action::parse(a.as_str()), Some(a));
        }
    }

    #[test]
    fn confirm_expires_past_ttl() {
        let a = Action::Confirm.materialize(Some(Duration::seconds(120)), Some(Duration::seconds(60)));
        assert_eq!(a, Action::Expired);
    }

    #[test]
    fn confirm_stays_confirm_within_ttl() {
        let a = Action::Confirm.materialize(Some(Duration::seconds(30)), Some(Duration::seconds(60)));
        assert_eq!(a, Action::Confirm);
    }

    #[test]
    fn no_ttl_never_expires() {
        let a = Action::Confirm.materialize(Some(Duration::seconds(1_000_000)), None);
        assert_eq!(a, Action::Confirm);
    }

    #[test]
    fn non_confirm_actions_are_untouched() {
        let a = Action::Accept.materialize(Some(Duration::seconds(1_000_000)), Some(Duration::seconds(1)));
        assert_eq!(a, Action::Accept);
    }
}
