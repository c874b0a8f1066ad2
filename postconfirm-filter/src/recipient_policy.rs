use postconfirm_core::Address;

/// Implements the `recipient_requires_challenge` policy hook: a configurable
/// set of protected exact addresses and `@domain` suffixes. An empty set
/// means every recipient is protected, which is the conservative default a
/// fresh install should ship with.
#[derive(Clone, Debug, Default)]
pub struct RecipientPolicy {
    protected: Vec<String>,
}

impl RecipientPolicy {
    /// `protected` entries are either a full address (`bob@example.org`) or
    /// an `@domain` suffix (`@example.org`); matching is case-insensitive.
    pub fn new(protected: Vec<String>) -> Self {
        Self {
            protected: protected.into_iter().map(|p| p.to_ascii_lowercase()).collect(),
        }
    }

    /// The subset of `recipients` that require a challenge. Empty iff none
    /// do, which the decider treats as "accept outright".
    pub fn challenge_recipients(&self, recipients: &[Address]) -> Vec<Address> {
        if self.protected.is_empty() {
            return recipients.to_vec();
        }
        recipients
            .iter()
            .filter(|r| self.is_protected(r.as_str()))
            .cloned()
            .collect()
    }

    fn is_protected(&self, address: &str) -> bool {
        self.protected.iter().any(|p| {
            if let Some(domain) = p.strip_prefix('@') {
                address.ends_with(&format!("@{domain}"))
            } else {
                address == p
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    #[test]
    fn empty_policy_protects_everyone() {
        let policy = RecipientPolicy::new(vec![]);
        let recipients = vec![addr("a@ex.org"), addr("b@other.org")];
        assert_eq!(policy.challenge_recipients(&recipients), recipients);
    }

    #[test]
    fn exact_address_match() {
        let policy = RecipientPolicy::new(vec!["list@ex.org".to_string()]);
        let recipients = vec![addr("list@ex.org"), addr("other@ex.org")];
        assert_eq!(policy.challenge_recipients(&recipients), vec![addr("list@ex.org")]);
    }

    #[test]
    fn domain_suffix_match_is_case_insensitive() {
        let policy = RecipientPolicy::new(vec!["@Ex.org".to_string()]);
        let recipients = vec![addr("anyone@ex.org"), addr("anyone@other.org")];
        assert_eq!(policy.challenge_recipients(&recipients), vec![addr("anyone@ex.org")]);
    }

    #[test]
    fn non_matching_recipients_yield_empty() {
        let policy = RecipientPolicy::new(vec!["@ex.org".to_string()]);
        let recipients = vec![addr("anyone@other.org")];
        assert!(policy.challenge_recipients(&recipients).is_empty());
    }
}
