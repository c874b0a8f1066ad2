use postconfirm_core::regex_cache;

/// `C6`: one header-name/pattern predicate. Fires when the named header is
/// present and its leading-whitespace-trimmed value matches `pattern`
/// (case-insensitive).
#[derive(Clone, Debug)]
pub struct DropPredicate {
    pub header: String,
    pub pattern: String,
}

/// Classifies a header block as evidently bulk/auto-reply/looping mail.
/// Any configured predicate firing is sufficient to drop; adding a header
/// to the block being evaluated can only ever add matches, never remove
/// one (monotone, per the testable property I7).
#[derive(Clone, Debug)]
pub struct DropFilter {
    predicates: Vec<DropPredicate>,
}

impl DropFilter {
    pub fn new(predicates: Vec<DropPredicate>) -> Self {
        Self { predicates }
    }

    /// The two default predicates: `Precedence` against the bulk regex,
    /// `Auto-Submitted` against the auto-submitted regex. Both are
    /// operator-overridable via configuration.
    pub fn with_defaults(bulk_regex: &str, auto_submitted_regex: &str) -> Self {
        Self::new(vec![
            DropPredicate {
                header: "Precedence".to_string(),
                pattern: format!("(?i){bulk_regex}"),
            },
            DropPredicate {
                header: "Auto-Submitted".to_string(),
                pattern: format!("(?i){auto_submitted_regex}"),
            },
        ])
    }

    pub fn evaluate(&self, headers: &[(String, String)]) -> bool {
        for predicate in &self.predicates {
            let re = match regex_cache::compiled(&predicate.pattern) {
                Ok(re) => re,
                Err(_) => continue,
            };

            for (name, value) in headers {
                if name.eq_ignore_ascii_case(&predicate.header) && re.is_match(value.trim_start()) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> DropFilter {
        DropFilter::with_defaults(r"(junk|list|bulk|auto_reply)", r"^auto-")
    }

    #[test]
    fn precedence_bulk_triggers_drop() {
        let headers = vec![("Precedence".to_string(), " bulk".to_string())];
        assert!(filter().evaluate(&headers));
    }

    #[test]
    fn auto_submitted_triggers_drop() {
        let headers = vec![("Auto-Submitted".to_string(), "auto-replied".to_string())];
        assert!(filter().evaluate(&headers));
    }

    #[test]
    fn unrelated_headers_do_not_trigger() {
        let headers = vec![("Subject".to_string(), "Hello".to_string())];
        assert!(!filter().evaluate(&headers));
    }

    #[test]
    fn case_insensitive_header_name_and_value() {
        let headers = vec![("PRECEDENCE".to_string(), "BULK".to_string())];
        assert!(filter().evaluate(&headers));
    }

    #[test]
    fn adding_a_header_never_flips_true_to_false() {
        let base = vec![("Precedence".to_string(), "bulk".to_string())];
        let mut extended = base.clone();
        extended.push(("X-Mailer".to_string(), "whatever".to_string()));

        assert!(filter().evaluate(&base));
        assert!(filter().evaluate(&extended));
    }

    #[test]
    fn overridable_regex_can_be_narrowed() {
        let narrow = DropFilter::with_defaults("junk", r"^auto-");
        let headers = vec![("Precedence".to_string(), "bulk".to_string())];
        assert!(!narrow.evaluate(&headers));
    }
}
