use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::warn;

use postconfirm_core::{Address, Reference, Relayer};

use crate::challenge_codec::ChallengeCodec;

#[derive(Serialize)]
struct TemplateVars<'a> {
    subject: &'a str,
    sender_address: &'a str,
    recipient_address: String,
    admin_address: &'a str,
    id: &'a str,
}

/// `C8`: renders the challenge body from a template and hands the
/// resulting message to the relayer.
pub struct ChallengeEmitter {
    template_path: PathBuf,
    admin_address: String,
}

impl ChallengeEmitter {
    pub fn new(template_path: impl Into<PathBuf>, admin_address: impl Into<String>) -> Self {
        Self {
            template_path: template_path.into(),
            admin_address: admin_address.into(),
        }
    }

    /// Send the challenge email to `sender`, with `reference` embedded in
    /// the subject and `challenge_id` available to the template. The
    /// template file is re-read on every call so an operator can edit it
    /// live without restarting the daemon.
    pub async fn send_challenge(
        &self,
        relayer: &dyn Relayer,
        sender: &Address,
        original_subject: &str,
        recipients: &[String],
        challenge_id: &str,
        reference: &Reference,
    ) {
        let body = match self.render(original_subject, sender, recipients, challenge_id) {
            Ok(body) => body,
            Err(e) => {
                warn!(sender = %sender, error = %e, "failed to render challenge template, not sending challenge");
                return;
            }
        };

        let challenge_subject = ChallengeCodec::format_subject(reference);
        let first_recipient = recipients.first().cloned().unwrap_or_default();

        let message = format!(
            "From: {from}\r\nTo: {to}\r\nSubject:{subject}\r\n\r\n{body}",
            from = first_recipient,
            to = sender.as_raw(),
            subject = challenge_subject,
            body = body,
        );

        if let Err(e) = relayer
            .sendmail(&first_recipient, &[sender.as_raw().to_string()], message.as_bytes())
            .await
        {
            warn!(sender = %sender, error = %e, "failed to hand off challenge email to relayer");
        }
    }

    fn render(
        &self,
        subject: &str,
        sender: &Address,
        recipients: &[String],
        challenge_id: &str,
    ) -> anyhow::Result<String> {
        let template = read_template(&self.template_path)?;

        let vars = TemplateVars {
            subject,
            sender_address: sender.as_raw(),
            recipient_address: recipients.join(", "),
            admin_address: &self.admin_address,
            id: challenge_id,
        };

        let reg = Handlebars::new();
        Ok(reg.render_template(&template, &vars)?)
    }
}

fn read_template(path: &Path) -> anyhow::Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingRelayer {
        sent: Mutex<Vec<(String, Vec<String>, Vec<u8>)>>,
    }

    #[async_trait]
    impl Relayer for RecordingRelayer {
        async fn sendmail(
            &self,
            from: &str,
            recipients: &[String],
            raw: &[u8],
        ) -> Result<(), postconfirm_core::RelayError> {
            self.sent
                .lock()
                .unwrap()
                .push((from.to_string(), recipients.to_vec(), raw.to_vec()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn renders_template_and_hands_to_relayer() {
        let path = write_temp_template(
            "Please confirm message '{{subject}}' to {{recipient_address}} ({{id}}); admin: {{admin_address}}",
        );

        let emitter = ChallengeEmitter::new(&path, "admin@example.org");
        let relayer = RecordingRelayer {
            sent: Mutex::new(vec![]),
        };

        emitter
            .send_challenge(
                &relayer,
                &Address::from("bob@example.org"),
                "Hello",
                &["list@example.org".to_string()],
                "challenge-1",
                &Reference::from("deadbeef"),
            )
            .await;

        let sent = relayer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (from, recipients, raw) = &sent[0];
        assert_eq!(from, "list@example.org");
        assert_eq!(recipients, &vec!["bob@example.org".to_string()]);

        let text = String::from_utf8(raw.clone()).unwrap();
        assert!(text.starts_with("From: list@example.org\r\n"));
        assert!(text.contains("Subject: Confirm: ::deadbeef"));
        assert!(text.contains("confirm message 'Hello' to list@example.org (challenge-1)"));
        assert!(text.contains("admin: admin@example.org"));
    }

    fn write_temp_template(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "postconfirm-test-template-{}-{}.mustache",
            std::process::id(),
            contents.len()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }
}
