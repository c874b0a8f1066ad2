use async_trait::async_trait;
use lettre::{Address as LettreAddress, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::warn;

use postconfirm_core::{RelayError, Relayer};

/// `C10`: the only production implementation of [`Relayer`], backed by an
/// SMTP submission endpoint. Best-effort: a failure is logged and returned
/// as a [`RelayError`], never retried within this call.
pub struct SmtpRelayer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpRelayer {
    /// `smtp_host` may be a bare hostname (implicit TLS on 465) or a
    /// `host:port` pair understood by lettre's relay builder.
    pub fn new(smtp_host: &str) -> Result<Self, RelayError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
            .map_err(|e| RelayError::Submission(e.to_string()))?
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl Relayer for SmtpRelayer {
    async fn sendmail(
        &self,
        envelope_from: &str,
        recipients: &[String],
        raw_message: &[u8],
    ) -> Result<(), RelayError> {
        let from = parse_address(envelope_from)?;
        let to = recipients
            .iter()
            .map(|r| parse_address(r))
            .collect::<Result<Vec<_>, _>>()?;

        let envelope = lettre::address::Envelope::new(from, to)
            .map_err(|e| RelayError::Submission(e.to_string()))?;

        self.transport
            .send_raw(&envelope, raw_message)
            .await
            .map_err(|e| {
                warn!(envelope_from, error = %e, "smtp relay submission failed");
                RelayError::Submission(e.to_string())
            })?;

        Ok(())
    }
}

fn parse_address(addr: &str) -> Result<Option<LettreAddress>, RelayError> {
    if addr.is_empty() {
        return Ok(None);
    }
    addr.parse::<LettreAddress>()
        .map(Some)
        .map_err(|e| RelayError::Submission(format!("invalid address '{addr}': {e}")))
}
