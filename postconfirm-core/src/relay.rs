use async_trait::async_trait;

use crate::error::RelayError;

/// `C10`: best-effort outbound submission. The core never retries within a
/// session and never turns a relay failure into a verdict change — a
/// failure is logged by the caller and the stash entry (if any) is left
/// for a later release attempt.
#[async_trait]
pub trait Relayer: Send + Sync {
    async fn sendmail(
        &self,
        envelope_from: &str,
        recipients: &[String],
        raw_message: &[u8],
    ) -> Result<(), RelayError>;
}
