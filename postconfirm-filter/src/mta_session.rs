use async_trait::async_trait;

/// The external, MTA-facing session object the decider consumes. The wire
/// protocol that produces one of these (milter, LMTP, whatever the
/// surrounding daemon speaks) is out of scope here; this is only the shape
/// the decider needs.
#[async_trait]
pub trait MtaSession: Send + Sync {
    fn envelope_from(&self) -> &str;
    fn envelope_recipients(&self) -> &[String];

    /// Header block in source order, name case preserved.
    fn headers(&self) -> &[(String, String)];

    /// The body is read lazily: a session backed by a streaming transport
    /// should only materialize it when the decider actually asks.
    async fn body(&self) -> Vec<u8>;
}

/// The only three outcomes the decider ever produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
    Discard,
}
