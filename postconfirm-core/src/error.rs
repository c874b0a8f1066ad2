use thiserror::Error;

/// Failure domains a caller may want to match on individually, per the
/// error handling design: stores fail transiently, relayers fail silently,
/// codecs fail by degrading ("not a challenge response"), configuration
/// fails fatally at startup.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transient backend error: {0}")]
    Transient(String),
    #[error("store record violates an invariant: {0}")]
    Invariant(String),
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("relay submission failed: {0}")]
    Submission(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration key: {0}")]
    MissingKey(String),
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Umbrella error for call sites (CLI entry points) that just need a single
/// `Result` alias; library code should prefer the specific variants above.
#[derive(Error, Debug)]
pub enum PostconfirmError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
