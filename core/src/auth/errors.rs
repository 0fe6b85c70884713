use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced while negotiating a connection.
///
/// Resolution helpers report absence as a plain `None`; only genuinely
/// invalid configurations and remote rejections surface through this type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// The request shape is malformed: a missing required field, or an
    /// ambiguous/absent mode indicator such as no certificate source.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A referenced resource (certificate file, store entry) does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Credential material exists but is unusable, e.g. a certificate
    /// without a private key.
    #[error("invalid credential material: {0}")]
    InvalidCredentialMaterial(String),

    /// The selected mode needs a capability this platform does not offer.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The remote token endpoint rejected the request.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No strategy produced a session.
    #[error("unable to connect using the provided arguments")]
    ConnectionFailed,
}

/// A [`ConnectError`] stamped with the moment it was raised, as handed to
/// the hosting shell for display.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct ConnectFailure {
    pub error: ConnectError,
    pub timestamp_utc: DateTime<Utc>,
}

impl ConnectFailure {
    pub fn new(error: ConnectError) -> Self {
        Self {
            error,
            timestamp_utc: Utc::now(),
        }
    }
}

impl From<ConnectError> for ConnectFailure {
    fn from(error: ConnectError) -> Self {
        Self::new(error)
    }
}
