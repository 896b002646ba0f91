use paytrust_auth::AuthError;
use thiserror::Error;

/// Error type for the paytrust-notify crate.
///
/// Decryption failures keep the underlying [`AuthError`] so callers can tell
/// an integrity failure from a configuration problem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The raw body is not a notification envelope.
    #[error("malformed notification envelope: {0}")]
    MalformedEnvelope(String),

    /// A typed parser was handed a notification of another kind.
    #[error("unexpected event type {actual} (expected {expected})")]
    UnexpectedEvent { expected: String, actual: String },

    #[error("resource decryption failed: {0}")]
    Decrypt(#[from] AuthError),

    /// Decrypted plaintext did not match the expected shape.
    #[error("malformed resource for {event_type}: {reason}")]
    MalformedResource { event_type: String, reason: String },
}

/// Result type alias for paytrust-notify operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
