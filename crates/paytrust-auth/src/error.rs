use thiserror::Error;

/// Errors raised by the signing, verification and decryption engine.
///
/// Messages carry diagnostic context (serial number, algorithm, http status)
/// but never key bytes or the symmetric secret.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Key material absent or malformed. Not retryable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Encryption algorithm outside the accepted set.
    #[error("unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Serial not present in the trust store, even after a refresh.
    #[error("unknown platform certificate serial: {serial}")]
    UnknownCertificate { serial: String },

    /// Cached certificate used outside its effective/expire window.
    #[error("platform certificate {serial} is outside its validity window")]
    ExpiredCertificate { serial: String },

    /// Response signature missing, malformed or not matching.
    #[error("response signature rejected (serial {serial}, http {status}): {reason}")]
    Signature {
        serial: String,
        status: u16,
        reason: String,
    },

    /// AEAD authentication tag did not verify.
    #[error("payload integrity check failed ({algorithm})")]
    Integrity { algorithm: String },

    #[error("private key parse error: {0}")]
    KeyParse(String),

    #[error("certificate parse error: {0}")]
    Certificate(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("random source failure: {0}")]
    Random(String),

    /// The certificate listing could not be fetched.
    #[error("certificate source error: {0}")]
    Source(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the same call may succeed later without configuration changes.
    ///
    /// Only an unknown serial qualifies: the gateway may rotate a new
    /// certificate into the listing after this call failed.
    pub fn may_resolve_later(&self) -> bool {
        matches!(self, AuthError::UnknownCertificate { .. })
    }
}

impl From<paytrust_core::CoreError> for AuthError {
    fn from(e: paytrust_core::CoreError) -> Self {
        match e {
            paytrust_core::CoreError::Random(msg) => AuthError::Random(msg),
            other => AuthError::Source(other.to_string()),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
