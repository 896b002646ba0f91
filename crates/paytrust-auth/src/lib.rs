//! Authentication and trust engine for the payment gateway API.
//!
//! - [`RequestSigner`] signs outbound requests with the merchant RSA key.
//! - [`ResponseVerifier`] checks inbound response signatures against platform
//!   certificates held by a [`TrustCertificateStore`].
//! - [`PayloadDecryptor`] opens AEAD_AES_256_GCM resources from webhooks and
//!   the certificate listing.
//!
//! All of them read credentials from a shared, immutable [`KeyMaterial`].

pub mod cert_store;
pub mod certificate;
pub mod decrypt;
pub mod error;
pub mod key_material;
pub mod signer;
pub mod verifier;

pub use cert_store::{
    CertificateEntry, CertificateListing, CertificateSource, ExpiryPolicy, TrustCertificateStore,
    TrustedCertificate,
};
pub use certificate::{certificate_serial_from_pem, parse_certificate_pem, ParsedCertificate};
pub use decrypt::{EncryptedResource, PayloadDecryptor, AEAD_AES_256_GCM, API_V3_KEY_LEN};
pub use error::{AuthError, AuthResult};
pub use key_material::KeyMaterial;
pub use signer::{RequestSigner, SignedRequestHeader, AUTH_SCHEME};
pub use verifier::{
    ExemptReason, ResponseVerifier, VerificationMode, VerifyOutcome, HEADER_NONCE, HEADER_SERIAL,
    HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
