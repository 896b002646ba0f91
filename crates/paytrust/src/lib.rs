//! Paytrust Client
//!
//! Ties the trust engine to a transport: every outbound call is signed with
//! the merchant key, every response is verified against the gateway's
//! platform certificates before its body is decoded, and inbound webhook
//! bodies are decrypted with the API v3 key.
//!
//! # Architecture
//!
//! [`Client`] owns one [`paytrust_auth::KeyMaterial`], one
//! [`paytrust_auth::TrustCertificateStore`] and an
//! [`paytrust_core::HttpTransport`]. The store refreshes itself through the
//! client on a cache miss, using a bootstrap call that is exempt from
//! verification.

pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use client::{Client, PreparedRequest, CERTIFICATES_PATH};
pub use config::{ClientConfig, TrustConfig, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiErrorDetail, ClientError, ClientResult};
pub use transport::UreqTransport;

pub use paytrust_auth::{ExpiryPolicy, KeyMaterial, VerificationMode};
pub use paytrust_core::HttpMethod;
