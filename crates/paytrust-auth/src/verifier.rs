//! Inbound response verification.
//!
//! Every response is checked against the platform certificate named in its
//! `Wechatpay-Serial` header before the body is handed to a JSON decoder. Two
//! cases skip the check: calls made in [`VerificationMode::Bootstrap`] and
//! throttled (429) responses, which carry no signature.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use paytrust_core::{CanonicalMessage, CertificateSerial, HttpResponse};
use std::sync::Arc;

use crate::cert_store::{CertificateSource, TrustCertificateStore};
use crate::error::{AuthError, AuthResult};

pub const HEADER_TIMESTAMP: &str = "Wechatpay-Timestamp";
pub const HEADER_NONCE: &str = "Wechatpay-Nonce";
pub const HEADER_SERIAL: &str = "Wechatpay-Serial";
pub const HEADER_SIGNATURE: &str = "Wechatpay-Signature";

/// Per-call verification policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerificationMode {
    #[default]
    Verify,
    /// Skip verification for this call only. Used by the certificate
    /// listing fetch, which runs before any certificate is trusted.
    Bootstrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExemptReason {
    Bootstrap,
    RateLimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified { serial: CertificateSerial },
    Exempt(ExemptReason),
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifyOutcome::Verified { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ResponseVerifier {
    store: Arc<TrustCertificateStore>,
}

impl ResponseVerifier {
    pub fn new(store: Arc<TrustCertificateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<TrustCertificateStore> {
        &self.store
    }

    pub fn verify(
        &self,
        response: &HttpResponse,
        mode: VerificationMode,
        source: &dyn CertificateSource,
    ) -> AuthResult<VerifyOutcome> {
        if mode == VerificationMode::Bootstrap {
            tracing::debug!(status = response.status, "verification skipped for bootstrap call");
            return Ok(VerifyOutcome::Exempt(ExemptReason::Bootstrap));
        }
        if response.is_rate_limited() {
            tracing::debug!("verification skipped for rate-limited response");
            return Ok(VerifyOutcome::Exempt(ExemptReason::RateLimited));
        }

        let status = response.status;
        let serial = response.header(HEADER_SERIAL).unwrap_or_default();
        let reject = |reason: String| {
            tracing::warn!(serial = %serial, status, reason = %reason, "response signature rejected");
            AuthError::Signature {
                serial: serial.to_string(),
                status,
                reason,
            }
        };

        let required = |name: &str| {
            response
                .header(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| reject(format!("missing {} header", name)))
        };
        let timestamp = required(HEADER_TIMESTAMP)?;
        let nonce = required(HEADER_NONCE)?;
        let serial_header = required(HEADER_SERIAL)?;
        let signature_b64 = required(HEADER_SIGNATURE)?;

        let signature = BASE64
            .decode(signature_b64.trim())
            .map_err(|e| reject(format!("signature is not base64: {}", e)))?;

        let serial = CertificateSerial::new(serial_header);
        let cert = self.store.get(&serial, source)?;

        let message = CanonicalMessage::response(timestamp, nonce, response.body());
        cert.verify(message.as_bytes(), &signature)
            .map_err(|e| match e {
                AuthError::Signature { reason, .. } => reject(reason),
                other => other,
            })?;

        tracing::debug!(serial = %serial, status, "response signature verified");
        Ok(VerifyOutcome::Verified { serial })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert_store::{CertificateListing, ExpiryPolicy};
    use crate::decrypt::PayloadDecryptor;
    use crate::key_material::KeyMaterial;
    use crate::signer::RequestSigner;

    const API_V3_KEY: &str = include_str!("../../../fixtures/api_v3_key.txt");
    const PLATFORM_KEY: &str = include_str!("../../../fixtures/platform_key.pem");
    const PLATFORM_CERT: &str = include_str!("../../../fixtures/platform_cert.pem");
    const MERCHANT_KEY: &str = include_str!("../../../fixtures/merchant_key.pem");
    const MERCHANT_CERT: &str = include_str!("../../../fixtures/merchant_cert.pem");
    const LISTING: &str = include_str!("../../../fixtures/certificates_response.json");
    const PLATFORM_SERIAL: &str = "5157F09EFDC096DE15EBE81A47057A7232F1B8E1";

    struct FixtureSource;

    impl CertificateSource for FixtureSource {
        fn fetch_certificates(&self) -> AuthResult<CertificateListing> {
            serde_json::from_str(LISTING).map_err(|e| AuthError::Source(e.to_string()))
        }
    }

    fn verifier() -> ResponseVerifier {
        let keys = KeyMaterial::new().with_api_v3_key(API_V3_KEY.trim());
        let store = TrustCertificateStore::new(
            PayloadDecryptor::new(Arc::new(keys)),
            ExpiryPolicy::Enforce,
        );
        ResponseVerifier::new(Arc::new(store))
    }

    /// Signs a response the way the gateway would.
    fn sign_response(key_pem: &str, cert_pem: &str, status: u16, body: &[u8]) -> HttpResponse {
        let platform = RequestSigner::new(Arc::new(
            KeyMaterial::new()
                .with_merchant_id("platform")
                .with_private_key_pem(key_pem)
                .with_certificate_pem(cert_pem),
        ));
        let (timestamp, nonce) = ("1700000000", "n0nce-for-response");
        let message = CanonicalMessage::response(timestamp, nonce, body);
        let signature = platform.sign_message(&message).unwrap();
        HttpResponse::new(
            status,
            vec![
                (HEADER_TIMESTAMP.into(), timestamp.into()),
                (HEADER_NONCE.into(), nonce.into()),
                (HEADER_SERIAL.into(), PLATFORM_SERIAL.into()),
                (HEADER_SIGNATURE.into(), signature),
            ],
            body.to_vec(),
        )
    }

    fn signed(status: u16, body: &[u8]) -> HttpResponse {
        sign_response(PLATFORM_KEY, PLATFORM_CERT, status, body)
    }

    #[test]
    fn test_valid_signature_verifies() {
        let resp = signed(200, br#"{"code_url":"weixin://wxpay/bizpayurl?pr=p4lpSuKzz"}"#);
        let outcome = verifier()
            .verify(&resp, VerificationMode::Verify, &FixtureSource)
            .unwrap();
        assert_eq!(
            outcome,
            VerifyOutcome::Verified {
                serial: CertificateSerial::new(PLATFORM_SERIAL)
            }
        );
    }

    #[test]
    fn test_business_error_body_is_verified_too() {
        let body = br#"{"code":"PARAM_ERROR","message":"invalid out_trade_no"}"#;
        let resp = signed(400, body);
        assert!(verifier()
            .verify(&resp, VerificationMode::Verify, &FixtureSource)
            .unwrap()
            .is_verified());
    }

    #[test]
    fn test_any_body_byte_flip_fails() {
        let body = br#"{"amount":{"total":100}}"#;
        let verifier = verifier();
        let original = signed(200, body);
        for i in 0..body.len() {
            let mut resp = original.clone();
            resp.body[i] ^= 0x20;
            let err = verifier
                .verify(&resp, VerificationMode::Verify, &FixtureSource)
                .unwrap_err();
            assert!(matches!(err, AuthError::Signature { .. }), "byte {i}");
        }
    }

    #[test]
    fn test_header_tampering_fails() {
        let verifier = verifier();
        for header in [HEADER_TIMESTAMP, HEADER_NONCE] {
            let mut resp = signed(200, b"{}");
            for (k, v) in resp.headers.iter_mut() {
                if k == header {
                    v.push('0');
                }
            }
            let err = verifier
                .verify(&resp, VerificationMode::Verify, &FixtureSource)
                .unwrap_err();
            assert!(matches!(err, AuthError::Signature { .. }), "{header}");
        }
    }

    #[test]
    fn test_signature_from_untrusted_key_fails() {
        // Merchant key signing while claiming the platform serial
        let resp = sign_response(MERCHANT_KEY, MERCHANT_CERT, 200, b"{}");
        let err = verifier()
            .verify(&resp, VerificationMode::Verify, &FixtureSource)
            .unwrap_err();
        match err {
            AuthError::Signature { serial, status, .. } => {
                assert_eq!(serial, PLATFORM_SERIAL);
                assert_eq!(status, 200);
            }
            other => panic!("expected signature error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_headers_fail() {
        let verifier = verifier();
        for header in [HEADER_TIMESTAMP, HEADER_NONCE, HEADER_SERIAL, HEADER_SIGNATURE] {
            let mut resp = signed(200, b"{}");
            resp.headers.retain(|(k, _)| k != header);
            let err = verifier
                .verify(&resp, VerificationMode::Verify, &FixtureSource)
                .unwrap_err();
            assert!(matches!(err, AuthError::Signature { .. }), "{header}");
        }
    }

    #[test]
    fn test_unknown_serial_fails() {
        let mut resp = signed(200, b"{}");
        for (k, v) in resp.headers.iter_mut() {
            if k == HEADER_SERIAL {
                *v = "0000AAAA".into();
            }
        }
        let err = verifier()
            .verify(&resp, VerificationMode::Verify, &FixtureSource)
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownCertificate { .. }));
    }

    #[test]
    fn test_rate_limited_is_exempt() {
        let resp = HttpResponse::new(429, vec![], br#"{"code":"FREQUENCY_LIMITED"}"#.to_vec());
        let outcome = verifier()
            .verify(&resp, VerificationMode::Verify, &FixtureSource)
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::Exempt(ExemptReason::RateLimited));
    }

    #[test]
    fn test_bootstrap_is_exempt_without_touching_store() {
        let verifier = verifier();
        let resp = HttpResponse::new(200, vec![], b"{}".to_vec());
        let outcome = verifier
            .verify(&resp, VerificationMode::Bootstrap, &FixtureSource)
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::Exempt(ExemptReason::Bootstrap));
        assert!(verifier.store().is_empty().unwrap());
    }

    #[test]
    fn test_unsigned_success_is_not_exempt() {
        let resp = HttpResponse::new(200, vec![], b"{}".to_vec());
        assert!(verifier()
            .verify(&resp, VerificationMode::Verify, &FixtureSource)
            .is_err());
    }
}
