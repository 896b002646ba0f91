//! X.509 helpers: PEM → certificate → serial number and RSA public key.

use paytrust_core::CertificateSerial;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;

use crate::error::{AuthError, AuthResult};

/// A parsed X.509 certificate reduced to what signature checks need.
#[derive(Debug, Clone)]
pub struct ParsedCertificate {
    pub serial: CertificateSerial,
    pub public_key: RsaPublicKey,
    pub der: Vec<u8>,
}

/// Parse a PEM-encoded certificate carrying an RSA public key.
pub fn parse_certificate_pem(pem: &[u8]) -> AuthResult<ParsedCertificate> {
    let cert = Certificate::from_pem(pem)
        .map_err(|e| AuthError::Certificate(format!("pem decode failed: {}", e)))?;

    let serial = serial_to_hex(cert.tbs_certificate.serial_number.as_bytes());

    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| AuthError::Certificate(format!("public key encode failed: {}", e)))?;
    let public_key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| AuthError::Certificate(format!("not an rsa public key: {}", e)))?;

    let der = cert
        .to_der()
        .map_err(|e| AuthError::Certificate(format!("certificate encode failed: {}", e)))?;

    Ok(ParsedCertificate {
        serial,
        public_key,
        der,
    })
}

/// Serial number of a PEM certificate as the gateway spells it.
pub fn certificate_serial_from_pem(pem: &[u8]) -> AuthResult<CertificateSerial> {
    parse_certificate_pem(pem).map(|c| c.serial)
}

/// Upper-case hex without the DER sign-padding zero bytes.
fn serial_to_hex(bytes: &[u8]) -> CertificateSerial {
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    CertificateSerial(hex::encode_upper(&bytes[start..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERCHANT_CERT: &str = include_str!("../../../fixtures/merchant_cert.pem");
    const PLATFORM_CERT: &str = include_str!("../../../fixtures/platform_cert.pem");
    const PLATFORM_KEY: &str = include_str!("../../../fixtures/platform_key.pem");

    #[test]
    fn test_merchant_serial() {
        let serial = certificate_serial_from_pem(MERCHANT_CERT.as_bytes()).unwrap();
        assert_eq!(serial.as_str(), "444F4E27545452555354");
    }

    #[test]
    fn test_platform_serial_and_key() {
        use rsa::pkcs8::DecodePrivateKey;

        let parsed = parse_certificate_pem(PLATFORM_CERT.as_bytes()).unwrap();
        assert_eq!(
            parsed.serial.as_str(),
            "5157F09EFDC096DE15EBE81A47057A7232F1B8E1"
        );

        let private = rsa::RsaPrivateKey::from_pkcs8_pem(PLATFORM_KEY).unwrap();
        assert_eq!(parsed.public_key, private.to_public_key());
        assert!(!parsed.der.is_empty());
    }

    #[test]
    fn test_garbage_pem_rejected() {
        let err = parse_certificate_pem(b"-----BEGIN CERTIFICATE-----\nnope\n-----END CERTIFICATE-----\n")
            .unwrap_err();
        assert!(matches!(err, AuthError::Certificate(_)));
    }

    #[test]
    fn test_serial_hex_strips_sign_padding() {
        assert_eq!(serial_to_hex(&[0x00, 0x9A, 0x01]).as_str(), "9A01");
        assert_eq!(serial_to_hex(&[0x01, 0x00]).as_str(), "0100");
        assert_eq!(serial_to_hex(&[0x00]).as_str(), "00");
    }
}
