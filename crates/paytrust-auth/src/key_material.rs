use paytrust_core::{CertificateSerial, MerchantId};
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

use crate::certificate::certificate_serial_from_pem;
use crate::error::{AuthError, AuthResult};

/// The caller's credentials: merchant id, RSA signing key, the serial of the
/// matching merchant certificate, and the symmetric API v3 key.
///
/// Immutable once built. Every field is optional at construction time; a
/// missing field surfaces as [`AuthError::Configuration`] on the first
/// operation that needs it, not when the client is created.
#[derive(Clone, Default)]
pub struct KeyMaterial {
    merchant_id: Option<MerchantId>,
    private_key_pem: Option<Zeroizing<Vec<u8>>>,
    certificate_pem: Option<Vec<u8>>,
    certificate_serial: Option<CertificateSerial>,
    api_v3_key: Option<Zeroizing<Vec<u8>>>,
}

impl KeyMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merchant_id(mut self, merchant_id: impl Into<MerchantId>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    /// PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1 (`BEGIN RSA PRIVATE KEY`) PEM.
    pub fn with_private_key_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.private_key_pem = Some(Zeroizing::new(pem.into()));
        self
    }

    /// Merchant certificate PEM; the signing serial is derived from it.
    pub fn with_certificate_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.certificate_pem = Some(pem.into());
        self
    }

    /// Explicit serial, taking precedence over the certificate PEM.
    pub fn with_certificate_serial(mut self, serial: impl Into<CertificateSerial>) -> Self {
        self.certificate_serial = Some(serial.into());
        self
    }

    pub fn with_api_v3_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.api_v3_key = Some(Zeroizing::new(key.into()));
        self
    }

    /// Load the key and certificate PEM files issued to the merchant.
    pub fn from_pem_files(
        merchant_id: impl Into<MerchantId>,
        private_key_path: &Path,
        certificate_path: &Path,
    ) -> std::io::Result<Self> {
        let key = std::fs::read(private_key_path)?;
        let cert = std::fs::read(certificate_path)?;
        Ok(Self::new()
            .with_merchant_id(merchant_id)
            .with_private_key_pem(key)
            .with_certificate_pem(cert))
    }

    pub fn merchant_id(&self) -> AuthResult<&MerchantId> {
        self.merchant_id
            .as_ref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AuthError::Configuration("merchant id not set".into()))
    }

    pub fn private_key_pem(&self) -> AuthResult<&[u8]> {
        self.private_key_pem
            .as_ref()
            .map(|k| k.as_slice())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AuthError::Configuration("private signing key not set".into()))
    }

    /// The serial sent with every signature.
    pub fn certificate_serial(&self) -> AuthResult<CertificateSerial> {
        if let Some(serial) = self.certificate_serial.as_ref().filter(|s| !s.is_empty()) {
            return Ok(serial.clone());
        }
        let pem = self
            .certificate_pem
            .as_ref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                AuthError::Configuration("merchant certificate or serial not set".into())
            })?;
        certificate_serial_from_pem(pem)
    }

    pub fn api_v3_key(&self) -> AuthResult<&[u8]> {
        self.api_v3_key
            .as_ref()
            .map(|k| k.as_slice())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AuthError::Configuration("api v3 key not set".into()))
    }

    pub fn has_signing_material(&self) -> bool {
        self.merchant_id().is_ok()
            && self.private_key_pem().is_ok()
            && (self.certificate_serial.is_some() || self.certificate_pem.is_some())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("merchant_id", &self.merchant_id)
            .field("private_key", &self.private_key_pem.as_ref().map(|_| "[REDACTED]"))
            .field("certificate_pem", &self.certificate_pem.as_ref().map(|p| p.len()))
            .field("certificate_serial", &self.certificate_serial)
            .field("api_v3_key", &self.api_v3_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
