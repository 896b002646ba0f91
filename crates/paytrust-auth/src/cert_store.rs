use chrono::{DateTime, FixedOffset, Utc};
use paytrust_core::CertificateSerial;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::certificate::parse_certificate_pem;
use crate::decrypt::{EncryptedResource, PayloadDecryptor};
use crate::error::{AuthError, AuthResult};

// ---------------------------------------------------------------------------
// Certificate listing wire format
// ---------------------------------------------------------------------------

/// Body of the certificate-listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificateListing {
    #[serde(default)]
    pub data: Vec<CertificateEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateEntry {
    pub serial_no: CertificateSerial,
    pub effective_time: DateTime<FixedOffset>,
    pub expire_time: DateTime<FixedOffset>,
    #[serde(alias = "encrypted_certificate")]
    pub encrypt_certificate: EncryptedResource,
}

/// Where the store gets a fresh listing from.
///
/// The client implements this with a signed GET whose response is exempt
/// from signature verification.
pub trait CertificateSource: Send + Sync {
    fn fetch_certificates(&self) -> AuthResult<CertificateListing>;
}

// ---------------------------------------------------------------------------
// TrustedCertificate
// ---------------------------------------------------------------------------

/// A decrypted and parsed platform certificate.
#[derive(Debug, Clone)]
pub struct TrustedCertificate {
    pub serial_no: CertificateSerial,
    pub effective_time: DateTime<FixedOffset>,
    pub expire_time: DateTime<FixedOffset>,
    pub public_key: RsaPublicKey,
    pub certificate_der: Vec<u8>,
    /// The listing ciphertext this certificate was recovered from.
    pub encrypted: EncryptedResource,
}

impl TrustedCertificate {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.effective_time && now <= self.expire_time
    }

    /// Check an RSA PKCS#1 v1.5 SHA-256 signature made by this certificate's key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> AuthResult<()> {
        let signature =
            Signature::try_from(signature).map_err(|e| self.signature_error(e.to_string()))?;
        VerifyingKey::<Sha256>::new(self.public_key.clone())
            .verify(message, &signature)
            .map_err(|_| self.signature_error("signature mismatch".into()))
    }

    fn signature_error(&self, reason: String) -> AuthError {
        AuthError::Signature {
            serial: self.serial_no.to_string(),
            status: 0,
            reason,
        }
    }
}

/// What to do with a cached certificate outside its validity window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryPolicy {
    /// Reject with [`AuthError::ExpiredCertificate`].
    #[default]
    Enforce,
    /// Use the certificate anyway.
    Permissive,
}

// ---------------------------------------------------------------------------
// TrustCertificateStore
// ---------------------------------------------------------------------------

/// Cache of platform certificates keyed by serial.
///
/// Populated lazily: a lookup miss triggers one refresh from the source and a
/// second lookup. A refresh replaces the whole set or nothing. Fetching and
/// decrypting happen without holding the lock, so concurrent refreshes are
/// allowed and the last writer wins.
pub struct TrustCertificateStore {
    certificates: RwLock<HashMap<CertificateSerial, Arc<TrustedCertificate>>>,
    decryptor: PayloadDecryptor,
    expiry: ExpiryPolicy,
}

impl TrustCertificateStore {
    pub fn new(decryptor: PayloadDecryptor, expiry: ExpiryPolicy) -> Self {
        Self {
            certificates: RwLock::new(HashMap::new()),
            decryptor,
            expiry,
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Resolve a serial, refreshing once from `source` on a miss.
    pub fn get(
        &self,
        serial: &CertificateSerial,
        source: &dyn CertificateSource,
    ) -> AuthResult<Arc<TrustedCertificate>> {
        self.get_at(serial, source, Utc::now())
    }

    pub fn get_at(
        &self,
        serial: &CertificateSerial,
        source: &dyn CertificateSource,
        now: DateTime<Utc>,
    ) -> AuthResult<Arc<TrustedCertificate>> {
        let cert = match self.lookup(serial)? {
            Some(cert) => cert,
            None => {
                tracing::info!(serial = %serial, "certificate not cached, refreshing");
                self.refresh(source)?;
                self.lookup(serial)?.ok_or_else(|| {
                    tracing::warn!(serial = %serial, "certificate unknown after refresh");
                    AuthError::UnknownCertificate {
                        serial: serial.to_string(),
                    }
                })?
            }
        };

        if self.expiry == ExpiryPolicy::Enforce && !cert.is_valid_at(now) {
            tracing::warn!(
                serial = %serial,
                effective_time = %cert.effective_time,
                expire_time = %cert.expire_time,
                "certificate outside validity window"
            );
            return Err(AuthError::ExpiredCertificate {
                serial: serial.to_string(),
            });
        }
        Ok(cert)
    }

    /// Cache-only lookup.
    pub fn lookup(&self, serial: &CertificateSerial) -> AuthResult<Option<Arc<TrustedCertificate>>> {
        Ok(self.read()?.get(serial).cloned())
    }

    /// Fetch a listing and install it. Returns the number of certificates now cached.
    pub fn refresh(&self, source: &dyn CertificateSource) -> AuthResult<usize> {
        let listing = source.fetch_certificates()?;
        self.install(listing)
    }

    /// Decrypt and parse every entry, then swap the cache in one step.
    ///
    /// Any failing entry aborts the install and the previous cache stays.
    pub fn install(&self, listing: CertificateListing) -> AuthResult<usize> {
        let mut fresh = HashMap::with_capacity(listing.data.len());
        for entry in listing.data {
            let cert = self.open_entry(entry).map_err(|e| {
                tracing::warn!(error = %e, "certificate refresh aborted");
                e
            })?;
            fresh.insert(cert.serial_no.clone(), Arc::new(cert));
        }

        let count = fresh.len();
        *self.write()? = fresh;
        tracing::info!(count, "platform certificates refreshed");
        Ok(count)
    }

    fn open_entry(&self, entry: CertificateEntry) -> AuthResult<TrustedCertificate> {
        let pem = self.decryptor.decrypt_resource(&entry.encrypt_certificate)?;
        let parsed = parse_certificate_pem(&pem)?;

        if !parsed
            .serial
            .as_str()
            .eq_ignore_ascii_case(entry.serial_no.as_str())
        {
            return Err(AuthError::Certificate(format!(
                "listing serial {} does not match certificate serial {}",
                entry.serial_no, parsed.serial
            )));
        }

        // Keyed by the certificate's own spelling, which matches the
        // upper-case serial header on responses.
        Ok(TrustedCertificate {
            serial_no: parsed.serial,
            effective_time: entry.effective_time,
            expire_time: entry.expire_time,
            public_key: parsed.public_key,
            certificate_der: parsed.der,
            encrypted: entry.encrypt_certificate,
        })
    }

    pub fn len(&self) -> AuthResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> AuthResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Cached serials, sorted.
    pub fn serials(&self) -> AuthResult<Vec<CertificateSerial>> {
        let mut serials: Vec<_> = self.read()?.keys().cloned().collect();
        serials.sort();
        Ok(serials)
    }

    /// Snapshot of every cached certificate, sorted by serial.
    pub fn certificates(&self) -> AuthResult<Vec<Arc<TrustedCertificate>>> {
        let mut certs: Vec<_> = self.read()?.values().cloned().collect();
        certs.sort_by(|a, b| a.serial_no.cmp(&b.serial_no));
        Ok(certs)
    }

    fn read(
        &self,
    ) -> AuthResult<RwLockReadGuard<'_, HashMap<CertificateSerial, Arc<TrustedCertificate>>>> {
        self.certificates
            .read()
            .map_err(|e| AuthError::Internal(format!("certificate cache poisoned: {}", e)))
    }

    fn write(
        &self,
    ) -> AuthResult<RwLockWriteGuard<'_, HashMap<CertificateSerial, Arc<TrustedCertificate>>>> {
        self.certificates
            .write()
            .map_err(|e| AuthError::Internal(format!("certificate cache poisoned: {}", e)))
    }
}

impl std::fmt::Debug for TrustCertificateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustCertificateStore")
            .field("cached", &self.len().ok())
            .field("expiry", &self.expiry)
            .finish()
    }
}
