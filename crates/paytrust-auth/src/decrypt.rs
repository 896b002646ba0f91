use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AuthError, AuthResult};
use crate::key_material::KeyMaterial;

// AEAD_AES_256_GCM resource decryption.
//
// The key is the merchant's 32-byte API v3 key used as-is. Nonce and
// associated data are taken verbatim from the envelope, and the ciphertext
// carries the 16-byte GCM tag at its end.

/// The only accepted algorithm identifier.
pub const AEAD_AES_256_GCM: &str = "AEAD_AES_256_GCM";

/// Required length of the API v3 key in bytes.
pub const API_V3_KEY_LEN: usize = 32;

const NONCE_SIZE: usize = 12;

/// An encrypted blob as it appears in notifications and certificate listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedResource {
    pub algorithm: String,
    pub ciphertext: String,
    #[serde(default)]
    pub associated_data: String,
    pub nonce: String,
}

/// Opens AEAD-sealed payloads with the API v3 key.
///
/// Shared by certificate refresh and webhook parsing.
#[derive(Debug, Clone)]
pub struct PayloadDecryptor {
    keys: Arc<KeyMaterial>,
}

impl PayloadDecryptor {
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }

    pub fn decrypt(
        &self,
        algorithm: &str,
        ciphertext_b64: &str,
        nonce: &str,
        associated_data: &str,
    ) -> AuthResult<Vec<u8>> {
        if algorithm != AEAD_AES_256_GCM {
            tracing::warn!(algorithm = %algorithm, "rejected unsupported algorithm");
            return Err(AuthError::UnsupportedAlgorithm {
                algorithm: algorithm.to_string(),
            });
        }

        let key = self.keys.api_v3_key()?;
        if key.len() != API_V3_KEY_LEN {
            return Err(AuthError::Configuration(format!(
                "api v3 key must be {} bytes, got {}",
                API_V3_KEY_LEN,
                key.len()
            )));
        }

        let ciphertext = BASE64
            .decode(ciphertext_b64.trim())
            .map_err(|e| AuthError::Encoding(format!("ciphertext is not base64: {}", e)))?;

        if nonce.len() != NONCE_SIZE {
            return Err(AuthError::Decryption(format!(
                "nonce must be {} bytes, got {}",
                NONCE_SIZE,
                nonce.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| AuthError::Decryption(format!("cipher init failed: {}", e)))?;

        cipher
            .decrypt(
                AesNonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: &ciphertext,
                    aad: associated_data.as_bytes(),
                },
            )
            .map_err(|_| {
                tracing::warn!(
                    algorithm = %algorithm,
                    associated_data = %associated_data,
                    ciphertext_len = ciphertext.len(),
                    "authentication tag mismatch"
                );
                AuthError::Integrity {
                    algorithm: algorithm.to_string(),
                }
            })
    }

    pub fn decrypt_resource(&self, resource: &EncryptedResource) -> AuthResult<Vec<u8>> {
        self.decrypt(
            &resource.algorithm,
            &resource.ciphertext,
            &resource.nonce,
            &resource.associated_data,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API_V3_KEY: &str = include_str!("../../../fixtures/api_v3_key.txt");
    const PLATFORM_CERT: &str = include_str!("../../../fixtures/platform_cert.pem");
    const CERT_LISTING: &str = include_str!("../../../fixtures/certificates_response.json");

    fn decryptor_with(key: &str) -> PayloadDecryptor {
        PayloadDecryptor::new(Arc::new(KeyMaterial::new().with_api_v3_key(key)))
    }

    fn decryptor() -> PayloadDecryptor {
        decryptor_with(API_V3_KEY.trim())
    }

    fn seal(key: &[u8], nonce: &str, aad: &str, plaintext: &[u8]) -> String {
        let cipher = Aes256Gcm::new_from_slice(key).unwrap();
        let sealed = cipher
            .encrypt(
                AesNonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: plaintext,
                    aad: aad.as_bytes(),
                },
            )
            .unwrap();
        BASE64.encode(sealed)
    }

    fn listing_resource() -> EncryptedResource {
        let listing: serde_json::Value = serde_json::from_str(CERT_LISTING).unwrap();
        serde_json::from_value(listing["data"][0]["encrypt_certificate"].clone()).unwrap()
    }

    #[test]
    fn test_certificate_vector_decrypts_to_pem() {
        let plaintext = decryptor().decrypt_resource(&listing_resource()).unwrap();
        assert_eq!(String::from_utf8(plaintext).unwrap(), PLATFORM_CERT);
    }

    #[test]
    fn test_wrong_key_is_integrity_error() {
        let wrong = decryptor_with("00000000000000000000000000000000");
        let err = wrong.decrypt_resource(&listing_resource()).unwrap_err();
        assert_eq!(
            err,
            AuthError::Integrity {
                algorithm: AEAD_AES_256_GCM.into()
            }
        );
    }

    #[test]
    fn test_wrong_associated_data_is_integrity_error() {
        let mut resource = listing_resource();
        resource.associated_data = "transaction".into();
        let err = decryptor().decrypt_resource(&resource).unwrap_err();
        assert!(matches!(err, AuthError::Integrity { .. }));
    }

    #[test]
    fn test_flipped_ciphertext_byte_is_integrity_error() {
        let key = API_V3_KEY.trim().as_bytes();
        let sealed = seal(key, "0123456789ab", "refund", b"{\"refund_id\":\"1\"}");
        let mut raw = BASE64.decode(&sealed).unwrap();
        for i in 0..raw.len() {
            raw[i] ^= 0x01;
            let tampered = BASE64.encode(&raw);
            let err = decryptor()
                .decrypt(AEAD_AES_256_GCM, &tampered, "0123456789ab", "refund")
                .unwrap_err();
            assert!(matches!(err, AuthError::Integrity { .. }), "byte {i}");
            raw[i] ^= 0x01;
        }
        let ok = decryptor()
            .decrypt(AEAD_AES_256_GCM, &sealed, "0123456789ab", "refund")
            .unwrap();
        assert_eq!(ok, b"{\"refund_id\":\"1\"}");
    }

    #[test]
    fn test_unsupported_algorithm_checked_before_key() {
        // No key configured: the algorithm check still wins.
        let bare = PayloadDecryptor::new(Arc::new(KeyMaterial::new()));
        let err = bare
            .decrypt("AEAD_CHACHA20_POLY1305", "AAAA", "0123456789ab", "")
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::UnsupportedAlgorithm {
                algorithm: "AEAD_CHACHA20_POLY1305".into()
            }
        );
    }

    #[test]
    fn test_missing_or_short_key_is_configuration_error() {
        let bare = PayloadDecryptor::new(Arc::new(KeyMaterial::new()));
        let err = bare.decrypt_resource(&listing_resource()).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));

        let short = decryptor_with("too-short");
        let err = short.decrypt_resource(&listing_resource()).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
        assert!(!err.to_string().contains("too-short"));
    }

    #[test]
    fn test_bad_base64_is_encoding_error() {
        let err = decryptor()
            .decrypt(AEAD_AES_256_GCM, "%%%not-base64%%%", "0123456789ab", "")
            .unwrap_err();
        assert!(matches!(err, AuthError::Encoding(_)));
    }

    #[test]
    fn test_nonce_used_verbatim() {
        let key = API_V3_KEY.trim().as_bytes();
        let sealed = seal(key, "abcdefghijkl", "", b"hello");

        let err = decryptor()
            .decrypt(AEAD_AES_256_GCM, &sealed, "abcdefghijk", "")
            .unwrap_err();
        assert!(matches!(err, AuthError::Decryption(_)));

        let err = decryptor()
            .decrypt(AEAD_AES_256_GCM, &sealed, "abcdefghijkm", "")
            .unwrap_err();
        assert!(matches!(err, AuthError::Integrity { .. }));
    }

    #[test]
    fn test_missing_associated_data_defaults_to_empty() {
        let resource: EncryptedResource = serde_json::from_str(
            r#"{"algorithm":"AEAD_AES_256_GCM","ciphertext":"AAAA","nonce":"0123456789ab"}"#,
        )
        .unwrap();
        assert_eq!(resource.associated_data, "");
    }
}
