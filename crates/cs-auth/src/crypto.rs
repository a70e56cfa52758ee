use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload, rand_core::RngCore},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::errors::StorageError;

const AAD_VERSION: &str = "v1";

/// AES-256 key (32 bytes)
#[derive(Clone, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; 32],
}

impl EncryptionKey {
    /// Generate a new random encryption key
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { key: bytes }
    }

    /// Decode a key previously written with [`EncryptionKey::to_base64`]
    pub fn from_base64(encoded: &str) -> Result<Self, StorageError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|_| StorageError::CorruptedStore)?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StorageError::CorruptedStore)?;
        Ok(Self { key })
    }

    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.key)
    }

    /// Get key bytes (use carefully - sensitive data)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Encrypted data with nonce and authentication tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Base64url-encoded nonce (12 bytes)
    pub nonce: String,
    /// Base64url-encoded ciphertext + tag
    pub ciphertext: String,
    pub aad_version: String,
}

fn aad(version: &str, record_key: &str) -> String {
    format!("cs-auth|{}|{}", version, record_key)
}

/// Encrypt plaintext using AES-256-GCM, binding it to `record_key`
pub fn encrypt(
    key: &EncryptionKey,
    plaintext: &[u8],
    record_key: &str,
) -> Result<EncryptedBlob, StorageError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let aad = aad(AAD_VERSION, record_key);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: aad.as_bytes(),
            },
        )
        .map_err(|e| StorageError::Crypto(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedBlob {
        nonce: URL_SAFE_NO_PAD.encode(nonce),
        ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        aad_version: AAD_VERSION.to_string(),
    })
}

/// Decrypt a blob. Any mismatch (wrong key, tampering, other record) is
/// reported as [`StorageError::CorruptedStore`].
pub fn decrypt(
    key: &EncryptionKey,
    blob: &EncryptedBlob,
    record_key: &str,
) -> Result<Vec<u8>, StorageError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let nonce_bytes = URL_SAFE_NO_PAD
        .decode(&blob.nonce)
        .map_err(|_| StorageError::CorruptedStore)?;
    if nonce_bytes.len() != 12 {
        return Err(StorageError::CorruptedStore);
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = URL_SAFE_NO_PAD
        .decode(&blob.ciphertext)
        .map_err(|_| StorageError::CorruptedStore)?;

    let aad = aad(&blob.aad_version, record_key);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &ciphertext,
                aad: aad.as_bytes(),
            },
        )
        .map_err(|_| StorageError::CorruptedStore)
}
