use std::collections::HashMap;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use thiserror::Error;

/// Key id under which customer name, surname and phone are sealed.
pub const CUSTOMER_DATA_KEY: &str = "customer-data-key";

const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("unknown key id: {0}")]
    UnknownKey(String),
    #[error("key must be 32 bytes, got {0}")]
    BadKeyLength(usize),
    #[error("invalid base64: {0}")]
    Encoding(String),
    #[error("ciphertext shorter than nonce")]
    Truncated,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error("decrypted value is not UTF-8")]
    NotUtf8,
}

/// Symmetric encryption keyed by a key id. Implementations may call out to a
/// key management service, hence async.
#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
    async fn decrypt(&self, key_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// In-process AES-256-GCM keys. Output is `nonce || ciphertext`.
#[derive(Default)]
pub struct LocalKeyring {
    keys: HashMap<String, Aes256Gcm>,
}

impl LocalKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key_id: &str, key: &[u8]) -> Result<Self, CryptoError> {
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::BadKeyLength(key.len()))?;
        self.keys.insert(key_id.to_string(), cipher);
        Ok(self)
    }

    pub fn with_base64_key(self, key_id: &str, key_b64: &str) -> Result<Self, CryptoError> {
        let key = general_purpose::STANDARD
            .decode(key_b64.trim())
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        self.with_key(key_id, &key)
    }

    /// Random key that lives only as long as the process.
    pub fn with_ephemeral_key(mut self, key_id: &str) -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        self.keys.insert(key_id.to_string(), Aes256Gcm::new(&key));
        self
    }

    fn cipher(&self, key_id: &str) -> Result<&Aes256Gcm, CryptoError> {
        self.keys
            .get(key_id)
            .ok_or_else(|| CryptoError::UnknownKey(key_id.to_string()))
    }
}

#[async_trait]
impl Encryptor for LocalKeyring {
    async fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = self.cipher(key_id)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::Encrypt)?;
        let mut out = nonce.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    async fn decrypt(&self, key_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = self.cipher(key_id)?;
        if ciphertext.len() < NONCE_LEN {
            return Err(CryptoError::Truncated);
        }
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| CryptoError::Decrypt)
    }
}

/// Encrypt a text field for storage: base64 of the sealed bytes.
pub async fn seal_text(encryptor: &dyn Encryptor, plaintext: &str) -> Result<String, CryptoError> {
    let sealed = encryptor
        .encrypt(CUSTOMER_DATA_KEY, plaintext.as_bytes())
        .await?;
    Ok(general_purpose::STANDARD.encode(sealed))
}

pub async fn open_text(encryptor: &dyn Encryptor, stored: &str) -> Result<String, CryptoError> {
    let sealed = general_purpose::STANDARD
        .decode(stored)
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    let plain = encryptor.decrypt(CUSTOMER_DATA_KEY, &sealed).await?;
    String::from_utf8(plain).map_err(|_| CryptoError::NotUtf8)
}
