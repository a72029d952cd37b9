//! Payload encryption.
//!
//! Bundles are sealed with AES-256-GCM (authenticated): a random 12-byte
//! nonce is prefixed to the ciphertext. Key material comes from a
//! [`KeyProvider`]; key management itself (rotation, KMS) stays outside this
//! crate.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

/// 32-byte key material, zeroed on drop.
pub struct KeyMaterial {
    pub key: [u8; KEY_LEN],
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Source of the deployment-wide bundle key. Thread-safe.
pub trait KeyProvider: Send + Sync {
    fn key(&self) -> Result<KeyMaterial>;
}

/// In-memory provider holding one fixed key (tests, embedding callers).
pub struct StaticKeyProvider {
    key: [u8; KEY_LEN],
}

impl StaticKeyProvider {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn key(&self) -> Result<KeyMaterial> {
        Ok(KeyMaterial { key: self.key })
    }
}

impl Drop for StaticKeyProvider {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Reads the key from an environment variable, HEX or BASE64 encoded.
pub struct EnvKeyProvider {
    var: String,
}

impl EnvKeyProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl KeyProvider for EnvKeyProvider {
    fn key(&self) -> Result<KeyMaterial> {
        let raw = std::env::var(&self.var)
            .with_context(|| format!("env var {} not set", self.var))?;
        let bytes = decode_key(raw.trim())?;
        Ok(KeyMaterial { key: bytes })
    }
}

fn decode_key(s: &str) -> Result<[u8; KEY_LEN]> {
    let decoded = match hex::decode(s) {
        Ok(b) => b,
        Err(_) => base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|_| anyhow!("key is neither valid hex nor base64"))?,
    };
    if decoded.len() != KEY_LEN {
        bail!("key must be {} bytes, got {}", KEY_LEN, decoded.len());
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&decoded);
    Ok(key)
}

/// Symmetric, integrity-protected cipher for whole bundle payloads.
pub trait EncryptionProvider: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// AES-256-GCM provider. Output layout: `nonce (12) || ciphertext+tag`.
pub struct AesGcmProvider {
    cipher: Aes256Gcm,
}

impl AesGcmProvider {
    pub fn new(key: &KeyMaterial) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(&key.key)
            .map_err(|_| anyhow!("invalid AES-256 key length"))?;
        Ok(Self { cipher })
    }

    pub fn from_provider(provider: &dyn KeyProvider) -> Result<Self> {
        Self::new(&provider.key()?)
    }
}

impl EncryptionProvider for AesGcmProvider {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| anyhow!("AES-GCM encryption failed"))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN {
            bail!("ciphertext shorter than nonce");
        }
        let (nonce_bytes, body) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, body)
            .map_err(|_| anyhow!("AES-GCM decryption failed (wrong key or tampered payload)"))
    }
}
