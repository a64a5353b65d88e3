//! Cryptographic utilities for the secret store
//!
//! - AES-256-GCM for token encryption at rest
//! - HKDF-SHA256 key derivation from the configured passphrase

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

/// AES-256-GCM nonce size (96 bits)
const NONCE_SIZE: usize = 12;
/// AES-256 key size (256 bits)
pub const KEY_SIZE: usize = 32;

const HKDF_SALT: &[u8] = b"sheetgate-secret-store-v1";
const HKDF_INFO: &[u8] = b"token-encryption";

// ── Encryption / Decryption ─────────────────────────────────────────────────

/// Encrypt plaintext bytes with AES-256-GCM.
/// Returns: nonce (12 bytes) || ciphertext+tag
pub fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, String> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| format!("Encryption failed: {}", e))?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data produced by `encrypt()`.
pub fn decrypt(key: &[u8; KEY_SIZE], data: &[u8]) -> Result<Vec<u8>, String> {
    if data.len() < NONCE_SIZE {
        return Err("Ciphertext too short".to_string());
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| format!("Decryption failed: {}", e))
}

// ── Key derivation ──────────────────────────────────────────────────────────

/// Derive the store key from a passphrase via HKDF-SHA256.
pub fn derive_key(passphrase: &str) -> Result<Zeroizing<[u8; KEY_SIZE]>, String> {
    if passphrase.is_empty() {
        return Err("Secret store passphrase is empty".to_string());
    }

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), passphrase.as_bytes());
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO, key.as_mut_slice())
        .map_err(|e| format!("Key derivation failed: {}", e))?;
    Ok(key)
}
