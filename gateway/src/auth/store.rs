//! Token Store
//!
//! Where refresh tokens obtained through the consent flow live. Two backends:
//! an in-memory map, and an encrypted directory where each token is an
//! AES-256-GCM file and `metadata.json` (unencrypted, no secrets) maps
//! `provider:account` to file names.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::crypto::{self, KEY_SIZE};
use super::TokenRecord;

/// File extension for encrypted token files
const ENC_EXT: &str = "json.enc";
const METADATA_FILE: &str = "metadata.json";

/// Persistent home for [`TokenRecord`]s.
pub trait SecretStore: Send + Sync {
    fn save(&self, record: &TokenRecord) -> Result<(), String>;

    fn load(&self, provider: &str, account: &str) -> Result<Option<TokenRecord>, String>;
}

// ── MemoryStore ─────────────────────────────────────────────────────────────

/// Process-lifetime store used when no directory is configured.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), TokenRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemoryStore {
    fn save(&self, record: &TokenRecord) -> Result<(), String> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| "Secret store lock poisoned".to_string())?;
        records.insert(
            (record.provider.clone(), record.account.clone()),
            record.clone(),
        );
        Ok(())
    }

    fn load(&self, provider: &str, account: &str) -> Result<Option<TokenRecord>, String> {
        let records = self
            .records
            .lock()
            .map_err(|_| "Secret store lock poisoned".to_string())?;
        Ok(records
            .get(&(provider.to_string(), account.to_string()))
            .cloned())
    }
}

// ── Metadata ────────────────────────────────────────────────────────────────

/// Metadata index (unencrypted, contains no secrets)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Metadata {
    version: u32,
    accounts: Vec<MetadataEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetadataEntry {
    provider: String,
    account: String,
    scopes: Vec<String>,
    added: String,
    updated: String,
    file: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            version: 1,
            accounts: Vec::new(),
        }
    }
}

// ── EncryptedFileStore ──────────────────────────────────────────────────────

pub struct EncryptedFileStore {
    base_dir: PathBuf,
    key: Zeroizing<[u8; KEY_SIZE]>,
    metadata: Mutex<Metadata>,
}

impl EncryptedFileStore {
    /// Open (or initialise) a store rooted at `base_dir`.
    pub fn open(base_dir: &Path, passphrase: &str) -> Result<Self, String> {
        fs::create_dir_all(base_dir)
            .map_err(|e| format!("Failed to create secret store dir: {}", e))?;

        let key = crypto::derive_key(passphrase)?;

        let metadata_path = base_dir.join(METADATA_FILE);
        let metadata = if metadata_path.exists() {
            let data = fs::read_to_string(&metadata_path)
                .map_err(|e| format!("Failed to read metadata: {}", e))?;
            serde_json::from_str(&data).map_err(|e| format!("Failed to parse metadata: {}", e))?
        } else {
            Metadata::default()
        };

        info!(
            "Secret store opened at {:?} ({} accounts)",
            base_dir,
            metadata.accounts.len()
        );

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            key,
            metadata: Mutex::new(metadata),
        })
    }

    fn flush_metadata(&self, metadata: &Metadata) -> Result<(), String> {
        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| format!("Failed to serialize metadata: {}", e))?;
        fs::write(self.base_dir.join(METADATA_FILE), json)
            .map_err(|e| format!("Failed to write metadata: {}", e))
    }
}

impl SecretStore for EncryptedFileStore {
    fn save(&self, record: &TokenRecord) -> Result<(), String> {
        let file_name = token_file_name(&record.provider, &record.account);

        let json = Zeroizing::new(
            serde_json::to_vec(record).map_err(|e| format!("Failed to serialize token: {}", e))?,
        );
        let encrypted = crypto::encrypt(&self.key, &json)?;
        fs::write(self.base_dir.join(&file_name), &encrypted)
            .map_err(|e| format!("Failed to write token file: {}", e))?;

        let mut metadata = self
            .metadata
            .lock()
            .map_err(|_| "Secret store lock poisoned".to_string())?;

        let now = chrono::Utc::now().to_rfc3339();
        match metadata
            .accounts
            .iter_mut()
            .find(|e| e.provider == record.provider && e.account == record.account)
        {
            Some(entry) => {
                entry.scopes = record.scopes.clone();
                entry.updated = now;
            }
            None => metadata.accounts.push(MetadataEntry {
                provider: record.provider.clone(),
                account: record.account.clone(),
                scopes: record.scopes.clone(),
                added: now.clone(),
                updated: now,
                file: file_name,
            }),
        }

        self.flush_metadata(&metadata)
    }

    fn load(&self, provider: &str, account: &str) -> Result<Option<TokenRecord>, String> {
        let file_name = {
            let metadata = self
                .metadata
                .lock()
                .map_err(|_| "Secret store lock poisoned".to_string())?;
            match metadata
                .accounts
                .iter()
                .find(|e| e.provider == provider && e.account == account)
            {
                Some(entry) => entry.file.clone(),
                None => return Ok(None),
            }
        };

        let path = self.base_dir.join(&file_name);
        if !path.exists() {
            warn!("Metadata references {:?} but file does not exist", path);
            return Ok(None);
        }

        let encrypted = fs::read(&path).map_err(|e| format!("Failed to read token file: {}", e))?;
        let decrypted = Zeroizing::new(crypto::decrypt(&self.key, &encrypted)?);
        let record = serde_json::from_slice(&decrypted)
            .map_err(|e| format!("Failed to parse token JSON: {}", e))?;
        Ok(Some(record))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// SHA-256 of `provider:account`, first 8 bytes, so file names don't identify
/// the account.
fn token_file_name(provider: &str, account: &str) -> String {
    let hash = Sha256::digest(format!("{}:{}", provider, account).as_bytes());
    format!("{}.{}", hex::encode(&hash[..8]), ENC_EXT)
}
