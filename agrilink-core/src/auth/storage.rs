//! Persisted identity: obfuscated file (primary) + OS keyring (secondary)
//!
//! The file is the source of truth. The keyring copy only exists so a session
//! survives the data directory being wiped, and is migrated back to the file
//! when found.

use super::types::{AuthError, Identity};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use keyring::Entry;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};

const SERVICE_NAME: &str = "AgriLink";
const SESSION_KEY: &str = "auth_session";
const AUTH_SESSION_FILE: &str = "auth_session.dat";

// Keeps tokens out of casual view, not a security boundary
const OBFUSCATION_KEY: &[u8] = b"AgriLinkMarketplaceSession";

/// Storage for the signed-in identity
pub struct SessionStorage {
    keyring_entry: Option<Entry>,
    data_dir: PathBuf,
}

impl SessionStorage {
    /// Storage in the per-user local data directory, with keyring backup
    pub fn new() -> Result<Self, AuthError> {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join(SERVICE_NAME))
            .ok_or_else(|| {
                AuthError::StorageError("Could not determine data directory".to_string())
            })?;

        let keyring_entry = match Entry::new(SERVICE_NAME, SESSION_KEY) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Keyring not available ({}). Using file storage only.", e);
                None
            }
        };

        Self::with_parts(data_dir, keyring_entry)
    }

    /// File-only storage rooted at `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, AuthError> {
        Self::with_parts(dir.as_ref().to_path_buf(), None)
    }

    fn with_parts(data_dir: PathBuf, keyring_entry: Option<Entry>) -> Result<Self, AuthError> {
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            AuthError::StorageError(format!("Failed to create data directory: {}", e))
        })?;

        info!(
            "Session storage at {} (keyring: {})",
            data_dir.join(AUTH_SESSION_FILE).display(),
            if keyring_entry.is_some() { "yes" } else { "no" }
        );

        Ok(Self {
            keyring_entry,
            data_dir,
        })
    }

    fn session_file_path(&self) -> PathBuf {
        self.data_dir.join(AUTH_SESSION_FILE)
    }

    fn obfuscate(data: &[u8]) -> Vec<u8> {
        data.iter()
            .enumerate()
            .map(|(i, &byte)| byte ^ OBFUSCATION_KEY[i % OBFUSCATION_KEY.len()])
            .collect()
    }

    fn store_to_file(&self, identity: &Identity) -> Result<(), AuthError> {
        let path = self.session_file_path();

        let json = serde_json::to_string(identity)
            .map_err(|e| AuthError::StorageError(format!("Failed to serialize session: {}", e)))?;
        let encoded = BASE64.encode(Self::obfuscate(json.as_bytes()));

        std::fs::write(&path, &encoded).map_err(|e| {
            error!("Failed to write session file: {}", e);
            AuthError::StorageError(format!("Failed to write session file: {}", e))
        })?;

        debug!("Session stored in file ({} bytes)", encoded.len());
        Ok(())
    }

    fn load_from_file(&self) -> Option<Identity> {
        let path = self.session_file_path();
        if !path.exists() {
            debug!("Session file does not exist");
            return None;
        }

        let encoded = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to read session file: {}", e);
                return None;
            }
        };

        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                String::from_utf8(Self::obfuscate(&bytes)).map_err(|e| e.to_string())
            })
            .and_then(|json| {
                serde_json::from_str::<Identity>(&json).map_err(|e| e.to_string())
            });

        match decoded {
            Ok(identity) => {
                info!("Loaded session from file for user: {}", identity.email);
                Some(identity)
            }
            Err(e) => {
                error!("Session file is corrupted ({}), removing it", e);
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    fn clear_file(&self) -> Result<(), AuthError> {
        let path = self.session_file_path();
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                AuthError::StorageError(format!("Failed to delete session file: {}", e))
            })?;
            debug!("Cleared session file");
        }
        Ok(())
    }

    fn store_to_keyring(&self, identity: &Identity) {
        let Some(entry) = &self.keyring_entry else {
            return;
        };

        match serde_json::to_string(identity) {
            Ok(json) => {
                if let Err(e) = entry.set_password(&json) {
                    warn!("Failed to store session in keyring: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize session for keyring: {}", e),
        }
    }

    fn load_from_keyring(&self) -> Option<Identity> {
        let entry = self.keyring_entry.as_ref()?;

        match entry.get_password() {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!("Failed to deserialize keyring session: {}", e);
                    None
                }
            },
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!("Keyring read error: {:?}", e);
                None
            }
        }
    }

    fn clear_keyring(&self) {
        if let Some(entry) = &self.keyring_entry {
            match entry.delete_password() {
                Ok(_) => debug!("Cleared session from keyring"),
                Err(keyring::Error::NoEntry) => {}
                Err(e) => warn!("Failed to clear keyring session: {}", e),
            }
        }
    }

    /// Persist the identity (file, then keyring)
    pub fn store(&self, identity: &Identity) -> Result<(), AuthError> {
        info!("Storing session for {}", identity.email);
        self.store_to_file(identity)?;
        self.store_to_keyring(identity);
        Ok(())
    }

    /// Load the persisted identity, falling back to the keyring copy
    pub fn load(&self) -> Option<Identity> {
        if let Some(identity) = self.load_from_file() {
            return Some(identity);
        }

        let identity = self.load_from_keyring()?;
        info!("Session recovered from keyring, migrating to file storage");
        let _ = self.store_to_file(&identity);
        Some(identity)
    }

    /// Remove the identity from every location. Errors are logged, not returned.
    pub fn clear(&self) {
        if let Err(e) = self.clear_file() {
            error!("File clear error: {}", e);
        }
        self.clear_keyring();
        info!("Stored session cleared");
    }

    pub fn has_session(&self) -> bool {
        self.session_file_path().exists()
    }
}
