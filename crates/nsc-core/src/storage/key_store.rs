//! Key persistence.
//!
//! Keys are addressed by role and public key, never by entity name:
//!
//! ```text
//! {base_dir}/keys/
//! └── {role letter}/
//!     └── {2 chars after role letter}/
//!         └── {public key}.nk    # seed, or the public key alone
//! ```

use std::path::PathBuf;

use crate::crypto::keys::KeyPair;
use crate::error::{NscError, Result};

use super::fs::{read_optional, write_atomic};

const KEYS_DIR: &str = "keys";
const KEY_EXTENSION: &str = "nk";

/// One entry returned by [`KeyStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKey {
    pub public_key: String,
    pub has_seed: bool,
}

/// Filesystem-backed key store.
#[derive(Debug, Clone)]
pub struct KeyStore {
    base_dir: PathBuf,
}

impl KeyStore {
    /// Create a key store rooted at `base_dir`. Nothing is created on disk
    /// until the first key is stored.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Persist a key pair. Storing a key that already exists is a no-op,
    /// except that a seed replaces a previously stored public key.
    ///
    /// Returns the path of the key file.
    pub fn store(&self, kp: &KeyPair) -> Result<PathBuf> {
        let public_key = kp.public_key();
        let path = self.key_path(&public_key);

        if let Some(existing) = self.lookup(&public_key)? {
            if existing.can_sign() || !kp.can_sign() {
                return Ok(path);
            }
        }

        let contents = if kp.can_sign() { kp.seed()? } else { public_key };
        write_atomic(&path, contents.as_bytes())?;
        log::debug!("stored {} key {}", kp.role(), kp.public_key());
        Ok(path)
    }

    /// Load the key pair stored for `public_key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `NscError::InvalidFileFormat` when the file exists but does not
    /// hold a key matching `public_key`.
    pub fn lookup(&self, public_key: &str) -> Result<Option<KeyPair>> {
        KeyPair::from_public_key(public_key)?;
        let path = self.key_path(public_key);
        let Some(bytes) = read_optional(&path)? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes).map_err(|_| {
            NscError::InvalidFileFormat(format!("{} is not valid UTF-8", path.display()))
        })?;
        let kp = KeyPair::decode(&text).map_err(|e| {
            NscError::InvalidFileFormat(format!("{}: {e}", path.display()))
        })?;
        if kp.public_key() != public_key {
            return Err(NscError::InvalidFileFormat(format!(
                "{} holds a different key",
                path.display()
            )));
        }
        Ok(Some(kp))
    }

    /// Load a key pair that can sign, failing when only the public key or
    /// nothing at all is stored.
    pub fn signing_key(&self, public_key: &str) -> Result<KeyPair> {
        match self.lookup(public_key)? {
            Some(kp) if kp.can_sign() => Ok(kp),
            _ => Err(NscError::SigningKeyUnavailable(public_key.to_string())),
        }
    }

    /// List every stored key. The order is not specified.
    pub fn list(&self) -> Result<Vec<StoredKey>> {
        let root = self.base_dir.join(KEYS_DIR);
        let suffix = format!(".{KEY_EXTENSION}");
        let mut keys = Vec::new();
        if !root.is_dir() {
            return Ok(keys);
        }
        for role_dir in std::fs::read_dir(&root)? {
            let role_dir = role_dir?.path();
            if !role_dir.is_dir() {
                continue;
            }
            for shard in std::fs::read_dir(&role_dir)? {
                let shard = shard?.path();
                if !shard.is_dir() {
                    continue;
                }
                for entry in std::fs::read_dir(&shard)? {
                    let name = entry?.file_name();
                    let name = name.to_string_lossy();
                    if let Some(public_key) = name.strip_suffix(suffix.as_str()) {
                        if let Some(kp) = self.lookup(public_key)? {
                            keys.push(StoredKey {
                                public_key: public_key.to_string(),
                                has_seed: kp.can_sign(),
                            });
                        }
                    }
                }
            }
        }
        Ok(keys)
    }

    fn key_path(&self, public_key: &str) -> PathBuf {
        let role: String = public_key.chars().take(1).collect();
        let shard: String = public_key.chars().skip(1).take(2).collect();
        self.base_dir
            .join(KEYS_DIR)
            .join(role)
            .join(shard)
            .join(format!("{public_key}.{KEY_EXTENSION}"))
    }
}
