//! Configuration for nsc
//!
//! Values come from an optional JSON file (default `~/.nsc/nsc.json`) and are
//! then overridden by the environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NscError, Result};
use crate::storage::fs::{is_valid_dir, read_optional, write_atomic};
use crate::storage::{KeyStore, TrustStore};

/// Overrides the stores directory.
pub const NSC_HOME_ENV: &str = "NSC_HOME";
/// Overrides the key store directory.
pub const NKEYS_PATH_ENV: &str = "NKEYS_PATH";
/// Overrides the operator used when a command names none.
pub const NSC_OPERATOR_ENV: &str = "NSC_OPERATOR";

/// `~/.nsc/nsc.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".nsc").join("nsc.json"))
}

fn default_store_root() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".nsc").join("nats"))
}

fn default_keys_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".nkeys"))
}

/// Return the value of `env_var` when it is set and non-empty, otherwise
/// `default`.
pub fn resolve_path(default: PathBuf, env_var: &str) -> PathBuf {
    pick(Some(default), std::env::var(env_var).ok()).unwrap_or_default()
}

fn pick(default: Option<PathBuf>, env_value: Option<String>) -> Option<PathBuf> {
    match env_value.filter(|v| !v.trim().is_empty()) {
        Some(v) => Some(PathBuf::from(v)),
        None => default,
    }
}

/// Configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one sub-directory per operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_root: Option<PathBuf>,

    /// Key store directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys_dir: Option<PathBuf>,

    /// Operator used when neither a flag nor the selection names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

impl Config {
    /// Load `path` (or the default file) and apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |var| std::env::var(var).ok())
    }

    /// Like [`Config::load`] with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns `NscError::NotFound` when an explicitly named file is missing,
    /// and `NscError::InvalidFileFormat` when the file is not valid JSON.
    pub fn load_with(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let bytes = read_optional(p)?.ok_or_else(|| {
                    NscError::NotFound(format!("config file {} does not exist", p.display()))
                })?;
                parse(p, &bytes)?
            }
            None => match default_config_path() {
                Some(p) => match read_optional(&p)? {
                    Some(bytes) => parse(&p, &bytes)?,
                    None => Self::default(),
                },
                None => Self::default(),
            },
        };

        config.store_root = pick(config.store_root.or_else(default_store_root), env(NSC_HOME_ENV));
        config.keys_dir = pick(config.keys_dir.or_else(default_keys_dir), env(NKEYS_PATH_ENV));
        if let Some(op) = env(NSC_OPERATOR_ENV).filter(|v| !v.trim().is_empty()) {
            config.operator = Some(op);
        }
        log::debug!("config: {config:?}");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| NscError::Serialization(e.to_string()))?;
        write_atomic(path, &json)
    }

    pub fn key_store(&self) -> Result<KeyStore> {
        self.keys_dir
            .as_ref()
            .map(KeyStore::new)
            .ok_or_else(|| NscError::validation("keys_dir", "no key store directory configured"))
    }

    /// Open the configured stores directory.
    ///
    /// # Errors
    ///
    /// Returns `NscError::NotFound("no stores available")` when the directory
    /// is not configured or does not exist, and a validation error when it
    /// is not a directory.
    pub fn open_store(&self) -> Result<TrustStore> {
        let root = self
            .store_root
            .as_ref()
            .ok_or_else(no_stores)?;
        match is_valid_dir(root) {
            Err(NscError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(no_stores());
            }
            Err(NscError::Validation(_)) => {
                return Err(NscError::validation(
                    "store_root",
                    format!("{} is not a directory", root.display()),
                ));
            }
            other => other?,
        }
        TrustStore::open(root, self.key_store()?)
    }

    /// Open the stores directory, creating it when missing.
    pub fn create_store(&self) -> Result<TrustStore> {
        let root = self.store_root.as_ref().ok_or_else(no_stores)?;
        TrustStore::create(root, self.key_store()?)
    }
}

fn no_stores() -> NscError {
    NscError::NotFound("no stores available".into())
}

fn parse(path: &Path, bytes: &[u8]) -> Result<Config> {
    serde_json::from_slice(bytes)
        .map_err(|e| NscError::InvalidFileFormat(format!("{}: {e}", path.display())))
}
