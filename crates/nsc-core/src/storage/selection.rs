//! Persisted "current" operator and account.
//!
//! Stored as `{root}/.selection.json`:
//!
//! ```json
//! { "operator": "O", "account": "A" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NscError, Result};

use super::fs::{read_optional, write_atomic};

const SELECTION_FILE: &str = ".selection.json";

/// The implicit context used when a command omits an explicit target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Only meaningful together with `operator`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl Selection {
    pub fn path(root: &Path) -> PathBuf {
        root.join(SELECTION_FILE)
    }

    /// Load the selection, treating a missing file as an empty selection.
    ///
    /// # Errors
    ///
    /// Returns `NscError::InvalidFileFormat` if the file exists but is not a
    /// valid selection document.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        match read_optional(&path)? {
            None => Ok(Self::default()),
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                NscError::InvalidFileFormat(format!("{}: {e}", path.display()))
            }),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| NscError::Serialization(e.to_string()))?;
        write_atomic(&Self::path(root), &json)
    }
}
