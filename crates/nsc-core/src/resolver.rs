//! Signing key resolution.
//!
//! A key source is either the encoded key itself (seed or public key) or a
//! path to a file holding one. Files may contain a bare key or a creds
//! bundle with an `NKEY SEED` block.

use std::path::Path;

use crate::crypto::keys::{KeyPair, KeyRole};
use crate::error::{NscError, Result};
use crate::jwt::armor::extract_seed;

/// Resolve an optional key source into a key pair of the expected role.
///
/// Returns `Ok(None)` when no source was given, so the caller can fall back
/// to keys held in the key store.
pub fn resolve_key(source: Option<&str>, expected: KeyRole) -> Result<Option<KeyPair>> {
    let Some(source) = source.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let kp = match KeyPair::decode(source) {
        Ok(kp) => kp,
        Err(_) => read_key_file(Path::new(source))?,
    };

    if kp.role() != expected {
        return Err(NscError::KeyRoleMismatch {
            expected: expected.to_string(),
            actual: kp.role().to_string(),
        });
    }
    Ok(Some(kp))
}

/// Like [`resolve_key`] but the resolved key must carry a seed.
pub fn resolve_signer(source: Option<&str>, expected: KeyRole) -> Result<Option<KeyPair>> {
    match resolve_key(source, expected)? {
        Some(kp) if !kp.can_sign() => Err(NscError::SigningKeyRequired(kp.public_key())),
        other => Ok(other),
    }
}

/// Build a validator that accepts a key source resolving to `role`.
pub fn key_validator(role: KeyRole) -> impl Fn(&str) -> Result<()> {
    move |source| match resolve_key(Some(source), role)? {
        Some(_) => Ok(()),
        None => Err(NscError::validation("key", "a key is required")),
    }
}

fn read_key_file(path: &Path) -> Result<KeyPair> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(NscError::InvalidKey(format!(
                "{} is neither a key nor an existing file",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(seed) = extract_seed(&contents) {
        return KeyPair::from_seed(&seed);
    }
    let text = contents
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    KeyPair::decode(text)
        .map_err(|e| NscError::InvalidKey(format!("{}: {e}", path.display())))
}
