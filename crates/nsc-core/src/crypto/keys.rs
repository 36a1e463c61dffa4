//! Role-prefixed Ed25519 key pairs.
//!
//! A public key is encoded as base32 of `role byte ++ key ++ crc16`, so it
//! starts with the role letter. A seed is encoded as base32 of
//! `seed byte | role ++ seed ++ crc16` and starts with `S` followed by the
//! role letter.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

use crate::crypto::encoding::{base32_decode, base32_encode, crc16};
use crate::error::{NscError, Result};

const PREFIX_BYTE_SEED: u8 = 18 << 3;

/// The entity kind a key is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    Operator,
    Account,
    User,
    Cluster,
    Server,
}

impl KeyRole {
    fn prefix_byte(self) -> u8 {
        match self {
            KeyRole::Operator => 14 << 3,
            KeyRole::Account => 0,
            KeyRole::User => 20 << 3,
            KeyRole::Cluster => 2 << 3,
            KeyRole::Server => 13 << 3,
        }
    }

    fn from_prefix_byte(b: u8) -> Option<Self> {
        [
            KeyRole::Operator,
            KeyRole::Account,
            KeyRole::User,
            KeyRole::Cluster,
            KeyRole::Server,
        ]
        .into_iter()
        .find(|r| r.prefix_byte() == b)
    }

    /// Leading letter of public keys of this role.
    pub fn letter(self) -> char {
        match self {
            KeyRole::Operator => 'O',
            KeyRole::Account => 'A',
            KeyRole::User => 'U',
            KeyRole::Cluster => 'C',
            KeyRole::Server => 'N',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyRole::Operator => "operator",
            KeyRole::Account => "account",
            KeyRole::User => "user",
            KeyRole::Cluster => "cluster",
            KeyRole::Server => "server",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An Ed25519 key pair tagged with its role.
///
/// A pair decoded from a public key has no seed and cannot sign.
#[derive(Clone)]
pub struct KeyPair {
    role: KeyRole,
    verifying_key: VerifyingKey,
    signing_key: Option<SigningKey>,
}

impl KeyPair {
    /// Generate a fresh random key pair.
    pub fn generate(role: KeyRole) -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self {
            role,
            verifying_key: signing_key.verifying_key(),
            signing_key: Some(signing_key),
        }
    }

    /// Decode an encoded seed (`S` + role letter + ...).
    pub fn from_seed(seed: &str) -> Result<Self> {
        let mut raw = decode_checked(seed)?;
        if raw.len() != 36 {
            raw.zeroize();
            return Err(NscError::InvalidKey("seed has invalid length".into()));
        }
        let b1 = raw[0] & 0xf8;
        let role_byte = ((raw[0] & 0x07) << 5) | ((raw[1] & 0xf8) >> 3);
        let role = match KeyRole::from_prefix_byte(role_byte) {
            Some(role) if b1 == PREFIX_BYTE_SEED => role,
            _ => {
                raw.zeroize();
                return Err(NscError::InvalidKey("not a seed".into()));
            }
        };

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw[2..34]);
        raw.zeroize();
        let signing_key = SigningKey::from_bytes(&bytes);
        bytes.zeroize();

        Ok(Self {
            role,
            verifying_key: signing_key.verifying_key(),
            signing_key: Some(signing_key),
        })
    }

    /// Decode an encoded public key (role letter + ...).
    pub fn from_public_key(public_key: &str) -> Result<Self> {
        let raw = decode_checked(public_key)?;
        if raw.len() != 35 {
            return Err(NscError::InvalidKey("public key has invalid length".into()));
        }
        let role = KeyRole::from_prefix_byte(raw[0])
            .ok_or_else(|| NscError::InvalidKey("unknown public key role".into()))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw[1..33]);
        let verifying_key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| NscError::InvalidKey(format!("invalid verifying key: {e}")))?;
        Ok(Self {
            role,
            verifying_key,
            signing_key: None,
        })
    }

    /// Decode either a seed or a public key.
    pub fn decode(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('S') {
            Self::from_seed(text)
        } else {
            Self::from_public_key(text)
        }
    }

    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// True when the pair carries a seed.
    pub fn can_sign(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Encoded public key.
    pub fn public_key(&self) -> String {
        let mut raw = Vec::with_capacity(35);
        raw.push(self.role.prefix_byte());
        raw.extend_from_slice(self.verifying_key.as_bytes());
        append_crc(&mut raw);
        base32_encode(&raw)
    }

    /// Encoded seed. Fails for public-only pairs.
    pub fn seed(&self) -> Result<String> {
        let signing_key = self.signing_key_ref()?;
        let role_byte = self.role.prefix_byte();
        let mut raw = Vec::with_capacity(36);
        raw.push(PREFIX_BYTE_SEED | (role_byte >> 5));
        raw.push((role_byte & 0x1f) << 3);
        raw.extend_from_slice(signing_key.as_bytes());
        append_crc(&mut raw);
        let encoded = base32_encode(&raw);
        raw.zeroize();
        Ok(encoded)
    }

    /// Sign a message. Fails for public-only pairs.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signing_key = self.signing_key_ref()?;
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    /// Verify a signature produced by this key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let sig: [u8; 64] = signature
            .try_into()
            .map_err(|_| NscError::SignatureInvalid)?;
        self.verifying_key
            .verify(message, &Signature::from_bytes(&sig))
            .map_err(|_| NscError::SignatureInvalid)
    }

    /// Copy of this pair without the seed.
    pub fn public_only(&self) -> Self {
        Self {
            role: self.role,
            verifying_key: self.verifying_key,
            signing_key: None,
        }
    }

    fn signing_key_ref(&self) -> Result<&SigningKey> {
        self.signing_key
            .as_ref()
            .ok_or_else(|| NscError::SigningKeyRequired(self.public_key()))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("role", &self.role)
            .field("public_key", &self.public_key())
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

/// True when `text` decodes as a public key of `role`.
pub fn is_public_key_of(text: &str, role: KeyRole) -> bool {
    KeyPair::from_public_key(text)
        .map(|kp| kp.role() == role)
        .unwrap_or(false)
}

fn append_crc(raw: &mut Vec<u8>) {
    let crc = crc16(raw);
    raw.extend_from_slice(&crc.to_le_bytes());
}

fn decode_checked(text: &str) -> Result<Vec<u8>> {
    let mut raw = base32_decode(text.trim())
        .ok_or_else(|| NscError::InvalidKey("invalid base32 encoding".into()))?;
    if raw.len() < 3 {
        return Err(NscError::InvalidKey("key is too short".into()));
    }
    let body_len = raw.len() - 2;
    let expected = u16::from_le_bytes([raw[body_len], raw[body_len + 1]]);
    if crc16(&raw[..body_len]) != expected {
        raw.zeroize();
        return Err(NscError::InvalidKey("checksum mismatch".into()));
    }
    Ok(raw)
}
