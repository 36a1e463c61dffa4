//! Compact `header.payload.signature` encoding of claims.
//!
//! Each part is base64url without padding. The signature is Ed25519 over
//! `header.payload`, made by the issuer key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::encoding::base32_encode;
use crate::crypto::keys::KeyPair;
use crate::error::{NscError, Result};

use super::claims::Claims;

const TOKEN_TYPE: &str = "jwt";
const ALGORITHM: &str = "ed25519-nkey";
/// Header algorithm written by older tools; still accepted on decode.
const LEGACY_ALGORITHM: &str = "ed25519";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    typ: String,
    alg: String,
}

impl Claims {
    /// Sign the claim with `issuer` and return the encoded token.
    ///
    /// Sets `iss`, `iat` and `jti` on `self` so the caller keeps the exact
    /// values that were signed.
    pub fn encode(&mut self, issuer: &KeyPair, now: i64) -> Result<String> {
        let kind = self.kind();
        if !kind.issuer_roles().contains(&issuer.role()) {
            return Err(NscError::KeyRoleMismatch {
                expected: format!("{kind} issuer"),
                actual: issuer.role().to_string(),
            });
        }
        if !issuer.can_sign() {
            return Err(NscError::SigningKeyRequired(issuer.public_key()));
        }
        self.validate().into_result()?;

        self.iss = issuer.public_key();
        self.iat = now;
        self.jti = String::new();
        let unhashed = serde_json::to_vec(self)
            .map_err(|e| NscError::Serialization(e.to_string()))?;
        self.jti = base32_encode(&Sha256::digest(&unhashed));

        let header = Header {
            typ: TOKEN_TYPE.to_string(),
            alg: ALGORITHM.to_string(),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| NscError::Serialization(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(self).map_err(|e| NscError::Serialization(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = issuer.sign(signing_input.as_bytes())?;
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Decode a token and verify its signature and issuer role.
    pub fn decode(token: &str) -> Result<Claims> {
        let token = token.trim();
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(NscError::InvalidFileFormat(
                "token must have three parts".into(),
            ));
        }

        let header: Header = decode_part(parts[0], "header")?;
        let known_alg = header.alg == ALGORITHM || header.alg == LEGACY_ALGORITHM;
        if !header.typ.eq_ignore_ascii_case(TOKEN_TYPE) || !known_alg {
            return Err(NscError::InvalidFileFormat(format!(
                "unsupported token header typ={} alg={}",
                header.typ, header.alg
            )));
        }
        let claims: Claims = decode_part(parts[1], "payload")?;
        let signature = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|e| NscError::InvalidFileFormat(format!("invalid signature encoding: {e}")))?;

        let issuer = KeyPair::from_public_key(&claims.iss)?;
        let kind = claims.kind();
        if !kind.issuer_roles().contains(&issuer.role()) {
            return Err(NscError::KeyRoleMismatch {
                expected: format!("{kind} issuer"),
                actual: issuer.role().to_string(),
            });
        }
        let signing_input = &token[..parts[0].len() + 1 + parts[1].len()];
        issuer.verify(signing_input.as_bytes(), &signature)?;

        Ok(claims)
    }
}

fn decode_part<T: for<'de> Deserialize<'de>>(part: &str, what: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| NscError::InvalidFileFormat(format!("invalid {what} encoding: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| NscError::InvalidFileFormat(format!("invalid {what}: {e}")))
}
