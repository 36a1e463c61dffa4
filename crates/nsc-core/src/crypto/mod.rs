//! Cryptographic primitives for nsc-core.
//!
//! This module provides:
//! - Role-prefixed Ed25519 key pairs (operator, account, user, ...)
//! - Base32 and CRC16 helpers used by the key and claim encodings

pub mod encoding;
pub mod keys;

pub use keys::{is_public_key_of, KeyPair, KeyRole};
