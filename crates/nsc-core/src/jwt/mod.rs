//! Signed claim documents.
//!
//! The jwt module provides:
//! - Claim envelope and kind-specific payloads (operator, account, user, activation)
//! - Compact token encoding, signing and verification
//! - Subject pattern validation and containment
//! - BEGIN/END framing for exported tokens and seeds

pub mod armor;
pub mod claims;
pub mod subject;
pub mod token;

pub use armor::{extract_seed, extract_token, format_config, format_jwt};
pub use claims::{
    normalize_tags, AccountLimits, AccountPayload, ActivationPayload, ClaimKind, ClaimPayload,
    Claims, Export, ExportKind, Import, OperatorPayload, Permission, ResponseType, UserLimits,
    UserPayload, NO_LIMIT,
};
pub use subject::{is_wildcard, subject_contains, validate_subject};
