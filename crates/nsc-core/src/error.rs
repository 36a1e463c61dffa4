//! Error types for nsc-core.
//!
//! Every failure carries a stable category (see [`ErrorKind`]) so callers
//! can branch on what went wrong without matching message text.
//! Seed material is never included in error messages.

use std::fmt;

/// A single problem found while validating one field of a claim edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The field (or flag) the problem belongs to, e.g. `expiry`.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A batch of independent validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Convert into `Ok(())` when empty, or a `Validation` error otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(NscError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Stable, inspectable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    KeyRoleMismatch,
    SigningKeyRequired,
    SigningKeyUnavailable,
    AmbiguousReference,
    NoExports,
    NoTokenRequiringExports,
    SubjectNotContained,
    Io,
    Timeout,
}

/// Error type covering every nsc-core operation.
#[derive(Debug, thiserror::Error)]
pub enum NscError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid {expected} key: {actual} key was provided")]
    KeyRoleMismatch { expected: String, actual: String },

    #[error("signing requires a seed but only a public key was provided for {0}")]
    SigningKeyRequired(String),

    #[error("signing key {0} is not available in the key store")]
    SigningKeyUnavailable(String),

    #[error("{reference:?} matches more than one {level}: {candidates:?}")]
    AmbiguousReference {
        level: String,
        reference: String,
        candidates: Vec<String>,
    },

    #[error("account {0:?} doesn't have exports")]
    NoExports(String),

    #[error("account {0:?} doesn't have exports that require token generation")]
    NoTokenRequiringExports(String),

    #[error("subject {subject:?} is not contained in export {export:?}")]
    SubjectNotContained { subject: String, export: String },

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("Timeout exceeded while fetching {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NscError {
    /// Shorthand for a single-field validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(field, message);
        NscError::Validation(errors)
    }

    /// The stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NscError::Validation(_)
            | NscError::InvalidKey(_)
            | NscError::SignatureInvalid
            | NscError::InvalidFileFormat(_)
            | NscError::Serialization(_) => ErrorKind::Validation,
            NscError::NotFound(_) => ErrorKind::NotFound,
            NscError::Conflict(_) => ErrorKind::Conflict,
            NscError::KeyRoleMismatch { .. } => ErrorKind::KeyRoleMismatch,
            NscError::SigningKeyRequired(_) => ErrorKind::SigningKeyRequired,
            NscError::SigningKeyUnavailable(_) => ErrorKind::SigningKeyUnavailable,
            NscError::AmbiguousReference { .. } => ErrorKind::AmbiguousReference,
            NscError::NoExports(_) => ErrorKind::NoExports,
            NscError::NoTokenRequiringExports(_) => ErrorKind::NoTokenRequiringExports,
            NscError::SubjectNotContained { .. } => ErrorKind::SubjectNotContained,
            NscError::Remote(_) | NscError::Io(_) => ErrorKind::Io,
            NscError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, NscError>;
