//! nsc-core — operator, account and user credentials for NATS.
//!
//! Provides role-prefixed Ed25519 keys, signed claim tokens, a key store,
//! a directory-backed trust store of operators, accounts and users,
//! batched claim editing, and activation tokens for private exports.

pub mod activation;
pub mod config;
pub mod crypto;
pub mod editor;
pub mod error;
pub mod jwt;
pub mod prompt;
pub mod remote;
pub mod resolver;
pub mod storage;
pub mod time;

// Re-export primary types
pub use crypto::{KeyPair, KeyRole};
pub use error::{ErrorKind, FieldError, NscError, Result, ValidationErrors};
pub use jwt::{ClaimKind, ClaimPayload, Claims, Export, ExportKind, Import};
pub use time::{Clock, FixedClock, SystemClock};

// Re-export store types
pub use storage::{AddOptions, EntityRef, KeyStore, Level, Selection, TrustStore};

// Re-export editing and activation types
pub use activation::{generate_activation, Activation, ActivationBuilder, ActivationRequest};
pub use config::Config;
pub use editor::{apply_edits, ClaimEdit};
pub use prompt::{Answer, AnswerSource, QueueAnswers, TerminalAnswers};
