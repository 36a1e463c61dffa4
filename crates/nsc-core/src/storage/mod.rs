//! Storage layer for keys, claims and the current selection.
//!
//! # Directory layout
//!
//! By convention keys live under `~/.nkeys/` and stores under
//! `~/.nsc/nats/`; both can be relocated through [`crate::config`].
//!
//! ```text
//! ~/.nkeys/
//! └── keys/
//!     └── {O|A|U}/{xx}/{public key}.nk
//! ~/.nsc/nats/
//! ├── .selection.json
//! └── {operator}/
//!     ├── .nsc.json
//!     ├── {operator}.jwt
//!     └── accounts/{account}/
//!         ├── {account}.jwt
//!         └── users/{user}/{user}.jwt
//! ```
//!
//! # Modules
//!
//! - [`fs`]: atomic writes and directory checks.
//! - [`key_store`]: seeds and public keys addressed by role and public key.
//! - [`selection`]: the persisted current operator and account.
//! - [`trust_store`]: add, read, edit and verify signed claims.

pub mod fs;
pub mod key_store;
pub mod selection;
pub mod trust_store;

pub use key_store::{KeyStore, StoredKey};
pub use selection::Selection;
pub use trust_store::{AddOptions, EntityRef, Level, StoreInfo, TrustStore};
