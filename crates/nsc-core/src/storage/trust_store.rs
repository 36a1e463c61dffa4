//! Operator, account and user persistence.
//!
//! Each entity is a signed claim stored as a token file under a directory
//! tree rooted at the stores directory:
//!
//! ```text
//! {root}/
//! ├── .selection.json                 # current operator/account
//! └── {operator}/
//!     ├── .nsc.json                   # store metadata
//!     ├── {operator}.jwt              # absent in operator-less stores
//!     └── accounts/
//!         └── {account}/
//!             ├── {account}.jwt
//!             └── users/
//!                 └── {user}/
//!                     └── {user}.jwt
//! ```
//!
//! Names are case-sensitive and unique within their parent. Keys live in the
//! [`KeyStore`]; the claim subject is the link between the two.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::keys::{KeyPair, KeyRole};
use crate::editor::{apply_edits, ClaimEdit};
use crate::error::{NscError, Result};
use crate::jwt::armor::{extract_token, format_config};
use crate::jwt::claims::{ClaimKind, Claims};
use crate::time::Clock;

use super::fs::{is_valid_dir, maybe_make_dir, read_optional, write_atomic};
use super::key_store::KeyStore;
use super::selection::Selection;

// ── File and directory names ──────────────────────────────────────────────────

const STORE_INFO_FILE: &str = ".nsc.json";
const ACCOUNTS_DIR: &str = "accounts";
const USERS_DIR: &str = "users";
const CLAIM_EXTENSION: &str = "jwt";

// ── Entity addressing ─────────────────────────────────────────────────────────

/// Depth of an entity in the trust tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Operator,
    Account,
    User,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Operator => "operator",
            Level::Account => "account",
            Level::User => "user",
        }
    }

    /// Role of the entity's own key.
    pub fn key_role(self) -> KeyRole {
        match self {
            Level::Operator => KeyRole::Operator,
            Level::Account => KeyRole::Account,
            Level::User => KeyRole::User,
        }
    }

    pub fn claim_kind(self) -> ClaimKind {
        match self {
            Level::Operator => ClaimKind::Operator,
            Level::Account => ClaimKind::Account,
            Level::User => ClaimKind::User,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully qualified reference to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Operator {
        operator: String,
    },
    Account {
        operator: String,
        account: String,
    },
    User {
        operator: String,
        account: String,
        user: String,
    },
}

impl EntityRef {
    pub fn operator(operator: impl Into<String>) -> Self {
        EntityRef::Operator {
            operator: operator.into(),
        }
    }

    pub fn account(operator: impl Into<String>, account: impl Into<String>) -> Self {
        EntityRef::Account {
            operator: operator.into(),
            account: account.into(),
        }
    }

    pub fn user(
        operator: impl Into<String>,
        account: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        EntityRef::User {
            operator: operator.into(),
            account: account.into(),
            user: user.into(),
        }
    }

    pub fn level(&self) -> Level {
        match self {
            EntityRef::Operator { .. } => Level::Operator,
            EntityRef::Account { .. } => Level::Account,
            EntityRef::User { .. } => Level::User,
        }
    }

    /// The entity's own name.
    pub fn name(&self) -> &str {
        match self {
            EntityRef::Operator { operator } => operator,
            EntityRef::Account { account, .. } => account,
            EntityRef::User { user, .. } => user,
        }
    }

    pub fn operator_name(&self) -> &str {
        match self {
            EntityRef::Operator { operator }
            | EntityRef::Account { operator, .. }
            | EntityRef::User { operator, .. } => operator,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Operator { operator } => write!(f, "{operator}"),
            EntityRef::Account { operator, account } => write!(f, "{operator}/{account}"),
            EntityRef::User {
                operator,
                account,
                user,
            } => write!(f, "{operator}/{account}/{user}"),
        }
    }
}

// ── On-disk structures ────────────────────────────────────────────────────────

/// Metadata written to `{root}/{operator}/.nsc.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub name: String,
    /// False for operator-less stores, whose accounts are self-signed.
    #[serde(default)]
    pub has_operator: bool,
}

// ── Add options ───────────────────────────────────────────────────────────────

/// Inputs for adding an operator, account or user.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub name: String,
    /// The entity's own key. Generated when absent.
    pub key: Option<KeyPair>,
    /// Explicit parent signing key. Falls back to the key store.
    pub signer: Option<KeyPair>,
    pub start: String,
    pub expiry: String,
    pub tags: Vec<String>,
}

impl AddOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// ── TrustStore ────────────────────────────────────────────────────────────────

/// Filesystem-backed tree of signed operator, account and user claims.
///
/// Every mutation is a single atomic file replacement, so concurrent
/// invocations against different entities do not interfere. Concurrent
/// edits of the same entity are last-writer-wins.
#[derive(Debug, Clone)]
pub struct TrustStore {
    root: PathBuf,
    keys: KeyStore,
}

impl TrustStore {
    /// Open an existing stores directory.
    ///
    /// # Errors
    ///
    /// Returns `NscError::Io` if `root` does not exist, or a validation error
    /// if it is not a directory.
    pub fn open(root: impl Into<PathBuf>, keys: KeyStore) -> Result<Self> {
        let root = root.into();
        is_valid_dir(&root)?;
        Ok(Self { root, keys })
    }

    /// Open a stores directory, creating it if needed.
    pub fn create(root: impl Into<PathBuf>, keys: KeyStore) -> Result<Self> {
        let root = root.into();
        maybe_make_dir(&root)?;
        Ok(Self { root, keys })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    // ── Stores ────────────────────────────────────────────────────────────────

    /// Create an operator-less store. Accounts added to it sign themselves.
    ///
    /// # Errors
    ///
    /// Returns `NscError::Conflict` if a store with that name exists.
    pub fn init_store(&self, name: &str) -> Result<()> {
        validate_name(Level::Operator, name)?;
        let dir = self.root.join(name);
        if dir.exists() {
            return Err(NscError::Conflict(format!("operator {name:?} already exists")));
        }
        maybe_make_dir(&dir)?;
        self.write_store_info(&StoreInfo {
            name: name.to_string(),
            has_operator: false,
        })?;
        self.select(Some(name), None);
        log::info!("created operator-less store {name}");
        Ok(())
    }

    /// Read the metadata of the store named `operator`.
    ///
    /// # Errors
    ///
    /// Returns `NscError::NotFound` if there is no such store.
    pub fn store_info(&self, operator: &str) -> Result<StoreInfo> {
        let path = self.root.join(operator).join(STORE_INFO_FILE);
        let bytes = read_optional(&path)?
            .ok_or_else(|| NscError::NotFound(format!("operator {operator:?} does not exist")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| NscError::InvalidFileFormat(format!("{}: {e}", path.display())))
    }

    /// Names of every store, sorted.
    pub fn list_operators(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.join(STORE_INFO_FILE).is_file() {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    // ── Adding entities ───────────────────────────────────────────────────────

    /// Add an operator. The operator claim is self-signed.
    ///
    /// # Errors
    ///
    /// Returns `NscError::Conflict` for a duplicate name, `NscError::Validation`
    /// for bad names or validity windows (including an expiry in the past),
    /// and key errors when the operator key cannot sign.
    pub fn add_operator(&self, opts: &AddOptions, clock: &dyn Clock) -> Result<Claims> {
        let now = clock.now();
        let entity = EntityRef::operator(&opts.name);
        validate_name(Level::Operator, &opts.name)?;
        if self.root.join(&opts.name).exists() {
            return Err(NscError::Conflict(format!(
                "operator {:?} already exists",
                opts.name
            )));
        }

        let (mut claims, key) = new_claim(Level::Operator, opts, now)?;
        let signer = match &opts.signer {
            Some(s) => {
                self.check_signer(&entity, &claims, s)?;
                s.clone()
            }
            None => key.clone(),
        };

        let token = claims.encode(&signer, now)?;
        self.keys.store(&key)?;
        let committed = write_atomic(&self.claim_path(&entity), token.as_bytes()).and_then(|()| {
            self.write_store_info(&StoreInfo {
                name: opts.name.clone(),
                has_operator: true,
            })
        });
        if let Err(e) = committed {
            // A half-written operator directory would block a retry as a conflict.
            let _ = std::fs::remove_dir_all(self.root.join(&opts.name));
            return Err(e);
        }
        self.select(Some(&opts.name), None);
        log::info!("added operator {} ({})", opts.name, claims.sub);
        Ok(claims)
    }

    /// Add an account under `operator`.
    ///
    /// The claim is signed by `opts.signer`, or by the operator key held in
    /// the key store. In an operator-less store the account signs itself.
    pub fn add_account(&self, operator: &str, opts: &AddOptions, clock: &dyn Clock) -> Result<Claims> {
        let now = clock.now();
        let info = self.store_info(operator)?;
        let entity = EntityRef::account(operator, &opts.name);
        validate_name(Level::Account, &opts.name)?;
        self.ensure_absent(&entity)?;

        let (mut claims, key) = new_claim(Level::Account, opts, now)?;
        let signer = match (&opts.signer, info.has_operator) {
            (Some(s), _) => {
                self.check_signer(&entity, &claims, s)?;
                s.clone()
            }
            (None, true) => {
                let op = self.read_claim(&EntityRef::operator(operator))?;
                self.keys.signing_key(&op.sub)?
            }
            (None, false) => key.clone(),
        };

        let token = claims.encode(&signer, now)?;
        self.keys.store(&key)?;
        write_atomic(&self.claim_path(&entity), token.as_bytes())?;
        self.select(Some(operator), Some(&opts.name));
        log::info!("added account {entity} ({})", claims.sub);
        Ok(claims)
    }

    /// Add a user under `operator/account`, signed by the account.
    pub fn add_user(
        &self,
        operator: &str,
        account: &str,
        opts: &AddOptions,
        clock: &dyn Clock,
    ) -> Result<Claims> {
        let now = clock.now();
        let parent = self.read_claim(&EntityRef::account(operator, account))?;
        let entity = EntityRef::user(operator, account, &opts.name);
        validate_name(Level::User, &opts.name)?;
        self.ensure_absent(&entity)?;

        let (mut claims, key) = new_claim(Level::User, opts, now)?;
        let signer = match &opts.signer {
            Some(s) => {
                self.check_signer(&entity, &claims, s)?;
                s.clone()
            }
            None => self.keys.signing_key(&parent.sub)?,
        };

        let token = claims.encode(&signer, now)?;
        self.keys.store(&key)?;
        write_atomic(&self.claim_path(&entity), token.as_bytes())?;
        log::info!("added user {entity} ({})", claims.sub);
        Ok(claims)
    }

    // ── Reading ───────────────────────────────────────────────────────────────

    /// True when a claim file exists for `entity`.
    pub fn exists(&self, entity: &EntityRef) -> bool {
        self.claim_path(entity).is_file()
    }

    /// Read the raw token stored for `entity`.
    ///
    /// # Errors
    ///
    /// Returns `NscError::NotFound` when the entity does not exist.
    pub fn read_token(&self, entity: &EntityRef) -> Result<String> {
        let path = self.claim_path(entity);
        let bytes = read_optional(&path)?.ok_or_else(|| {
            NscError::NotFound(format!("{} {:?} does not exist", entity.level(), entity.name()))
        })?;
        let text = String::from_utf8(bytes).map_err(|_| {
            NscError::InvalidFileFormat(format!("{} is not valid UTF-8", path.display()))
        })?;
        Ok(extract_token(&text))
    }

    /// Read and decode the claim stored for `entity`.
    ///
    /// A missing file is `NotFound`; a file that does not decode, fails its
    /// signature check or holds the wrong claim kind is a hard error.
    pub fn read_claim(&self, entity: &EntityRef) -> Result<Claims> {
        let token = self.read_token(entity)?;
        let claims = Claims::decode(&token).map_err(|e| match e {
            NscError::InvalidFileFormat(msg) => NscError::InvalidFileFormat(format!(
                "{}: {msg}",
                self.claim_path(entity).display()
            )),
            other => other,
        })?;
        if claims.kind() != entity.level().claim_kind() {
            return Err(NscError::InvalidFileFormat(format!(
                "{} holds a {} claim, expected {}",
                self.claim_path(entity).display(),
                claims.kind(),
                entity.level()
            )));
        }
        Ok(claims)
    }

    /// Account names under `operator`, sorted.
    pub fn list_accounts(&self, operator: &str) -> Result<Vec<String>> {
        self.store_info(operator)?;
        list_entities(&self.root.join(operator).join(ACCOUNTS_DIR))
    }

    /// User names under `operator/account`, sorted.
    pub fn list_users(&self, operator: &str, account: &str) -> Result<Vec<String>> {
        let entity = EntityRef::account(operator, account);
        if !self.exists(&entity) {
            return Err(NscError::NotFound(format!("account {account:?} does not exist")));
        }
        list_entities(&self.entity_dir(&entity).join(USERS_DIR))
    }

    // ── Editing ───────────────────────────────────────────────────────────────

    /// Apply `edits` to the claim of `entity`, re-sign it and replace the file.
    ///
    /// All validation problems are reported together and nothing is written
    /// unless the whole batch is valid. Without an explicit `signer` the
    /// claim is re-signed by its original issuer, which must still be a
    /// valid signer with a seed in the key store.
    ///
    /// # Errors
    ///
    /// Returns `NscError::Validation` with every problem found,
    /// `NscError::SigningKeyUnavailable` when the original issuer key is gone,
    /// or the errors of [`TrustStore::read_claim`].
    pub fn edit_claim(
        &self,
        entity: &EntityRef,
        edits: &[ClaimEdit],
        signer: Option<&KeyPair>,
        clock: &dyn Clock,
    ) -> Result<Claims> {
        let now = clock.now();
        let current = self.read_claim(entity)?;
        let (mut edited, errors) = apply_edits(&current, edits, now);
        errors.into_result()?;

        let issuer = match signer {
            Some(s) => {
                self.check_signer(entity, &edited, s)?;
                s.clone()
            }
            None => {
                if !self.is_valid_issuer(entity, &edited, &current.iss)? {
                    return Err(NscError::SigningKeyUnavailable(current.iss));
                }
                self.keys.signing_key(&current.iss)?
            }
        };

        let token = edited.encode(&issuer, now)?;
        write_atomic(&self.claim_path(entity), token.as_bytes())?;
        log::info!("re-signed {} {entity}", entity.level());
        Ok(edited)
    }

    // ── Name resolution ───────────────────────────────────────────────────────

    /// Resolve an operator by name or public key prefix.
    pub fn resolve_operator(&self, reference: &str) -> Result<String> {
        let mut entries = Vec::new();
        for name in self.list_operators()? {
            let key = match self.read_claim(&EntityRef::operator(&name)) {
                Ok(c) => Some(c.sub),
                Err(NscError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            entries.push((name, key));
        }
        resolve_reference(Level::Operator, reference, entries)
    }

    /// Resolve an account of `operator` by name or public key prefix.
    pub fn resolve_account(&self, operator: &str, reference: &str) -> Result<String> {
        let mut entries = Vec::new();
        for name in self.list_accounts(operator)? {
            let claims = self.read_claim(&EntityRef::account(operator, &name))?;
            entries.push((name, Some(claims.sub)));
        }
        resolve_reference(Level::Account, reference, entries)
    }

    /// Resolve a user of `operator/account` by name or public key prefix.
    pub fn resolve_user(&self, operator: &str, account: &str, reference: &str) -> Result<String> {
        let mut entries = Vec::new();
        for name in self.list_users(operator, account)? {
            let claims = self.read_claim(&EntityRef::user(operator, account, &name))?;
            entries.push((name, Some(claims.sub)));
        }
        resolve_reference(Level::User, reference, entries)
    }

    // ── Current selection ─────────────────────────────────────────────────────

    pub fn current(&self) -> Result<Selection> {
        Selection::load(&self.root)
    }

    /// Make `name` the current operator or account.
    ///
    /// Selecting an operator clears the current account unless an account
    /// of the same name exists under the new operator. Selecting an account
    /// requires a current operator.
    pub fn set_current(&self, level: Level, name: &str) -> Result<Selection> {
        let mut sel = self.current()?;
        match level {
            Level::Operator => {
                self.store_info(name)?;
                let keep = sel
                    .account
                    .take()
                    .filter(|a| self.exists(&EntityRef::account(name, a)));
                sel.operator = Some(name.to_string());
                sel.account = keep;
            }
            Level::Account => {
                let operator = sel
                    .operator
                    .clone()
                    .ok_or_else(|| NscError::validation("operator", "no current operator"))?;
                if !self.exists(&EntityRef::account(&operator, name)) {
                    return Err(NscError::NotFound(format!("account {name:?} does not exist")));
                }
                sel.account = Some(name.to_string());
            }
            Level::User => {
                return Err(NscError::validation("user", "users cannot be selected"));
            }
        }
        sel.save(&self.root)?;
        log::debug!("selection is now {sel:?}");
        Ok(sel)
    }

    /// The current operator, or the only one when nothing is selected.
    ///
    /// # Errors
    ///
    /// Returns a validation error when no operator can be implied.
    pub fn current_operator(&self) -> Result<String> {
        if let Some(op) = self.current()?.operator {
            if self.store_info(&op).is_ok() {
                return Ok(op);
            }
        }
        match self.list_operators()?.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(NscError::validation("operator", "an operator is required")),
        }
    }

    /// The current account of `operator`, or its only account.
    pub fn current_account(&self, operator: &str) -> Result<String> {
        let sel = self.current()?;
        if sel.operator.as_deref() == Some(operator) {
            if let Some(account) = sel.account {
                if self.exists(&EntityRef::account(operator, &account)) {
                    return Ok(account);
                }
            }
        }
        match self.list_accounts(operator)?.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(NscError::validation("account", "an account is required")),
        }
    }

    // ── Verification and export ───────────────────────────────────────────────

    /// Decode `entity` and every ancestor, checking each signature and that
    /// each issuer is a valid signer of its parent.
    ///
    /// Returns the claim of `entity`.
    pub fn verify_chain(&self, entity: &EntityRef) -> Result<Claims> {
        let claims = self.read_claim(entity)?;
        if !self.is_valid_issuer(entity, &claims, &claims.iss)? {
            return Err(NscError::validation(
                "issuer",
                format!("{entity} is issued by {}, which is not a valid signer", claims.iss),
            ));
        }
        match entity {
            EntityRef::Operator { .. } => {}
            EntityRef::Account { operator, .. } => {
                if self.store_info(operator)?.has_operator {
                    self.verify_chain(&EntityRef::operator(operator))?;
                }
            }
            EntityRef::User {
                operator, account, ..
            } => {
                self.verify_chain(&EntityRef::account(operator, account))?;
            }
        }
        Ok(claims)
    }

    /// The creds bundle (user token plus seed) of a user.
    ///
    /// # Errors
    ///
    /// Returns `NscError::SigningKeyUnavailable` when the user's seed is not in
    /// the key store.
    pub fn export_user_creds(&self, operator: &str, account: &str, user: &str) -> Result<String> {
        let entity = EntityRef::user(operator, account, user);
        let claims = self.read_claim(&entity)?;
        let token = self.read_token(&entity)?;
        let seed = self.keys.signing_key(&claims.sub)?.seed()?;
        Ok(format_config(ClaimKind::User.as_str(), &token, &seed))
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn entity_dir(&self, entity: &EntityRef) -> PathBuf {
        match entity {
            EntityRef::Operator { operator } => self.root.join(operator),
            EntityRef::Account { operator, account } => {
                self.root.join(operator).join(ACCOUNTS_DIR).join(account)
            }
            EntityRef::User {
                operator,
                account,
                user,
            } => self
                .root
                .join(operator)
                .join(ACCOUNTS_DIR)
                .join(account)
                .join(USERS_DIR)
                .join(user),
        }
    }

    fn claim_path(&self, entity: &EntityRef) -> PathBuf {
        self.entity_dir(entity)
            .join(format!("{}.{CLAIM_EXTENSION}", entity.name()))
    }

    fn ensure_absent(&self, entity: &EntityRef) -> Result<()> {
        if self.exists(entity) {
            return Err(NscError::Conflict(format!(
                "{} {:?} already exists",
                entity.level(),
                entity.name()
            )));
        }
        Ok(())
    }

    fn write_store_info(&self, info: &StoreInfo) -> Result<()> {
        let json = serde_json::to_vec_pretty(info)
            .map_err(|e| NscError::Serialization(e.to_string()))?;
        write_atomic(&self.root.join(&info.name).join(STORE_INFO_FILE), &json)
    }

    /// Make `operator`/`account` current. The entity is already committed by
    /// the time this runs, so a failed save is logged and not returned.
    fn select(&self, operator: Option<&str>, account: Option<&str>) {
        let sel = Selection {
            operator: operator.map(str::to_string),
            account: account.map(str::to_string),
        };
        if let Err(e) = sel.save(&self.root) {
            log::warn!("selection not updated: {e}");
        }
    }

    /// Role a signer of `entity` must have.
    fn issuer_role(&self, entity: &EntityRef) -> Result<KeyRole> {
        Ok(match entity {
            EntityRef::Operator { .. } => KeyRole::Operator,
            EntityRef::Account { operator, .. } => {
                if self.store_info(operator)?.has_operator {
                    KeyRole::Operator
                } else {
                    KeyRole::Account
                }
            }
            EntityRef::User { .. } => KeyRole::Account,
        })
    }

    /// True when `key` may sign the claim `own` of `entity`.
    fn is_valid_issuer(&self, entity: &EntityRef, own: &Claims, key: &str) -> Result<bool> {
        match entity {
            EntityRef::Operator { .. } => Ok(own.is_valid_signer(key)),
            EntityRef::Account { operator, .. } => {
                if self.store_info(operator)?.has_operator {
                    let op = self.read_claim(&EntityRef::operator(operator))?;
                    Ok(op.is_valid_signer(key))
                } else {
                    Ok(own.sub == key)
                }
            }
            EntityRef::User {
                operator, account, ..
            } => {
                let parent = self.read_claim(&EntityRef::account(operator, account))?;
                Ok(parent.is_valid_signer(key))
            }
        }
    }

    fn check_signer(&self, entity: &EntityRef, own: &Claims, signer: &KeyPair) -> Result<()> {
        let expected = self.issuer_role(entity)?;
        if signer.role() != expected {
            return Err(NscError::KeyRoleMismatch {
                expected: expected.to_string(),
                actual: signer.role().to_string(),
            });
        }
        if !self.is_valid_issuer(entity, own, &signer.public_key())? {
            return Err(NscError::validation(
                "signing key",
                format!("{} is not a valid signer for {entity}", signer.public_key()),
            ));
        }
        if !signer.can_sign() {
            return Err(NscError::SigningKeyRequired(signer.public_key()));
        }
        Ok(())
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

fn validate_name(level: Level, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(NscError::validation("name", format!("{level} name is required")));
    }
    if name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(NscError::validation(
            "name",
            format!("{name:?} is not a valid {level} name"),
        ));
    }
    Ok(())
}

/// Build the unsigned claim for a new entity, collecting every problem with
/// the requested validity window and tags.
fn new_claim(level: Level, opts: &AddOptions, now: i64) -> Result<(Claims, KeyPair)> {
    let key = match &opts.key {
        Some(k) if k.role() != level.key_role() => {
            return Err(NscError::KeyRoleMismatch {
                expected: level.key_role().to_string(),
                actual: k.role().to_string(),
            });
        }
        Some(k) => k.clone(),
        None => KeyPair::generate(level.key_role()),
    };

    let blank = match level {
        Level::Operator => Claims::operator(&key, &opts.name),
        Level::Account => Claims::account(&key, &opts.name),
        Level::User => Claims::user(&key, &opts.name),
    };
    let mut edits = vec![
        ClaimEdit::Start(opts.start.clone()),
        ClaimEdit::Expiry(opts.expiry.clone()),
    ];
    if !opts.tags.is_empty() {
        edits.push(ClaimEdit::AddTags(opts.tags.clone()));
    }

    let (claims, mut errors) = apply_edits(&blank, &edits, now);
    if claims.exp.is_some_and(|exp| exp < now) {
        errors.push(
            "expiry",
            format!("expiry {:?} is in the past", opts.expiry.trim()),
        );
    }
    errors.into_result()?;
    Ok((claims, key))
}

/// Entity directories under `dir` that hold a claim file of the same name.
fn list_entities(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if path.join(format!("{name}.{CLAIM_EXTENSION}")).is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Match `reference` against entity names, then public key prefixes.
fn resolve_reference(
    level: Level,
    reference: &str,
    entries: Vec<(String, Option<String>)>,
) -> Result<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(NscError::validation(level.as_str(), format!("{level} is required")));
    }
    if entries.iter().any(|(name, _)| name == reference) {
        return Ok(reference.to_string());
    }

    let mut candidates: Vec<String> = entries
        .into_iter()
        .filter(|(_, key)| key.as_deref().is_some_and(|k| k.starts_with(reference)))
        .map(|(name, _)| name)
        .collect();
    match candidates.len() {
        0 => Err(NscError::NotFound(format!("{level} {reference:?} does not exist"))),
        1 => Ok(candidates.remove(0)),
        _ => Err(NscError::AmbiguousReference {
            level: level.to_string(),
            reference: reference.to_string(),
            candidates,
        }),
    }
}
