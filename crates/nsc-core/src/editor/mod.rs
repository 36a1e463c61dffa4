//! Claim editing.
//!
//! Edits are applied to a scratch copy of a claim. Every independent
//! problem is collected, and the caller commits only when the list is empty.

pub mod number;

pub use number::{parse_limit, parse_number};

use crate::error::{NscError, ValidationErrors};
use crate::jwt::claims::{normalize_tags, Claims, Export, Import, Permission};
use crate::time::parse_expiry;

/// Account limit selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLimit {
    Subs,
    Conns,
    Imports,
    Exports,
    Data,
    Payload,
}

impl AccountLimit {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountLimit::Subs => "subs",
            AccountLimit::Conns => "conns",
            AccountLimit::Imports => "imports",
            AccountLimit::Exports => "exports",
            AccountLimit::Data => "data",
            AccountLimit::Payload => "payload",
        }
    }
}

/// User limit selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLimit {
    Subs,
    Data,
    Payload,
}

impl UserLimit {
    pub fn as_str(self) -> &'static str {
        match self {
            UserLimit::Subs => "subs",
            UserLimit::Data => "data",
            UserLimit::Payload => "payload",
        }
    }
}

/// Which permission list a subject edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Publish,
    Subscribe,
}

/// One requested change to a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimEdit {
    /// Start of validity; parsed with [`parse_expiry`].
    Start(String),
    /// End of validity; parsed with [`parse_expiry`].
    Expiry(String),
    AddTags(Vec<String>),
    RemoveTags(Vec<String>),
    AccountLimit(AccountLimit, String),
    Wildcards(bool),
    AddExport(Export),
    RemoveExport(String),
    AddImport(Import),
    RemoveImport(String),
    AddSigningKey(String),
    RemoveSigningKey(String),
    UserLimit(UserLimit, String),
    Allow(Direction, Vec<String>),
    Deny(Direction, Vec<String>),
    /// Remove subjects from both the allow and deny lists.
    RemovePermission(Direction, Vec<String>),
}

/// Apply `edits` to a copy of `claims`.
///
/// Returns the edited copy together with every validation problem found,
/// including invariants of the final claim (e.g. expiry before start).
pub fn apply_edits(claims: &Claims, edits: &[ClaimEdit], now: i64) -> (Claims, ValidationErrors) {
    let mut scratch = claims.clone();
    let mut errors = ValidationErrors::new();

    for edit in edits {
        apply_one(&mut scratch, edit, now, &mut errors);
    }

    errors.extend(scratch.validate());
    (scratch, errors)
}

fn apply_one(claims: &mut Claims, edit: &ClaimEdit, now: i64, errors: &mut ValidationErrors) {
    let kind = claims.kind();
    let unsupported = |errors: &mut ValidationErrors, what: &str| {
        errors.push(what, format!("not supported for {kind} claims"));
    };

    match edit {
        ClaimEdit::Start(text) => match parse_expiry("start", text, now) {
            Ok(v) => claims.nbf = v,
            Err(e) => push_error(errors, e),
        },
        ClaimEdit::Expiry(text) => match parse_expiry("expiry", text, now) {
            Ok(v) => claims.exp = v,
            Err(e) => push_error(errors, e),
        },
        ClaimEdit::AddTags(tags) => match claims.tags_mut() {
            Some(existing) => {
                let merged = normalize_tags(existing.iter().chain(tags));
                *existing = merged;
            }
            None => unsupported(errors, "tag"),
        },
        ClaimEdit::RemoveTags(tags) => match claims.tags_mut() {
            Some(existing) => {
                let remove = normalize_tags(tags);
                existing.retain(|t| !remove.contains(t));
            }
            None => unsupported(errors, "rm-tag"),
        },
        ClaimEdit::AccountLimit(which, text) => {
            let value = match parse_limit(which.as_str(), text) {
                Ok(v) => v,
                Err(e) => return push_error(errors, e),
            };
            let Some(account) = claims.as_account_mut() else {
                return unsupported(errors, which.as_str());
            };
            let l = &mut account.limits;
            match which {
                AccountLimit::Subs => l.subs = value,
                AccountLimit::Conns => l.conn = value,
                AccountLimit::Imports => l.imports = value,
                AccountLimit::Exports => l.exports = value,
                AccountLimit::Data => l.data = value,
                AccountLimit::Payload => l.payload = value,
            }
        }
        ClaimEdit::Wildcards(allowed) => match claims.as_account_mut() {
            Some(account) => account.limits.wildcards = *allowed,
            None => unsupported(errors, "wildcards"),
        },
        ClaimEdit::AddExport(export) => match claims.as_account_mut() {
            Some(account) => {
                if account.exports.iter().any(|e| e.subject == export.subject) {
                    errors.push(
                        "export",
                        format!("export subject {:?} already exists", export.subject),
                    );
                } else {
                    account.exports.push(export.clone());
                }
            }
            None => unsupported(errors, "export"),
        },
        ClaimEdit::RemoveExport(subject) => match claims.as_account_mut() {
            Some(account) => {
                let before = account.exports.len();
                account.exports.retain(|e| &e.subject != subject);
                if account.exports.len() == before {
                    errors.push("export", format!("no export with subject {subject:?}"));
                }
            }
            None => unsupported(errors, "export"),
        },
        ClaimEdit::AddImport(import) => match claims.as_account_mut() {
            Some(account) => {
                if account
                    .imports
                    .iter()
                    .any(|i| i.subject == import.subject && i.account == import.account)
                {
                    errors.push(
                        "import",
                        format!("import subject {:?} already exists", import.subject),
                    );
                } else {
                    account.imports.push(import.clone());
                }
            }
            None => unsupported(errors, "import"),
        },
        ClaimEdit::RemoveImport(subject) => match claims.as_account_mut() {
            Some(account) => {
                let before = account.imports.len();
                account.imports.retain(|i| &i.subject != subject);
                if account.imports.len() == before {
                    errors.push("import", format!("no import with subject {subject:?}"));
                }
            }
            None => unsupported(errors, "import"),
        },
        ClaimEdit::AddSigningKey(key) => match claims.signing_keys_mut() {
            Some(keys) => {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
            None => unsupported(errors, "signing key"),
        },
        ClaimEdit::RemoveSigningKey(key) => match claims.signing_keys_mut() {
            Some(keys) => keys.retain(|k| k != key),
            None => unsupported(errors, "signing key"),
        },
        ClaimEdit::UserLimit(which, text) => {
            let value = match parse_limit(which.as_str(), text) {
                Ok(v) => v,
                Err(e) => return push_error(errors, e),
            };
            let Some(user) = claims.as_user_mut() else {
                return unsupported(errors, which.as_str());
            };
            match which {
                UserLimit::Subs => user.limits.subs = value,
                UserLimit::Data => user.limits.data = value,
                UserLimit::Payload => user.limits.payload = value,
            }
        }
        ClaimEdit::Allow(dir, subjects) => match permission_mut(claims, *dir) {
            Some(p) => add_unique(&mut p.allow, subjects),
            None => unsupported(errors, "allow"),
        },
        ClaimEdit::Deny(dir, subjects) => match permission_mut(claims, *dir) {
            Some(p) => add_unique(&mut p.deny, subjects),
            None => unsupported(errors, "deny"),
        },
        ClaimEdit::RemovePermission(dir, subjects) => match permission_mut(claims, *dir) {
            Some(p) => {
                p.allow.retain(|s| !subjects.contains(s));
                p.deny.retain(|s| !subjects.contains(s));
            }
            None => unsupported(errors, "rm"),
        },
    }
}

fn permission_mut(claims: &mut Claims, dir: Direction) -> Option<&mut Permission> {
    let user = claims.as_user_mut()?;
    Some(match dir {
        Direction::Publish => &mut user.publish,
        Direction::Subscribe => &mut user.subscribe,
    })
}

fn add_unique(list: &mut Vec<String>, subjects: &[String]) {
    for s in subjects {
        if !list.contains(s) {
            list.push(s.clone());
        }
    }
}

fn push_error(errors: &mut ValidationErrors, err: NscError) {
    match err {
        NscError::Validation(batch) => errors.extend(batch),
        other => errors.push("edit", other.to_string()),
    }
}
