//! Claim documents.
//!
//! Every claim shares one envelope (subject, issuer, name, validity window,
//! id) and carries a kind-specific payload under `nats`, tagged by `type`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::keys::{KeyPair, KeyRole};
use crate::error::ValidationErrors;

use super::subject::{is_wildcard, validate_subject};

/// Sentinel for "no limit" in numeric limits.
pub const NO_LIMIT: i64 = -1;

fn no_limit() -> i64 {
    NO_LIMIT
}

fn yes() -> bool {
    true
}

/// The kind of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimKind {
    Operator,
    Account,
    User,
    Activation,
}

impl ClaimKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimKind::Operator => "operator",
            ClaimKind::Account => "account",
            ClaimKind::User => "user",
            ClaimKind::Activation => "activation",
        }
    }

    /// Role the subject key must have.
    pub fn subject_role(self) -> KeyRole {
        match self {
            ClaimKind::Operator => KeyRole::Operator,
            ClaimKind::Account | ClaimKind::Activation => KeyRole::Account,
            ClaimKind::User => KeyRole::User,
        }
    }

    /// Roles allowed to issue a claim of this kind. Accounts may be
    /// self-signed when no operator exists.
    pub fn issuer_roles(self) -> &'static [KeyRole] {
        match self {
            ClaimKind::Operator => &[KeyRole::Operator],
            ClaimKind::Account => &[KeyRole::Operator, KeyRole::Account],
            ClaimKind::User | ClaimKind::Activation => &[KeyRole::Account],
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream or service export/import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Stream,
    Service,
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportKind::Stream => f.write_str("stream"),
            ExportKind::Service => f.write_str("service"),
        }
    }
}

/// How a service export responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Singleton,
    Stream,
    Chunked,
}

/// A subject offered to other accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: ExportKind,
    /// Private exports require an activation token to be imported.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub token_req: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Export {
    pub fn new(subject: impl Into<String>, kind: ExportKind, private: bool) -> Self {
        Self {
            name: String::new(),
            subject: subject.into(),
            kind,
            token_req: private,
            response_type: None,
            description: None,
        }
    }

    fn validate(&self, errors: &mut ValidationErrors) {
        if let Err(e) = validate_subject(&self.subject) {
            errors.push("export", e);
        }
        if self.response_type.is_some() && self.kind == ExportKind::Stream {
            errors.push(
                "export",
                format!("stream export {:?} cannot have a response type", self.subject),
            );
        }
    }
}

/// A subject consumed from another account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub subject: String,
    /// Public key of the exporting account.
    pub account: String,
    /// Activation token for private exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Local subject the import is mapped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub kind: ExportKind,
}

impl Import {
    fn validate(&self, errors: &mut ValidationErrors) {
        if let Err(e) = validate_subject(&self.subject) {
            errors.push("import", e);
        }
        if let Some(to) = &self.to {
            if let Err(e) = validate_subject(to) {
                errors.push("import", e);
            }
        }
        if !crate::crypto::is_public_key_of(&self.account, KeyRole::Account) {
            errors.push(
                "import",
                format!("{:?} is not an account public key", self.account),
            );
        }
    }
}

/// Account-wide limits. `-1` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLimits {
    #[serde(default = "no_limit")]
    pub subs: i64,
    #[serde(default = "no_limit")]
    pub conn: i64,
    #[serde(default = "no_limit")]
    pub imports: i64,
    #[serde(default = "no_limit")]
    pub exports: i64,
    #[serde(default = "no_limit")]
    pub data: i64,
    #[serde(default = "no_limit")]
    pub payload: i64,
    #[serde(default = "yes")]
    pub wildcards: bool,
}

impl Default for AccountLimits {
    fn default() -> Self {
        Self {
            subs: NO_LIMIT,
            conn: NO_LIMIT,
            imports: NO_LIMIT,
            exports: NO_LIMIT,
            data: NO_LIMIT,
            payload: NO_LIMIT,
            wildcards: true,
        }
    }
}

/// Per-user limits. `-1` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLimits {
    #[serde(default = "no_limit")]
    pub subs: i64,
    #[serde(default = "no_limit")]
    pub data: i64,
    #[serde(default = "no_limit")]
    pub payload: i64,
}

impl Default for UserLimits {
    fn default() -> Self {
        Self {
            subs: NO_LIMIT,
            data: NO_LIMIT,
            payload: NO_LIMIT,
        }
    }
}

/// Allow/deny subject lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
}

impl Permission {
    fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPayload {
    #[serde(default)]
    pub limits: AccountLimits,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<Export>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(rename = "pub", default, skip_serializing_if = "Permission::is_empty")]
    pub publish: Permission,
    #[serde(rename = "sub", default, skip_serializing_if = "Permission::is_empty")]
    pub subscribe: Permission,
    #[serde(default)]
    pub limits: UserLimits,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationPayload {
    /// The subject the importing account may use.
    pub subject: String,
    pub kind: ExportKind,
    /// Exporting account, when the token was signed by one of its signing keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_account: Option<String>,
}

/// Kind-specific claim payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClaimPayload {
    Operator(OperatorPayload),
    Account(AccountPayload),
    User(UserPayload),
    Activation(ActivationPayload),
}

/// A claim document: shared envelope plus payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub jti: String,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub iss: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub nats: ClaimPayload,
}

impl Claims {
    /// A blank claim for `subject`. Issuer and id are set when encoded.
    pub fn new(subject: impl Into<String>, name: impl Into<String>, payload: ClaimPayload) -> Self {
        Self {
            jti: String::new(),
            iat: 0,
            iss: String::new(),
            name: name.into(),
            sub: subject.into(),
            nbf: None,
            exp: None,
            nats: payload,
        }
    }

    pub fn operator(subject: &KeyPair, name: &str) -> Self {
        Self::new(
            subject.public_key(),
            name,
            ClaimPayload::Operator(OperatorPayload::default()),
        )
    }

    pub fn account(subject: &KeyPair, name: &str) -> Self {
        Self::new(
            subject.public_key(),
            name,
            ClaimPayload::Account(AccountPayload::default()),
        )
    }

    pub fn user(subject: &KeyPair, name: &str) -> Self {
        Self::new(
            subject.public_key(),
            name,
            ClaimPayload::User(UserPayload::default()),
        )
    }

    pub fn kind(&self) -> ClaimKind {
        match &self.nats {
            ClaimPayload::Operator(_) => ClaimKind::Operator,
            ClaimPayload::Account(_) => ClaimKind::Account,
            ClaimPayload::User(_) => ClaimKind::User,
            ClaimPayload::Activation(_) => ClaimKind::Activation,
        }
    }

    pub fn tags(&self) -> &[String] {
        match &self.nats {
            ClaimPayload::Operator(p) => &p.tags,
            ClaimPayload::Account(p) => &p.tags,
            ClaimPayload::User(p) => &p.tags,
            ClaimPayload::Activation(_) => &[],
        }
    }

    pub fn tags_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.nats {
            ClaimPayload::Operator(p) => Some(&mut p.tags),
            ClaimPayload::Account(p) => Some(&mut p.tags),
            ClaimPayload::User(p) => Some(&mut p.tags),
            ClaimPayload::Activation(_) => None,
        }
    }

    /// Additional keys allowed to sign on behalf of this entity.
    pub fn signing_keys(&self) -> &[String] {
        match &self.nats {
            ClaimPayload::Operator(p) => &p.signing_keys,
            ClaimPayload::Account(p) => &p.signing_keys,
            _ => &[],
        }
    }

    pub fn signing_keys_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.nats {
            ClaimPayload::Operator(p) => Some(&mut p.signing_keys),
            ClaimPayload::Account(p) => Some(&mut p.signing_keys),
            _ => None,
        }
    }

    /// True when `public_key` may sign claims on behalf of this entity.
    pub fn is_valid_signer(&self, public_key: &str) -> bool {
        self.sub == public_key || self.signing_keys().iter().any(|k| k == public_key)
    }

    pub fn as_account(&self) -> Option<&AccountPayload> {
        match &self.nats {
            ClaimPayload::Account(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_account_mut(&mut self) -> Option<&mut AccountPayload> {
        match &mut self.nats {
            ClaimPayload::Account(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&UserPayload> {
        match &self.nats {
            ClaimPayload::User(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_user_mut(&mut self) -> Option<&mut UserPayload> {
        match &mut self.nats {
            ClaimPayload::User(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_activation(&self) -> Option<&ActivationPayload> {
        match &self.nats {
            ClaimPayload::Activation(p) => Some(p),
            _ => None,
        }
    }

    /// Check semantic invariants, collecting every violation.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let kind = self.kind();

        match KeyPair::from_public_key(&self.sub) {
            Ok(kp) if kp.role() == kind.subject_role() => {}
            _ => errors.push(
                "subject",
                format!("{kind} subject must be a {} public key", kind.subject_role()),
            ),
        }

        if let (Some(nbf), Some(exp)) = (self.nbf, self.exp) {
            if exp < nbf {
                errors.push("expiry", "expiry cannot be before start");
            }
        }

        for key in self.signing_keys() {
            if !crate::crypto::is_public_key_of(key, kind.subject_role()) {
                errors.push(
                    "signing key",
                    format!("{key:?} is not a {} public key", kind.subject_role()),
                );
            }
        }

        match &self.nats {
            ClaimPayload::Account(p) => {
                let l = &p.limits;
                for (field, v) in [
                    ("subs", l.subs),
                    ("conns", l.conn),
                    ("imports", l.imports),
                    ("exports", l.exports),
                    ("data", l.data),
                    ("payload", l.payload),
                ] {
                    check_limit(&mut errors, field, v);
                }
                for export in &p.exports {
                    export.validate(&mut errors);
                    if !l.wildcards && is_wildcard(&export.subject) {
                        errors.push(
                            "export",
                            format!("wildcard export {:?} is not allowed", export.subject),
                        );
                    }
                }
                for import in &p.imports {
                    import.validate(&mut errors);
                }
            }
            ClaimPayload::User(p) => {
                for (field, v) in [
                    ("subs", p.limits.subs),
                    ("data", p.limits.data),
                    ("payload", p.limits.payload),
                ] {
                    check_limit(&mut errors, field, v);
                }
                for s in p
                    .publish
                    .allow
                    .iter()
                    .chain(&p.publish.deny)
                    .chain(&p.subscribe.allow)
                    .chain(&p.subscribe.deny)
                {
                    if let Err(e) = validate_subject(s) {
                        errors.push("permissions", e);
                    }
                }
            }
            ClaimPayload::Activation(p) => {
                if let Err(e) = validate_subject(&p.subject) {
                    errors.push("subject", e);
                }
            }
            ClaimPayload::Operator(_) => {}
        }

        errors
    }
}

fn check_limit(errors: &mut ValidationErrors, field: &str, value: i64) {
    if value < NO_LIMIT {
        errors.push(
            field,
            format!("{value} is not a valid limit (use -1 for unlimited)"),
        );
    }
}

/// Lower-case, trim and de-duplicate tags. Empty tags are dropped.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
