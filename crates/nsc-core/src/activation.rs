//! Activation tokens.
//!
//! An activation lets one named account import a private export of another.
//! Its subject is the importing account's public key, its issuer the
//! exporting account (or one of that account's signing keys), and its
//! payload the subject being granted.

use std::path::{Path, PathBuf};

use crate::crypto::keys::{KeyPair, KeyRole};
use crate::error::{NscError, Result, ValidationErrors};
use crate::jwt::armor::{extract_token, format_jwt};
use crate::jwt::claims::{ActivationPayload, ClaimKind, ClaimPayload, Claims, Export, Import};
use crate::jwt::subject::subject_contains;
use crate::remote;
use crate::resolver::resolve_key;
use crate::storage::fs::write_plain;
use crate::storage::{EntityRef, TrustStore};
use crate::time::{parse_expiry, Clock};

/// A signed activation and the claim it encodes.
#[derive(Debug, Clone)]
pub struct Activation {
    /// Name of the exporting account.
    pub account: String,
    pub token: String,
    pub claims: Claims,
}

impl Activation {
    /// The token framed for humans and other tools.
    pub fn armored(&self) -> String {
        format_jwt(ClaimKind::Activation.as_str(), &self.token)
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Builder for a single activation claim.
pub struct ActivationBuilder {
    export: Export,
    target: String,
    subject: Option<String>,
    start: String,
    expiry: String,
}

impl ActivationBuilder {
    /// Start an activation of `export` for the account `target`.
    pub fn new(export: &Export, target: impl Into<String>) -> Self {
        Self {
            export: export.clone(),
            target: target.into(),
            subject: None,
            start: String::new(),
            expiry: String::new(),
        }
    }

    /// Narrow the granted subject. Defaults to the export subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = start.into();
        self
    }

    pub fn expiry(mut self, expiry: impl Into<String>) -> Self {
        self.expiry = expiry.into();
        self
    }

    /// Sign the activation.
    ///
    /// `issuer_account` is the exporting account's public key; it is recorded
    /// in the token when `issuer` is one of its signing keys.
    ///
    /// # Errors
    ///
    /// Returns `NscError::SubjectNotContained` when the requested subject is
    /// not the export subject or narrower, and `NscError::Validation` for a
    /// bad target or validity window.
    pub fn sign(self, issuer: &KeyPair, issuer_account: &str, now: i64) -> Result<Activation> {
        let subject = self
            .subject
            .unwrap_or_else(|| self.export.subject.clone());
        if !subject_contains(&self.export.subject, &subject) {
            return Err(NscError::SubjectNotContained {
                subject,
                export: self.export.subject,
            });
        }

        let mut errors = ValidationErrors::new();
        if !crate::crypto::is_public_key_of(&self.target, KeyRole::Account) {
            errors.push(
                "target-account",
                format!("{:?} is not an account public key", self.target),
            );
        }
        let nbf = parse_expiry("start", &self.start, now).unwrap_or_else(|e| {
            collect(&mut errors, e);
            None
        });
        let exp = parse_expiry("expiry", &self.expiry, now).unwrap_or_else(|e| {
            collect(&mut errors, e);
            None
        });
        if exp.is_some_and(|exp| exp < now) {
            errors.push(
                "expiry",
                format!("expiry {:?} is in the past", self.expiry.trim()),
            );
        }
        errors.into_result()?;

        let issuer_account = (issuer.public_key() != issuer_account)
            .then(|| issuer_account.to_string());
        let mut claims = Claims::new(
            self.target,
            subject.clone(),
            ClaimPayload::Activation(ActivationPayload {
                subject,
                kind: self.export.kind,
                issuer_account,
            }),
        );
        claims.nbf = nbf;
        claims.exp = exp;

        let token = claims.encode(issuer, now)?;
        Ok(Activation {
            account: String::new(),
            token,
            claims,
        })
    }
}

fn collect(errors: &mut ValidationErrors, err: NscError) {
    match err {
        NscError::Validation(batch) => errors.extend(batch),
        other => errors.push("activation", other.to_string()),
    }
}

// ── Generation from a store ───────────────────────────────────────────────────

/// Inputs for [`generate_activation`].
#[derive(Debug, Clone, Default)]
pub struct ActivationRequest {
    /// Exporting account name or public key prefix. Defaults to the current
    /// account, or the only one.
    pub account: Option<String>,
    /// Export subject, or a narrower subject of a wildcard export.
    pub subject: Option<String>,
    /// Importing account: public key, or a file holding one.
    pub target_account: String,
    pub start: String,
    pub expiry: String,
    /// Explicit signer; otherwise the account key from the key store.
    pub signer: Option<KeyPair>,
    /// Also write the armored token to this file.
    pub output: Option<PathBuf>,
}

/// Resolve the exporting account, export and target, then sign an
/// activation.
///
/// # Errors
///
/// - `NscError::NoExports` when the account declares no exports.
/// - `NscError::NoTokenRequiringExports` when every export is public.
/// - `NscError::SubjectNotContained` when the subject is outside the export.
/// - `NscError::Validation` for a missing target or ambiguous export.
/// - Key errors when the account key is unavailable.
pub fn generate_activation(
    store: &TrustStore,
    operator: &str,
    req: &ActivationRequest,
    clock: &dyn Clock,
) -> Result<Activation> {
    let now = clock.now();
    let account = match req.account.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(reference) => store.resolve_account(operator, reference)?,
        None => store.current_account(operator)?,
    };
    let claims = store.read_claim(&EntityRef::account(operator, &account))?;
    let exports = claims
        .as_account()
        .map(|a| a.exports.as_slice())
        .unwrap_or_default();
    if exports.is_empty() {
        return Err(NscError::NoExports(account));
    }
    let private: Vec<&Export> = exports.iter().filter(|e| e.token_req).collect();
    if private.is_empty() {
        return Err(NscError::NoTokenRequiringExports(account));
    }

    let (export, subject) = select_export(&private, req.subject.as_deref())?;
    let target = resolve_target(&req.target_account)?;

    let signer = match &req.signer {
        Some(s) => {
            if s.role() != KeyRole::Account {
                return Err(NscError::KeyRoleMismatch {
                    expected: KeyRole::Account.to_string(),
                    actual: s.role().to_string(),
                });
            }
            if !claims.is_valid_signer(&s.public_key()) {
                return Err(NscError::validation(
                    "signing key",
                    format!("{} is not a valid signer for account {account:?}", s.public_key()),
                ));
            }
            s.clone()
        }
        None => store.keys().signing_key(&claims.sub)?,
    };

    let mut activation = ActivationBuilder::new(export, target)
        .subject(subject)
        .start(req.start.as_str())
        .expiry(req.expiry.as_str())
        .sign(&signer, &claims.sub, now)?;
    activation.account = account;

    if let Some(path) = &req.output {
        write_plain(path, activation.armored().as_bytes())?;
        log::info!("wrote activation to {}", path.display());
    }
    log::info!(
        "generated activation of {:?} from account {} for {}",
        export.subject,
        activation.account,
        activation.claims.sub
    );
    Ok(activation)
}

/// Pick the export to activate and the subject to grant.
///
/// Without a subject the single private export is used verbatim. A subject
/// selects the export with that exact subject, or the one wildcard export
/// containing it.
fn select_export<'a>(private: &[&'a Export], subject: Option<&str>) -> Result<(&'a Export, String)> {
    let Some(subject) = subject.map(str::trim).filter(|s| !s.is_empty()) else {
        return match private {
            [only] => Ok((*only, only.subject.clone())),
            _ => Err(NscError::validation(
                "subject",
                "a subject is required when an account has several private exports",
            )),
        };
    };

    if let Some(exact) = private.iter().find(|e| e.subject == subject) {
        return Ok((*exact, subject.to_string()));
    }
    let containing: Vec<&'a Export> = private
        .iter()
        .copied()
        .filter(|e| subject_contains(&e.subject, subject))
        .collect();
    match (containing.as_slice(), private) {
        ([one], _) => Ok((*one, subject.to_string())),
        ([], [only]) => Err(NscError::SubjectNotContained {
            subject: subject.to_string(),
            export: only.subject.clone(),
        }),
        ([], _) => Err(NscError::NotFound(format!(
            "no private export matches subject {subject:?}"
        ))),
        (many, _) => Err(NscError::AmbiguousReference {
            level: "export".into(),
            reference: subject.to_string(),
            candidates: many.iter().map(|e| e.subject.clone()).collect(),
        }),
    }
}

fn resolve_target(source: &str) -> Result<String> {
    if source.trim().is_empty() {
        return Err(NscError::validation(
            "target-account",
            "target-account cannot be empty",
        ));
    }
    match resolve_key(Some(source), KeyRole::Account)? {
        Some(kp) => Ok(kp.public_key()),
        None => Err(NscError::validation(
            "target-account",
            "target-account cannot be empty",
        )),
    }
}

// ── Importing ─────────────────────────────────────────────────────────────────

/// Load a token given inline, as a file path or as an `http(s)` URL.
pub fn read_token_source(source: &str) -> Result<String> {
    let source = source.trim();
    let text = if remote::is_url(source) {
        let bytes = remote::load_from_url(source)?;
        String::from_utf8(bytes)
            .map_err(|_| NscError::InvalidFileFormat(format!("{source} is not valid UTF-8")))?
    } else if Path::new(source).is_file() {
        std::fs::read_to_string(source)?
    } else {
        source.to_string()
    };
    Ok(extract_token(&text))
}

/// Turn an activation token into an import for the account `importer`.
///
/// # Errors
///
/// Returns a validation error when the token is not an activation, was
/// issued for a different account, or has expired.
pub fn import_from_token(token: &str, importer: &str, now: i64) -> Result<Import> {
    let token = token.trim();
    let claims = Claims::decode(token)?;
    let Some(activation) = claims.as_activation() else {
        return Err(NscError::validation(
            "token",
            format!("expected an activation token, found a {} token", claims.kind()),
        ));
    };

    let mut errors = ValidationErrors::new();
    if claims.sub != importer {
        errors.push(
            "token",
            format!("activation was issued to {}, not {importer}", claims.sub),
        );
    }
    if claims.exp.is_some_and(|exp| exp < now) {
        errors.push("token", "activation has expired");
    }
    errors.into_result()?;
    if let Some(nbf) = claims.nbf.filter(|&nbf| nbf > now) {
        // Early imports are kept; only expiry is an error.
        log::warn!(
            "activation for {} is not valid until {}",
            activation.subject,
            crate::time::describe(Some(nbf), "")
        );
    }

    Ok(Import {
        name: activation.subject.clone(),
        subject: activation.subject.clone(),
        account: activation
            .issuer_account
            .clone()
            .unwrap_or_else(|| claims.iss.clone()),
        token: Some(token.to_string()),
        to: None,
        kind: activation.kind,
    })
}
