//! Integration test: private exports, activation tokens and imports.
//!
//! An exporting account declares a private export, signs an activation for
//! an importing account, and the importer turns the token into an import.

use nsc_core::activation::{import_from_token, read_token_source};
use nsc_core::jwt::{Export, ExportKind};
use nsc_core::{
    generate_activation, ActivationRequest, AddOptions, ClaimEdit, Claims, EntityRef, ErrorKind,
    FixedClock, KeyPair, KeyRole, KeyStore, NscError, TrustStore,
};

const NOW: FixedClock = FixedClock(1_700_000_000);

/// Operator `O` with exporter `A` and importer `B`.
fn setup(dir: &std::path::Path) -> (TrustStore, Claims, Claims) {
    let store = TrustStore::create(dir.join("stores"), KeyStore::new(dir.join("nkeys"))).unwrap();
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();
    let a = store.add_account("O", &AddOptions::named("A"), &NOW).unwrap();
    let b = store.add_account("O", &AddOptions::named("B"), &NOW).unwrap();
    (store, a, b)
}

fn add_export(store: &TrustStore, account: &str, export: Export) {
    store
        .edit_claim(
            &EntityRef::account("O", account),
            &[ClaimEdit::AddExport(export)],
            None,
            &NOW,
        )
        .expect("export should be added");
}

fn request(account: &str, subject: Option<&str>, target: &str) -> ActivationRequest {
    ActivationRequest {
        account: Some(account.to_string()),
        subject: subject.map(str::to_string),
        target_account: target.to_string(),
        ..ActivationRequest::default()
    }
}

#[test]
fn activation_to_import_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let (store, a, b) = setup(dir.path());
    add_export(&store, "A", Export::new("orders.>", ExportKind::Stream, true));

    // ── Generate for a narrower subject, written to a file ──────────────
    let out = dir.path().join("orders.jwt");
    let req = ActivationRequest {
        output: Some(out.clone()),
        expiry: "30d".into(),
        ..request("A", Some("orders.eu"), &b.sub)
    };
    let activation = generate_activation(&store, "O", &req, &NOW).unwrap();
    assert_eq!(activation.account, "A");
    assert_eq!(activation.claims.iss, a.sub);
    assert_eq!(activation.claims.sub, b.sub);
    assert_eq!(activation.claims.exp, Some(1_700_000_000 + 30 * 86_400));
    let payload = activation.claims.as_activation().unwrap();
    assert_eq!(payload.subject, "orders.eu");
    assert_eq!(payload.kind, ExportKind::Stream);

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("-----BEGIN NATS ACTIVATION JWT-----"));
    assert!(text.contains("------END NATS ACTIVATION JWT------"));

    // ── Import it into B ────────────────────────────────────────────────
    let token = read_token_source(out.to_str().unwrap()).unwrap();
    assert_eq!(token, activation.token);
    let import = import_from_token(&token, &b.sub, NOW.0).unwrap();
    assert_eq!(import.account, a.sub);
    assert_eq!(import.subject, "orders.eu");

    let b_entity = EntityRef::account("O", "B");
    store
        .edit_claim(&b_entity, &[ClaimEdit::AddImport(import)], None, &NOW)
        .unwrap();
    let b = store.verify_chain(&b_entity).unwrap();
    assert_eq!(b.as_account().unwrap().imports.len(), 1);

    // Another account cannot use B's token.
    let c = store.add_account("O", &AddOptions::named("C"), &NOW).unwrap();
    let err = import_from_token(&token, &c.sub, NOW.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Nor can B once it has expired.
    let later = NOW.0 + 31 * 86_400;
    assert!(import_from_token(&token, &b.sub, later).is_err());
}

#[test]
fn activation_single_private_export_defaults_subject() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _a, b) = setup(dir.path());
    add_export(&store, "A", Export::new("foo.>", ExportKind::Service, true));
    add_export(&store, "A", Export::new("public.>", ExportKind::Stream, false));

    let activation = generate_activation(&store, "O", &request("A", None, &b.sub), &NOW).unwrap();
    let payload = activation.claims.as_activation().unwrap();
    assert_eq!(payload.subject, "foo.>");
    assert_eq!(payload.kind, ExportKind::Service);
}

#[test]
fn activation_error_cases() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _a, b) = setup(dir.path());

    let err = generate_activation(&store, "O", &request("A", None, &b.sub), &NOW).unwrap_err();
    assert!(matches!(err, NscError::NoExports(_)));
    assert_eq!(err.to_string(), "account \"A\" doesn't have exports");

    add_export(&store, "A", Export::new("pub", ExportKind::Stream, false));
    let err = generate_activation(&store, "O", &request("A", None, &b.sub), &NOW).unwrap_err();
    assert_eq!(
        err.to_string(),
        "account \"A\" doesn't have exports that require token generation"
    );

    add_export(&store, "A", Export::new("priv.*", ExportKind::Stream, true));
    let err = generate_activation(&store, "O", &request("A", Some("other.x"), &b.sub), &NOW)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SubjectNotContained);

    let err = generate_activation(&store, "O", &request("A", Some("priv.x"), ""), &NOW).unwrap_err();
    assert!(err.to_string().contains("target-account cannot be empty"));

    let user_key = KeyPair::generate(KeyRole::User).public_key();
    let err =
        generate_activation(&store, "O", &request("A", Some("priv.x"), &user_key), &NOW).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyRoleMismatch);
}

#[test]
fn activation_signed_by_account_signing_key() {
    let dir = tempfile::tempdir().unwrap();
    let (store, a, b) = setup(dir.path());
    add_export(&store, "A", Export::new("svc", ExportKind::Service, true));

    let ask = KeyPair::generate(KeyRole::Account);
    store
        .edit_claim(
            &EntityRef::account("O", "A"),
            &[ClaimEdit::AddSigningKey(ask.public_key())],
            None,
            &NOW,
        )
        .unwrap();

    let req = ActivationRequest {
        signer: Some(ask.clone()),
        ..request("A", Some("svc"), &b.sub)
    };
    let activation = generate_activation(&store, "O", &req, &NOW).unwrap();
    assert_eq!(activation.claims.iss, ask.public_key());

    // The import still points at the exporting account.
    let import = import_from_token(&activation.token, &b.sub, NOW.0).unwrap();
    assert_eq!(import.account, a.sub);

    // A key the account never delegated to is refused.
    let stranger = KeyPair::generate(KeyRole::Account);
    let req = ActivationRequest {
        signer: Some(stranger),
        ..request("A", Some("svc"), &b.sub)
    };
    assert!(generate_activation(&store, "O", &req, &NOW).is_err());
}
