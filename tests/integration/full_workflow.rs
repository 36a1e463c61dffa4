//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Create an operator, accounts and users
//! 2. Delegate signing to an operator signing key
//! 3. Edit claims and re-sign them
//! 4. Verify every chain from disk
//! 5. Export user credentials and reload the seed

use nsc_core::editor::{AccountLimit, Direction};
use nsc_core::jwt::{extract_seed, extract_token, Export, ExportKind, NO_LIMIT};
use nsc_core::{
    AddOptions, ClaimEdit, Claims, Config, EntityRef, ErrorKind, FixedClock, KeyPair, KeyRole,
    KeyStore, Level, TrustStore,
};

const NOW: FixedClock = FixedClock(1_700_000_000);

fn open_store(dir: &std::path::Path) -> TrustStore {
    TrustStore::create(dir.join("stores"), KeyStore::new(dir.join("nkeys")))
        .expect("store should be created")
}

#[test]
fn full_workflow_operator_to_creds() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());

    // ── Step 1: Create operator, account and user ───────────────────────
    let op = store
        .add_operator(&AddOptions::named("acme"), &NOW)
        .expect("operator should be added");
    assert!(op.sub.starts_with('O'));
    assert_eq!(op.iss, op.sub, "operators are self-signed");

    let acct = store
        .add_account("acme", &AddOptions::named("billing"), &NOW)
        .expect("account should be added");
    assert!(acct.sub.starts_with('A'));
    assert_eq!(acct.iss, op.sub);

    let user = store
        .add_user("acme", "billing", &AddOptions::named("svc"), &NOW)
        .expect("user should be added");
    assert!(user.sub.starts_with('U'));
    assert_eq!(user.iss, acct.sub);

    let selection = store.current().unwrap();
    assert_eq!(selection.operator.as_deref(), Some("acme"));
    assert_eq!(selection.account.as_deref(), Some("billing"));

    // ── Step 2: Delegate to an operator signing key ─────────────────────
    let osk = KeyPair::generate(KeyRole::Operator);
    store
        .edit_claim(
            &EntityRef::operator("acme"),
            &[ClaimEdit::AddSigningKey(osk.public_key())],
            None,
            &NOW,
        )
        .expect("signing key should be added");

    let opts = AddOptions {
        signer: Some(osk.clone()),
        ..AddOptions::named("ops")
    };
    let ops = store.add_account("acme", &opts, &NOW).unwrap();
    assert_eq!(ops.iss, osk.public_key());
    store
        .verify_chain(&EntityRef::account("acme", "ops"))
        .expect("account signed by an operator signing key should verify");

    // ── Step 3: Edit claims ─────────────────────────────────────────────
    let billing = EntityRef::account("acme", "billing");
    let edited = store
        .edit_claim(
            &billing,
            &[
                ClaimEdit::AccountLimit(AccountLimit::Conns, "10".into()),
                ClaimEdit::AccountLimit(AccountLimit::Data, "1M".into()),
                ClaimEdit::AddExport(Export::new("billing.>", ExportKind::Stream, false)),
                ClaimEdit::AddTags(vec!["Prod".into()]),
            ],
            None,
            &NOW,
        )
        .expect("edit should succeed");
    let payload = edited.as_account().unwrap();
    assert_eq!(payload.limits.conn, 10);
    assert_eq!(payload.limits.data, 1_000_000);
    assert_eq!(payload.limits.subs, NO_LIMIT);
    assert_eq!(payload.exports.len(), 1);
    assert_eq!(edited.tags(), ["prod"]);
    assert_ne!(edited.jti, acct.jti, "re-signing produces a new id");

    let svc = EntityRef::user("acme", "billing", "svc");
    let edited = store
        .edit_claim(
            &svc,
            &[
                ClaimEdit::Allow(Direction::Publish, vec!["billing.in".into()]),
                ClaimEdit::Deny(Direction::Subscribe, vec!["admin.>".into()]),
            ],
            None,
            &NOW,
        )
        .unwrap();
    let perms = edited.as_user().unwrap();
    assert_eq!(perms.publish.allow, ["billing.in"]);
    assert_eq!(perms.subscribe.deny, ["admin.>"]);

    // ── Step 4: Verify every chain from disk ────────────────────────────
    for entity in [
        EntityRef::operator("acme"),
        billing.clone(),
        EntityRef::account("acme", "ops"),
        svc.clone(),
    ] {
        store
            .verify_chain(&entity)
            .unwrap_or_else(|e| panic!("{entity} should verify: {e}"));
    }
    assert_eq!(store.list_accounts("acme").unwrap(), ["billing", "ops"]);
    assert_eq!(store.list_users("acme", "billing").unwrap(), ["svc"]);

    // ── Step 5: Export creds and reload ─────────────────────────────────
    let creds = store.export_user_creds("acme", "billing", "svc").unwrap();
    assert!(creds.starts_with("-----BEGIN NATS USER JWT-----"));
    let token = extract_token(&creds);
    let claims = Claims::decode(&token).expect("creds token should decode");
    assert_eq!(claims.sub, user.sub);

    let seed = extract_seed(&creds).expect("creds carry a seed");
    let kp = KeyPair::from_seed(&seed).unwrap();
    assert_eq!(kp.public_key(), user.sub);
}

#[test]
fn full_workflow_reopen_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        store_root: Some(dir.path().join("stores")),
        keys_dir: Some(dir.path().join("nkeys")),
        operator: None,
    };
    assert_eq!(config.open_store().unwrap_err().kind(), ErrorKind::NotFound);

    {
        let store = config.create_store().unwrap();
        store.add_operator(&AddOptions::named("O"), &NOW).unwrap();
        store.add_account("O", &AddOptions::named("A"), &NOW).unwrap();
    }

    let store = config.open_store().expect("store should reopen");
    assert_eq!(store.list_operators().unwrap(), ["O"]);
    assert_eq!(store.current_operator().unwrap(), "O");
    assert_eq!(store.current_account("O").unwrap(), "A");

    // The account key survived in the key store, so users can be added.
    store.add_user("O", "A", &AddOptions::named("U"), &NOW).unwrap();
    store.verify_chain(&EntityRef::user("O", "A", "U")).unwrap();
    assert_eq!(store.store_info("O").unwrap().name, "O");
    assert_eq!(EntityRef::user("O", "A", "U").level(), Level::User);
}

#[test]
fn full_workflow_operator_less_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());

    store.init_store("local").unwrap();
    assert!(!store.store_info("local").unwrap().has_operator);

    let acct = store
        .add_account("local", &AddOptions::named("A"), &NOW)
        .unwrap();
    assert_eq!(acct.iss, acct.sub, "accounts without an operator sign themselves");

    store.add_user("local", "A", &AddOptions::named("U"), &NOW).unwrap();
    store.verify_chain(&EntityRef::user("local", "A", "U")).unwrap();
}
