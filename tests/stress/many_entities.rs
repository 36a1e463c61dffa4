//! Scale test: many accounts, users, keys and activations in one store.
//!
//! Validates that listing, resolution and chain verification stay correct
//! as the store grows.

use std::collections::HashSet;

use nsc_core::jwt::{Export, ExportKind};
use nsc_core::{
    generate_activation, ActivationRequest, AddOptions, ClaimEdit, Claims, EntityRef, FixedClock,
    KeyPair, KeyRole, KeyStore, TrustStore,
};

const NOW: FixedClock = FixedClock(1_700_000_000);

#[test]
fn stress_1k_keys_unique_and_decodable() {
    let mut seen = HashSet::new();
    for i in 0..1_000 {
        let role = match i % 3 {
            0 => KeyRole::Operator,
            1 => KeyRole::Account,
            _ => KeyRole::User,
        };
        let kp = KeyPair::generate(role);
        let public = kp.public_key();
        assert!(seen.insert(public.clone()), "duplicate key generated");

        let back = KeyPair::from_seed(&kp.seed().unwrap()).unwrap();
        assert_eq!(back.public_key(), public);
        assert_eq!(back.role(), role);
    }
}

#[test]
fn stress_50_accounts_10_users_each() {
    let dir = tempfile::tempdir().unwrap();
    let store = TrustStore::create(dir.path().join("stores"), KeyStore::new(dir.path().join("nkeys")))
        .unwrap();
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();

    for a in 0..50 {
        let account = format!("acct-{a:02}");
        store.add_account("O", &AddOptions::named(&account), &NOW).unwrap();
        for u in 0..10 {
            store
                .add_user("O", &account, &AddOptions::named(format!("user-{u}")), &NOW)
                .unwrap();
        }
    }

    let accounts = store.list_accounts("O").unwrap();
    assert_eq!(accounts.len(), 50);
    assert_eq!(accounts[0], "acct-00");
    assert_eq!(accounts[49], "acct-49");

    for account in &accounts {
        let users = store.list_users("O", account).unwrap();
        assert_eq!(users.len(), 10);
        for user in &users {
            store
                .verify_chain(&EntityRef::user("O", account, user))
                .unwrap_or_else(|e| panic!("{account}/{user} should verify: {e}"));
        }
    }

    // One operator, 50 accounts and 500 users, each with its seed.
    let keys = store.keys().list().unwrap();
    assert_eq!(keys.len(), 551);
    assert!(keys.iter().all(|k| k.has_seed));
}

#[test]
fn stress_100_activations_from_one_export() {
    let dir = tempfile::tempdir().unwrap();
    let store = TrustStore::create(dir.path().join("stores"), KeyStore::new(dir.path().join("nkeys")))
        .unwrap();
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();
    store.add_account("O", &AddOptions::named("A"), &NOW).unwrap();
    store
        .edit_claim(
            &EntityRef::account("O", "A"),
            &[ClaimEdit::AddExport(Export::new("data.>", ExportKind::Stream, true))],
            None,
            &NOW,
        )
        .unwrap();

    let mut ids = HashSet::new();
    for i in 0..100 {
        let target = KeyPair::generate(KeyRole::Account).public_key();
        let req = ActivationRequest {
            account: Some("A".into()),
            subject: Some(format!("data.tenant{i}")),
            target_account: target.clone(),
            ..ActivationRequest::default()
        };
        let activation = generate_activation(&store, "O", &req, &NOW).unwrap();
        let decoded = Claims::decode(&activation.token).unwrap();
        assert_eq!(decoded.sub, target);
        assert!(ids.insert(decoded.jti), "activation ids must be unique");
    }
}
