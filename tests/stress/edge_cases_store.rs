//! Edge case tests: key tampering, name resolution, stale signers,
//! corrupted files and validity windows.

use nsc_core::jwt::{subject_contains, Export, ExportKind};
use nsc_core::{
    AddOptions, ClaimEdit, Claims, EntityRef, ErrorKind, FixedClock, KeyPair, KeyRole, KeyStore,
    Level, TrustStore,
};

const NOW: FixedClock = FixedClock(1_700_000_000);

fn store(dir: &std::path::Path) -> TrustStore {
    TrustStore::create(dir.join("stores"), KeyStore::new(dir.join("nkeys"))).unwrap()
}

// === Key Edge Cases ===

#[test]
fn edge_flipped_character_fails_checksum() {
    let kp = KeyPair::generate(KeyRole::Account);
    let public = kp.public_key();
    let mut chars: Vec<char> = public.chars().collect();
    let i = chars.len() / 2;
    chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();
    assert!(KeyPair::from_public_key(&tampered).is_err());
}

#[test]
fn edge_seed_and_public_key_of_wrong_role() {
    let user = KeyPair::generate(KeyRole::User);
    let seed = user.seed().unwrap();
    assert!(seed.starts_with("SU"));
    let decoded = KeyPair::decode(&seed).unwrap();
    assert_eq!(decoded.role(), KeyRole::User);
    assert_eq!(decoded.public_key(), user.public_key());

    // A public-only copy verifies but cannot sign.
    let public = KeyPair::from_public_key(&user.public_key()).unwrap();
    assert!(!public.can_sign());
    let sig = user.sign(b"hello").unwrap();
    public.verify(b"hello", &sig).unwrap();
    assert!(public.verify(b"hullo", &sig).is_err());
    assert!(KeyPair::from_public_key(&seed).is_err());
}

#[test]
fn edge_tampered_token_rejected() {
    let op = KeyPair::generate(KeyRole::Operator);
    let mut claims = Claims::operator(&op, "O");
    let token = claims.encode(&op, NOW.0).unwrap();

    let mut parts: Vec<&str> = token.split('.').collect();
    let other = {
        let mut c = Claims::operator(&op, "evil");
        c.encode(&op, NOW.0).unwrap()
    };
    let other_payload = other.split('.').nth(1).unwrap().to_string();
    parts[1] = &other_payload;
    let spliced = parts.join(".");
    assert!(Claims::decode(&spliced).is_err());
}

// === Store Edge Cases ===

#[test]
fn edge_public_key_prefix_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();
    let a = store.add_account("O", &AddOptions::named("alpha"), &NOW).unwrap();

    assert_eq!(store.resolve_account("O", "alpha").unwrap(), "alpha");
    assert_eq!(store.resolve_account("O", &a.sub[..12]).unwrap(), "alpha");
    let err = store.resolve_account("O", "nope").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Every account key starts with 'A', so the bare letter is ambiguous
    // as soon as there are two.
    store.add_account("O", &AddOptions::named("beta"), &NOW).unwrap();
    let err = store.resolve_account("O", "A").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousReference);
}

#[test]
fn edge_removed_signing_key_blocks_resign() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();

    let osk = KeyPair::generate(KeyRole::Operator);
    let op = EntityRef::operator("O");
    store
        .edit_claim(&op, &[ClaimEdit::AddSigningKey(osk.public_key())], None, &NOW)
        .unwrap();
    let opts = AddOptions {
        signer: Some(osk.clone()),
        ..AddOptions::named("A")
    };
    store.add_account("O", &opts, &NOW).unwrap();
    store
        .edit_claim(&op, &[ClaimEdit::RemoveSigningKey(osk.public_key())], None, &NOW)
        .unwrap();

    let acct = EntityRef::account("O", "A");
    assert!(store.verify_chain(&acct).is_err());
    let err = store
        .edit_claim(&acct, &[ClaimEdit::AddTags(vec!["x".into()])], None, &NOW)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SigningKeyUnavailable);

    // Re-signing with the operator's own key repairs the chain.
    let op_key = store
        .keys()
        .signing_key(&store.read_claim(&op).unwrap().sub)
        .unwrap();
    store
        .edit_claim(&acct, &[ClaimEdit::AddTags(vec!["x".into()])], Some(&op_key), &NOW)
        .unwrap();
    store.verify_chain(&acct).unwrap();
}

#[test]
fn edge_corrupted_claim_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();
    store.add_account("O", &AddOptions::named("A"), &NOW).unwrap();

    let path = dir
        .path()
        .join("stores/O/accounts/A/A.jwt");
    assert!(path.is_file(), "claim file layout changed: {}", path.display());
    std::fs::write(&path, "not a token").unwrap();

    let err = store.read_claim(&EntityRef::account("O", "A")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn edge_validity_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();

    let opts = AddOptions {
        start: "2h".into(),
        expiry: "1w".into(),
        ..AddOptions::named("A")
    };
    let a = store.add_account("O", &opts, &NOW).unwrap();
    assert_eq!(a.nbf, Some(NOW.0 + 2 * 3600));
    assert_eq!(a.exp, Some(NOW.0 + 7 * 86_400));

    let opts = AddOptions {
        start: "1w".into(),
        expiry: "2h".into(),
        ..AddOptions::named("B")
    };
    assert_eq!(
        store.add_account("O", &opts, &NOW).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert!(!store.exists(&EntityRef::account("O", "B")));
}

#[test]
fn edge_wildcard_export_rules() {
    assert!(subject_contains("a.>", "a.b.c"));
    assert!(subject_contains("a.*", "a.b"));
    assert!(!subject_contains("a.*", "a.b.c"));
    assert!(!subject_contains("a.b", "a.>"));

    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();
    store.add_account("O", &AddOptions::named("A"), &NOW).unwrap();
    let acct = EntityRef::account("O", "A");

    let err = store
        .edit_claim(
            &acct,
            &[
                ClaimEdit::Wildcards(false),
                ClaimEdit::AddExport(Export::new("x.>", ExportKind::Stream, false)),
            ],
            None,
            &NOW,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = store
        .edit_claim(
            &acct,
            &[ClaimEdit::AddExport(Export::new("x.>.y", ExportKind::Stream, false))],
            None,
            &NOW,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(Level::Account.as_str(), "account");
}
