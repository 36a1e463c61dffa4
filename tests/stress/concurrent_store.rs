//! Concurrency and partial-failure tests: several threads adding entities
//! to one store, and adds that fail part way through.

use std::thread;

use nsc_core::{
    AddOptions, ClaimEdit, EntityRef, ErrorKind, FixedClock, KeyStore, TrustStore,
};

const NOW: FixedClock = FixedClock(1_700_000_000);
const THREADS: usize = 8;
const ROUNDS: usize = 5;

fn store_with_operator(dir: &std::path::Path) -> TrustStore {
    let store = TrustStore::create(dir.join("stores"), KeyStore::new(dir.join("nkeys"))).unwrap();
    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();
    store
}

fn leftover_temp_files(dir: &std::path::Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(d) = pending.pop() {
        for entry in std::fs::read_dir(&d).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if path.is_dir() {
                pending.push(path);
            } else if name.starts_with(".tmp") || name.ends_with(".tmp") {
                found.push(path.display().to_string());
            }
        }
    }
    found
}

// === Concurrent Adds ===

#[test]
fn stress_parallel_add_account() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_operator(dir.path());

    thread::scope(|s| {
        for t in 0..THREADS {
            let store = &store;
            s.spawn(move || {
                for r in 0..ROUNDS {
                    let name = format!("acct-{t}-{r}");
                    store
                        .add_account("O", &AddOptions::named(&name), &NOW)
                        .unwrap_or_else(|e| panic!("adding {name} failed: {e}"));
                }
            });
        }
    });

    let accounts = store.list_accounts("O").unwrap();
    assert_eq!(accounts.len(), THREADS * ROUNDS);
    for account in &accounts {
        store.verify_chain(&EntityRef::account("O", account)).unwrap();
    }

    // Whichever add finished last owns the selection, and it is readable.
    let sel = store.current().unwrap();
    assert_eq!(sel.operator.as_deref(), Some("O"));
    assert!(accounts.contains(&sel.account.unwrap()));
    assert!(leftover_temp_files(dir.path()).is_empty());
}

#[test]
fn stress_parallel_add_user_same_account() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_operator(dir.path());
    store.add_account("O", &AddOptions::named("A"), &NOW).unwrap();

    thread::scope(|s| {
        for t in 0..THREADS {
            let store = &store;
            s.spawn(move || {
                for r in 0..ROUNDS {
                    store
                        .add_user("O", "A", &AddOptions::named(format!("u-{t}-{r}")), &NOW)
                        .unwrap();
                }
            });
        }
    });

    let users = store.list_users("O", "A").unwrap();
    assert_eq!(users.len(), THREADS * ROUNDS);
    for user in &users {
        store.verify_chain(&EntityRef::user("O", "A", user)).unwrap();
    }
    // Operator, account and every user have their seed on disk.
    assert_eq!(store.keys().list().unwrap().len(), 2 + THREADS * ROUNDS);
}

#[test]
fn stress_parallel_edits_and_adds() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_operator(dir.path());
    for t in 0..THREADS {
        store.add_account("O", &AddOptions::named(format!("e-{t}")), &NOW).unwrap();
    }

    thread::scope(|s| {
        for t in 0..THREADS {
            let store = &store;
            s.spawn(move || {
                let acct = EntityRef::account("O", format!("e-{t}"));
                for r in 0..ROUNDS {
                    store
                        .edit_claim(&acct, &[ClaimEdit::AddTags(vec![format!("r{r}")])], None, &NOW)
                        .unwrap();
                    store
                        .add_account("O", &AddOptions::named(format!("n-{t}-{r}")), &NOW)
                        .unwrap();
                }
            });
        }
    });

    for t in 0..THREADS {
        let claims = store
            .verify_chain(&EntityRef::account("O", format!("e-{t}")))
            .unwrap();
        let tags = claims.tags();
        for r in 0..ROUNDS {
            assert!(tags.contains(&format!("r{r}")), "e-{t} is missing tag r{r}");
        }
    }
    assert_eq!(store.list_accounts("O").unwrap().len(), THREADS * (ROUNDS + 1));
}

// === Partial Failures ===

#[test]
fn stress_adds_with_blocked_selection() {
    let dir = tempfile::tempdir().unwrap();
    let store = TrustStore::create(
        dir.path().join("stores"),
        KeyStore::new(dir.path().join("nkeys")),
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("stores/.selection.json")).unwrap();

    store.add_operator(&AddOptions::named("O"), &NOW).unwrap();
    thread::scope(|s| {
        for t in 0..THREADS {
            let store = &store;
            s.spawn(move || {
                store.add_account("O", &AddOptions::named(format!("a-{t}")), &NOW).unwrap();
            });
        }
    });

    assert_eq!(store.list_operators().unwrap(), ["O"]);
    assert_eq!(store.list_accounts("O").unwrap().len(), THREADS);
    assert_eq!(
        store.add_operator(&AddOptions::named("O"), &NOW).unwrap_err().kind(),
        ErrorKind::Conflict
    );
}

#[test]
fn stress_rejected_add_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_operator(dir.path());
    let keys_before = store.keys().list().unwrap().len();

    let opts = AddOptions {
        start: "1w".into(),
        expiry: "1h".into(),
        ..AddOptions::named("bad")
    };
    assert_eq!(
        store.add_account("O", &opts, &NOW).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert!(!store.exists(&EntityRef::account("O", "bad")));
    assert!(store.list_accounts("O").unwrap().is_empty());
    assert_eq!(store.keys().list().unwrap().len(), keys_before);

    // The rejected name is free for a valid retry.
    store.add_account("O", &AddOptions::named("bad"), &NOW).unwrap();
    assert_eq!(store.current().unwrap().account.as_deref(), Some("bad"));
}
