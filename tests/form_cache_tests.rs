// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth-form cache persistence tests.

use mavericks_admin::error::CacheError;
use mavericks_admin::form_cache::{AuthFormState, FormCache, LocalStorage, KEY_EMAIL};
use mavericks_admin::models::Role;

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local_storage.json");

    let cache = FormCache::new(LocalStorage::open(&path).unwrap());
    assert_eq!(cache.load(), AuthFormState::default());

    cache
        .save(&AuthFormState {
            is_login: false,
            email: "jo@example.com".to_string(),
            name: "Jo".to_string(),
            role: Role::Admin,
        })
        .unwrap();
    drop(cache);

    let reopened = FormCache::new(LocalStorage::open(&path).unwrap());
    let state = reopened.load();
    assert!(!state.is_login);
    assert_eq!(state.email, "jo@example.com");
    assert_eq!(state.name, "Jo");
    assert_eq!(state.role, Role::Admin);
}

#[test]
fn test_file_holds_plain_string_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local_storage.json");

    let cache = FormCache::new(LocalStorage::open(&path).unwrap());
    cache.set_is_login(false).unwrap();
    cache.set_email("a@b.c").unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        raw,
        serde_json::json!({"authFormIsLogin": "false", "authFormEmail": "a@b.c"})
    );
}

#[test]
fn test_partial_file_uses_defaults_for_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local_storage.json");
    std::fs::write(&path, format!(r#"{{"{}": "only@example.com"}}"#, KEY_EMAIL)).unwrap();

    let state = FormCache::new(LocalStorage::open(&path).unwrap()).load();
    assert!(state.is_login);
    assert_eq!(state.email, "only@example.com");
    assert_eq!(state.name, "");
    assert_eq!(state.role, Role::User);
}

#[test]
fn test_corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local_storage.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(matches!(
        LocalStorage::open(&path),
        Err(CacheError::Corrupt(_))
    ));
}
