// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth-form local cache.
//!
//! Each form field lives under its own key in a durable string key/value
//! store, so fields are written independently and the last write wins.

use crate::error::CacheError;
use crate::models::Role;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const KEY_IS_LOGIN: &str = "authFormIsLogin";
pub const KEY_EMAIL: &str = "authFormEmail";
pub const KEY_NAME: &str = "authFormName";
pub const KEY_ROLE: &str = "authFormRole";

/// String key/value store persisted as a single JSON object file.
pub struct LocalStorage {
    path: Option<PathBuf>,
    items: Mutex<BTreeMap<String, String>>,
}

impl LocalStorage {
    /// Storage that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            items: Mutex::new(BTreeMap::new()),
        }
    }

    /// Open (or start) the storage file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let items = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = items.len(), "Opened local storage");
        Ok(Self {
            path: Some(path),
            items: Mutex::new(items),
        })
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut items = self.lock();
        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let mut items = self.lock();
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        atomic_write(path, &serde_json::to_string_pretty(items)?)?;
        Ok(())
    }
}

/// Write through a sibling temp file and rename over the target.
fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, content)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

/// Cached state of the login/signup form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthFormState {
    pub is_login: bool,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Default for AuthFormState {
    fn default() -> Self {
        Self {
            is_login: true,
            email: String::new(),
            name: String::new(),
            role: Role::User,
        }
    }
}

pub struct FormCache {
    storage: LocalStorage,
}

impl FormCache {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// Read all fields back, using the default for anything absent or unreadable.
    pub fn load(&self) -> AuthFormState {
        let defaults = AuthFormState::default();

        let is_login = match self.storage.get_item(KEY_IS_LOGIN) {
            Some(raw) => serde_json::from_str::<bool>(&raw).unwrap_or_else(|e| {
                tracing::debug!(value = %raw, error = %e, "Ignoring unreadable form mode");
                defaults.is_login
            }),
            None => defaults.is_login,
        };
        let role = match self.storage.get_item(KEY_ROLE) {
            Some(raw) => raw.parse::<Role>().unwrap_or(defaults.role),
            None => defaults.role,
        };

        AuthFormState {
            is_login,
            email: self.storage.get_item(KEY_EMAIL).unwrap_or(defaults.email),
            name: self.storage.get_item(KEY_NAME).unwrap_or(defaults.name),
            role,
        }
    }

    pub fn set_is_login(&self, is_login: bool) -> Result<(), CacheError> {
        self.storage
            .set_item(KEY_IS_LOGIN, &serde_json::to_string(&is_login)?)
    }

    pub fn set_email(&self, email: &str) -> Result<(), CacheError> {
        self.storage.set_item(KEY_EMAIL, email)
    }

    pub fn set_name(&self, name: &str) -> Result<(), CacheError> {
        self.storage.set_item(KEY_NAME, name)
    }

    pub fn set_role(&self, role: Role) -> Result<(), CacheError> {
        self.storage.set_item(KEY_ROLE, role.as_str())
    }

    /// Persist every field of `state`, one key at a time.
    pub fn save(&self, state: &AuthFormState) -> Result<(), CacheError> {
        self.set_is_login(state.is_login)?;
        self.set_email(&state.email)?;
        self.set_name(&state.name)?;
        self.set_role(state.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let cache = FormCache::new(LocalStorage::in_memory());
        assert_eq!(cache.load(), AuthFormState::default());
        let state = cache.load();
        assert!(state.is_login);
        assert_eq!(state.role, Role::User);
    }

    #[test]
    fn test_fields_are_independent() {
        let cache = FormCache::new(LocalStorage::in_memory());
        cache.set_email("jo@example.com").unwrap();

        let state = cache.load();
        assert_eq!(state.email, "jo@example.com");
        assert!(state.is_login);
        assert_eq!(state.name, "");
    }

    #[test]
    fn test_wire_values() {
        let storage = LocalStorage::in_memory();
        storage.set_item(KEY_IS_LOGIN, "false").unwrap();
        storage.set_item(KEY_ROLE, "admin").unwrap();
        let cache = FormCache::new(storage);

        let state = cache.load();
        assert!(!state.is_login);
        assert_eq!(state.role, Role::Admin);

        cache.set_is_login(true).unwrap();
        assert_eq!(cache.storage.get_item(KEY_IS_LOGIN).as_deref(), Some("true"));
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        let storage = LocalStorage::in_memory();
        storage.set_item(KEY_IS_LOGIN, "yes please").unwrap();
        storage.set_item(KEY_ROLE, "superuser").unwrap();

        let state = FormCache::new(storage).load();
        assert!(state.is_login);
        assert_eq!(state.role, Role::User);
    }

    #[test]
    fn test_remove_item() {
        let storage = LocalStorage::in_memory();
        storage.set_item(KEY_NAME, "Jo").unwrap();
        storage.remove_item(KEY_NAME).unwrap();
        storage.remove_item(KEY_NAME).unwrap();
        assert_eq!(storage.get_item(KEY_NAME), None);
    }
}
