//! Database layer (Firestore).

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::{ConfigurationError, StoreError};
use serde::Serialize;
use std::str::FromStr;

/// Collection names as constants.
pub mod collections {
    /// User profiles (keyed by identity key)
    pub const USERS: &str = "users";
    pub const ASSESSMENTS: &str = "assessments";
    pub const HACKATHONS: &str = "hackathons";
}

/// Length of generated document keys (matches Firestore auto-IDs).
pub const DOCUMENT_ID_LEN: usize = 20;

/// A stored record together with its document key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

/// Behaviour of a partial update whose target document does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Create the document with just the written fields.
    #[default]
    Upsert,
    /// Reject the write with `StoreError::NotFound`.
    FailIfMissing,
}

impl FromStr for UpdatePolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(UpdatePolicy::Upsert),
            "fail" | "fail_if_missing" => Ok(UpdatePolicy::FailIfMissing),
            other => Err(ConfigurationError::InvalidUpdatePolicy(other.to_string())),
        }
    }
}

/// Generate a random alphanumeric key.
pub fn random_id(len: usize) -> Result<String, StoreError> {
    use ring::rand::{SecureRandom, SystemRandom};

    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    let mut bytes = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| StoreError::Transport("System RNG unavailable".to_string()))?;

    Ok(bytes
        .iter()
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect())
}
