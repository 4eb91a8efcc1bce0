// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The Firebase web API key is not a secret (it ships in every browser
//! bundle), but the JWT signing key is and must come from the environment.

use crate::db::UpdatePolicy;
use crate::services::session::PersistenceMode;
use std::env;

/// The single email address that is always granted the admin role.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@mavericks.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase web API key (used as `?key=` on Identity Toolkit calls)
    pub firebase_api_key: String,
    /// Firebase / GCP project ID hosting the document store
    pub firebase_project_id: String,
    /// Reserved administrator address
    pub admin_email: String,
    /// Frontend URL (CORS origin and IdP request URI)
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// `host:port` of the Firebase Auth emulator, if running locally
    pub auth_emulator_host: Option<String>,
    /// What `update_document` does when the target is missing
    pub missing_document_policy: UpdatePolicy,
    /// Session persistence used until a client picks another mode
    pub default_persistence: PersistenceMode,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let missing_document_policy = env::var("MISSING_DOCUMENT_POLICY")
            .ok()
            .map(|raw| {
                raw.parse()
                    .map_err(|e: crate::error::ConfigurationError| ConfigError::Invalid(e.to_string()))
            })
            .transpose()?
            .unwrap_or_default();

        let default_persistence = env::var("DEFAULT_PERSISTENCE")
            .ok()
            .map(|raw| {
                raw.parse()
                    .map_err(|e: crate::error::ConfigurationError| ConfigError::Invalid(e.to_string()))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?,
            admin_email: env::var("ADMIN_EMAIL")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            auth_emulator_host: env::var("FIREBASE_AUTH_EMULATOR_HOST").ok(),
            missing_document_policy,
            default_persistence,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            firebase_api_key: "test_api_key".to_string(),
            firebase_project_id: "test-project".to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            auth_emulator_host: None,
            missing_document_policy: UpdatePolicy::Upsert,
            default_persistence: PersistenceMode::Local,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("FIREBASE_API_KEY", "test_key");
        env::set_var("FIREBASE_PROJECT_ID", "mavericks-test");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("MISSING_DOCUMENT_POLICY", "fail");
        env::remove_var("ADMIN_EMAIL");
        env::remove_var("DEFAULT_PERSISTENCE");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.firebase_api_key, "test_key");
        assert_eq!(config.firebase_project_id, "mavericks-test");
        assert_eq!(config.admin_email, DEFAULT_ADMIN_EMAIL);
        assert_eq!(config.missing_document_policy, UpdatePolicy::FailIfMissing);
        assert_eq!(config.default_persistence, PersistenceMode::Local);
    }
}
