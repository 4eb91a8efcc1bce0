// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity service gateway.
//!
//! Talks to the Firebase Identity Toolkit REST API for email/password and
//! identity-provider sign-in. An in-memory account table stands in for the
//! remote service in tests and offline development.

use crate::config::Config;
use crate::db::random_id;
use crate::error::AuthError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;

/// Default OAuth provider for `sign_in_with_identity_provider`.
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

const MIN_PASSWORD_LEN: usize = 6;
const UID_LEN: usize = 28;

/// An authenticated account as reported by the identity service.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Stable identity key (profile document ID)
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Identity service ID token, when the backend issues one
    pub id_token: Option<String>,
}

#[derive(Clone)]
enum IdentityBackend {
    Remote(IdentityToolkitClient),
    Memory(Arc<DashMap<String, MemoryAccount>>),
}

#[derive(Debug, Clone)]
struct MemoryAccount {
    uid: String,
    email: String,
    password: Option<String>,
    display_name: Option<String>,
}

/// Identity gateway (email/password and OAuth sign-in).
#[derive(Clone)]
pub struct IdentityGateway {
    backend: IdentityBackend,
}

impl IdentityGateway {
    /// Create a gateway for the remote identity service described by `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backend: IdentityBackend::Remote(IdentityToolkitClient::new(
                config.firebase_api_key.clone(),
                config.auth_emulator_host.as_deref(),
                config.frontend_url.clone(),
            )),
        }
    }

    /// Create a gateway backed by an in-process account table.
    pub fn new_in_memory() -> Self {
        Self {
            backend: IdentityBackend::Memory(Arc::new(DashMap::new())),
        }
    }

    /// Register a new email/password account.
    pub async fn sign_up_with_credentials(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        match &self.backend {
            IdentityBackend::Remote(client) => {
                let mut body = serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                });
                if let Some(name) = display_name {
                    body["displayName"] = serde_json::Value::String(name.to_string());
                }
                let account = client.call("signUp", body).await?;
                Ok(account.into_identity(display_name))
            }
            IdentityBackend::Memory(accounts) => {
                if password.len() < MIN_PASSWORD_LEN {
                    return Err(AuthError::WeakPassword(
                        "Password should be at least 6 characters".to_string(),
                    ));
                }
                let uid = random_id(UID_LEN).map_err(|e| AuthError::Transport(e.to_string()))?;

                match accounts.entry(email.to_ascii_lowercase()) {
                    Entry::Occupied(_) => Err(AuthError::EmailInUse),
                    Entry::Vacant(slot) => {
                        let account = slot.insert(MemoryAccount {
                            uid,
                            email: email.to_string(),
                            password: Some(password.to_string()),
                            display_name: display_name.map(String::from),
                        });
                        Ok(account.to_identity())
                    }
                }
            }
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        match &self.backend {
            IdentityBackend::Remote(client) => {
                let body = serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                });
                let account = client.call("signInWithPassword", body).await?;
                Ok(account.into_identity(None))
            }
            IdentityBackend::Memory(accounts) => accounts
                .get(&email.to_ascii_lowercase())
                .filter(|account| account.password.as_deref() == Some(password))
                .map(|account| account.to_identity())
                .ok_or(AuthError::InvalidCredential),
        }
    }

    /// Sign in with a token issued by an external identity provider.
    ///
    /// An empty token means the user dismissed the provider prompt. The
    /// in-memory backend treats the token as the provider-asserted email.
    pub async fn sign_in_with_identity_provider(
        &self,
        id_token: &str,
        provider_id: &str,
    ) -> Result<Identity, AuthError> {
        if id_token.trim().is_empty() {
            return Err(AuthError::ProviderCancelled);
        }

        match &self.backend {
            IdentityBackend::Remote(client) => {
                let body = serde_json::json!({
                    "postBody": format!(
                        "id_token={}&providerId={}",
                        urlencoding::encode(id_token),
                        urlencoding::encode(provider_id)
                    ),
                    "requestUri": client.request_uri,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                });
                let account = client.call("signInWithIdp", body).await?;
                Ok(account.into_identity(None))
            }
            IdentityBackend::Memory(accounts) => {
                let email = id_token.trim();
                if !email.contains('@') {
                    return Err(AuthError::Provider("INVALID_IDP_RESPONSE".to_string()));
                }
                let uid = random_id(UID_LEN).map_err(|e| AuthError::Transport(e.to_string()))?;
                let account = accounts
                    .entry(email.to_ascii_lowercase())
                    .or_insert_with(|| MemoryAccount {
                        uid,
                        email: email.to_string(),
                        password: None,
                        display_name: email.split('@').next().map(String::from),
                    });
                Ok(account.to_identity())
            }
        }
    }

    /// End the session for `uid`.
    ///
    /// Identity Toolkit ID tokens are stateless, so there is nothing to
    /// revoke remotely; the caller drops its session token.
    pub async fn sign_out(&self, uid: &str) -> Result<(), AuthError> {
        tracing::debug!(uid, "Signed out");
        Ok(())
    }
}

impl MemoryAccount {
    fn to_identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: Some(self.email.clone()),
            display_name: self.display_name.clone(),
            id_token: None,
        }
    }
}

// ─── Identity Toolkit REST client ────────────────────────────────

#[derive(Clone)]
struct IdentityToolkitClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    request_uri: String,
}

/// Account payload shared by signUp / signInWithPassword / signInWithIdp.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl AccountResponse {
    fn into_identity(self, fallback_name: Option<&str>) -> Identity {
        Identity {
            uid: self.local_id,
            email: self.email,
            display_name: self
                .display_name
                .filter(|n| !n.is_empty())
                .or_else(|| fallback_name.map(String::from)),
            id_token: self.id_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityToolkitClient {
    fn new(api_key: String, emulator_host: Option<&str>, request_uri: String) -> Self {
        let base_url = match emulator_host {
            Some(host) => {
                tracing::info!(host, "Using Firebase Auth emulator");
                format!("http://{}/identitytoolkit.googleapis.com", host)
            }
            None => "https://identitytoolkit.googleapis.com".to_string(),
        };

        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            request_uri,
        }
    }

    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<AccountResponse, AuthError> {
        let url = format!(
            "{}/v1/accounts:{}?key={}",
            self.base_url,
            method,
            urlencoding::encode(&self.api_key)
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.is_server_error() {
                return Err(AuthError::Transport(format!("HTTP {}", status)));
            }
            return match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => {
                    tracing::debug!(method, code = %envelope.error.message, "Identity service rejected request");
                    Err(AuthError::from_remote_message(&envelope.error.message))
                }
                Err(_) => Err(AuthError::Remote(format!("HTTP {}", status))),
            };
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("JSON parse error: {}", e)))
    }
}
