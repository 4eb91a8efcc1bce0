// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures reported by the identity service.
///
/// Display strings are shown to the user verbatim on the auth form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredential,

    #[error("This email is already registered")]
    EmailInUse,

    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    #[error("This account has been disabled")]
    UserDisabled,

    #[error("Sign-in was cancelled")]
    ProviderCancelled,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Authentication service unreachable: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Remote(String),
}

impl AuthError {
    /// Map an Identity Toolkit error message (e.g. `WEAK_PASSWORD : Password
    /// should be at least 6 characters`) onto the taxonomy.
    pub fn from_remote_message(message: &str) -> Self {
        let (code, detail) = match message.split_once(" : ") {
            Some((code, detail)) => (code.trim(), detail.trim()),
            None => (message.trim(), ""),
        };

        match code {
            "EMAIL_EXISTS" => AuthError::EmailInUse,
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                AuthError::InvalidCredential
            }
            "WEAK_PASSWORD" => AuthError::WeakPassword(if detail.is_empty() {
                "Password should be at least 6 characters".to_string()
            } else {
                detail.to_string()
            }),
            "USER_DISABLED" => AuthError::UserDisabled,
            "INVALID_IDP_RESPONSE" | "INVALID_ID_TOKEN" => AuthError::Provider(code.to_string()),
            _ => AuthError::Remote(message.to_string()),
        }
    }
}

/// Failures talking to the document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Database not connected (offline mode)")]
    Offline,

    #[error("Document store error: {0}")]
    Transport(String),

    #[error("Malformed document: {0}")]
    Serialization(String),
}

/// Invalid client configuration. Never escapes to callers; see
/// `AuthStateHub::set_persistence_mode`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Unknown persistence mode: {0}")]
    InvalidPersistenceMode(String),

    #[error("Unknown missing-document policy: {0}")]
    InvalidUpdatePolicy(String),
}

/// Failures reading or writing the local form cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Local storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Local storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Administrator role required")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Auth(err) => {
                tracing::info!(error = %err, "Authentication rejected");
                let status = match err {
                    AuthError::InvalidCredential => StatusCode::UNAUTHORIZED,
                    AuthError::EmailInUse => StatusCode::CONFLICT,
                    AuthError::UserDisabled => StatusCode::FORBIDDEN,
                    AuthError::Transport(_) => StatusCode::BAD_GATEWAY,
                    AuthError::WeakPassword(_)
                    | AuthError::ProviderCancelled
                    | AuthError::Provider(_)
                    | AuthError::Remote(_) => StatusCode::BAD_REQUEST,
                };
                (status, "auth_error", Some(err.to_string()))
            }
            AppError::Store(StoreError::NotFound { collection, id }) => (
                StatusCode::NOT_FOUND,
                "not_found",
                Some(format!("{}/{}", collection, id)),
            ),
            AppError::Store(err) => {
                tracing::error!(error = %err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
