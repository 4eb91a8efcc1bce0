// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for the signed-in user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Role, SessionData, SessionUpdate, SessionUser};
use crate::services::profile::UploadReceipt;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/session", put(update_session))
        .route("/api/me/resume", post(upload_resume))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user, with role and stored session data.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SessionUser>> {
    let profile = state
        .profiles
        .get_profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.uid)))?;

    let role = match state.profiles.role_for_email(user.email.as_deref()) {
        Role::Admin => Role::Admin,
        Role::User => profile.role.unwrap_or_default(),
    };

    Ok(Json(SessionUser {
        uid: user.uid,
        email: profile.email.or(user.email),
        display_name: profile.display_name,
        role,
        session_data: profile.session_data,
    }))
}

// ─── Session Data ────────────────────────────────────────────

async fn update_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<SessionUpdate>,
) -> Result<Json<SessionData>> {
    let session = state
        .profiles
        .update_session(&user.uid, &update, chrono::Utc::now())
        .await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
struct ResumeQuery {
    file_name: String,
}

/// Accept a resume. The bytes are not stored anywhere; see
/// `ProfileService::upload_object`.
async fn upload_resume(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ResumeQuery>,
    body: Bytes,
) -> Result<Json<UploadReceipt>> {
    let file_name = params.file_name.trim();
    if file_name.is_empty() || file_name.contains('/') {
        return Err(AppError::BadRequest("Invalid 'file_name' parameter".to_string()));
    }
    if body.is_empty() {
        return Err(AppError::BadRequest("Empty upload".to_string()));
    }

    let receipt = state
        .profiles
        .upload_object(&user.uid, file_name, &body, chrono::Utc::now())
        .await?;
    Ok(Json(receipt))
}
