// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-up, sign-in and session persistence routes.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, verify_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::{Role, SessionUser};
use crate::services::identity::{Identity, GOOGLE_PROVIDER_ID};
use crate::services::session::{set_persistence_mode, PersistenceMode};
use crate::AppState;

/// Cookie remembering the client's chosen persistence mode.
pub const PERSISTENCE_COOKIE: &str = "mavericks_persistence";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_sign_in))
        .route("/auth/logout", post(logout))
        .route("/auth/persistence", put(update_persistence))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: Option<String>,
    /// Requested role; `admin` is only honoured for the reserved address
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSignInRequest {
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub provider_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PersistenceRequest {
    pub mode: String,
}

/// Successful sign-in/sign-up.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SessionUser,
    pub persistence: &'static str,
    /// Profile lookup failed; the role comes from the email rule alone
    pub degraded: bool,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PersistenceResponse {
    pub success: bool,
    pub mode: String,
}

fn device_from(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .filter(|ua| !ua.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn validate<T: Validate>(request: &T) -> Result<()> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn persistence_of(state: &AppState, jar: &CookieJar) -> PersistenceMode {
    jar.get(PERSISTENCE_COOKIE)
        .and_then(|c| c.value().parse().ok())
        .unwrap_or(state.config.default_persistence)
}

fn is_local(frontend_url: &str) -> bool {
    frontend_url.starts_with("http://localhost") || frontend_url.starts_with("http://127.0.0.1")
}

/// Session cookie for `mode`; `None` when the mode keeps nothing.
fn session_cookie(token: &str, mode: PersistenceMode, secure: bool) -> Option<Cookie<'static>> {
    let builder = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);

    match mode {
        PersistenceMode::Local => {
            Some(builder.max_age(time::Duration::seconds(SESSION_TTL_SECS as i64)).build())
        }
        PersistenceMode::Session => Some(builder.build()),
        PersistenceMode::None => None,
    }
}

/// Reconcile `identity`, notify subscribers, and issue the session token.
async fn complete_sign_in(
    state: &AppState,
    jar: CookieJar,
    identity: &Identity,
    device: &str,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let outcome = state.auth_state.signed_in(identity, device).await;

    let token = create_jwt(
        &identity.uid,
        identity.email.as_deref(),
        &state.config.jwt_signing_key,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let mode = persistence_of(state, &jar);
    let secure = !is_local(&state.config.frontend_url);
    let jar = match session_cookie(&token, mode, secure) {
        Some(cookie) => jar.add(cookie),
        None => jar,
    };

    tracing::info!(
        uid = %identity.uid,
        role = outcome.user.role.as_str(),
        created = outcome.created,
        degraded = outcome.degraded,
        persistence = mode.as_str(),
        "Signed in"
    );

    Ok((
        jar,
        Json(AuthResponse {
            token,
            user: outcome.user,
            persistence: mode.as_str(),
            degraded: outcome.degraded,
        }),
    ))
}

async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    validate(&request)?;
    let device = device_from(&headers);

    let identity = state
        .identity
        .sign_up_with_credentials(&request.email, &request.password, request.name.as_deref())
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Sign-up rejected"))?;

    if let Err(e) = state
        .profiles
        .create_profile(&identity, request.role, &device, chrono::Utc::now())
        .await
    {
        tracing::warn!(uid = %identity.uid, error = %e, "Failed to create profile at sign-up");
    }

    complete_sign_in(&state, jar, &identity, &device).await
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    validate(&request)?;
    let device = device_from(&headers);

    let identity = state
        .identity
        .sign_in_with_credentials(&request.email, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Sign-in rejected"))?;

    record_sign_in(&state, &identity, &device).await;
    complete_sign_in(&state, jar, &identity, &device).await
}

async fn google_sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<ProviderSignInRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let device = device_from(&headers);
    let provider_id = request.provider_id.as_deref().unwrap_or(GOOGLE_PROVIDER_ID);

    let identity = state
        .identity
        .sign_in_with_identity_provider(&request.id_token, provider_id)
        .await
        .inspect_err(|e| tracing::info!(provider_id, error = %e, "Provider sign-in rejected"))?;

    record_sign_in(&state, &identity, &device).await;
    complete_sign_in(&state, jar, &identity, &device).await
}

async fn record_sign_in(state: &AppState, identity: &Identity, device: &str) {
    if let Err(e) = state
        .profiles
        .record_sign_in(&identity.uid, device, chrono::Utc::now())
        .await
    {
        tracing::warn!(uid = %identity.uid, error = %e, "Failed to record sign-in");
    }
}

/// Logout - broadcast the sign-out and clear the session cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(StatusCode, CookieJar)> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(String::from)
    });

    if let Some(claims) = token.and_then(|t| verify_jwt(&t, &state.config.jwt_signing_key).ok()) {
        state.identity.sign_out(&claims.sub).await?;
        state.auth_state.signed_out(&claims.sub);
        tracing::info!(uid = %claims.sub, "Signed out");
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((StatusCode::NO_CONTENT, jar))
}

/// Choose how long this client keeps its session.
///
/// An unknown mode is not an error: the default is stored and
/// `success: false` returned.
async fn update_persistence(
    jar: CookieJar,
    Json(request): Json<PersistenceRequest>,
) -> (CookieJar, Json<PersistenceResponse>) {
    let (mode, success) = set_persistence_mode(&request.mode);
    let cookie = Cookie::build((PERSISTENCE_COOKIE, mode.as_str()))
        .path("/")
        .same_site(SameSite::Lax)
        .build();

    (
        jar.add(cookie),
        Json(PersistenceResponse {
            success,
            mode: mode.as_str().to_string(),
        }),
    )
}
