// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin dashboard routes. Both `require_auth` and `require_admin` apply.

use crate::error::{AppError, Result};
use crate::models::{HackathonView, NewHackathon, ProfileUpdate};
use crate::services::dashboard::{StatsOutcome, Tab, TabView, UserRow};
use crate::services::hackathons::HackathonListing;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/stats", get(get_stats))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{uid}", patch(update_user))
        .route(
            "/api/admin/hackathons",
            get(list_hackathons).post(create_hackathon),
        )
        .route("/api/admin/tabs/{tab}", get(load_tab))
        .route("/api/admin/retry/{tab}", post(load_tab))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsOutcome> {
    Json(state.dashboard.load_stats(chrono::Utc::now()).await)
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserRow>>> {
    Ok(Json(state.dashboard.list_users().await?))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<StatusCode> {
    if update.field_paths().is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    state
        .profiles
        .update_profile(&uid, &update, chrono::Utc::now())
        .await?;
    tracing::info!(uid = %uid, fields = ?update.field_paths(), "Profile updated by admin");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_hackathons(State(state): State<Arc<AppState>>) -> Json<HackathonListing> {
    Json(state.hackathons.list_hackathons().await)
}

async fn create_hackathon(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewHackathon>,
) -> Result<(StatusCode, Json<HackathonView>)> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let view = state
        .hackathons
        .create_hackathon(request, chrono::Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// One read-aggregate cycle for a tab. Served for both the initial load
/// and the retry action.
async fn load_tab(
    State(state): State<Arc<AppState>>,
    Path(tab): Path<String>,
) -> Result<Json<TabView>> {
    let tab: Tab = tab.parse().map_err(AppError::NotFound)?;
    Ok(Json(state.dashboard.load_tab(tab, chrono::Utc::now()).await))
}
