// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mavericks Admin API Server
//!
//! Backs the admin dashboard of the Mavericks coding-education platform:
//! sign-in through the Firebase identity service, profile reconciliation,
//! dashboard statistics and the hackathon listing.

use mavericks_admin::{config::Config, db::FirestoreDb, services::IdentityGateway, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        admin_email = %config.admin_email,
        "Starting Mavericks Admin API"
    );

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.firebase_project_id, config.missing_document_policy).await?;

    let identity = IdentityGateway::new(&config);
    tracing::info!(
        emulator = config.auth_emulator_host.is_some(),
        "Identity gateway initialized"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, identity));

    // Audit log of auth-state changes; lives until shutdown
    let auth_log = state.auth_state.subscribe_auth_state(|change| match &change.user {
        Some(user) => tracing::info!(uid = %change.uid, role = user.role.as_str(), "Auth state: signed in"),
        None => tracing::info!(uid = %change.uid, "Auth state: signed out"),
    });

    // Build router
    let app = mavericks_admin::routes::create_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.auth_state.close();
    drop(auth_log);
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mavericks_admin=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
