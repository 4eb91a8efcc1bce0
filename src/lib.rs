// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Mavericks Admin: backend core for the coding-education admin dashboard
//!
//! This crate reconciles signed-in identities with their stored profiles,
//! aggregates dashboard statistics, and serves the hackathon listing, with
//! fixed demo data whenever the document store is empty or unreachable.

pub mod config;
pub mod db;
pub mod error;
pub mod form_cache;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{
    AuthStateHub, DashboardService, HackathonService, IdentityGateway, ProfileService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityGateway,
    pub profiles: ProfileService,
    pub auth_state: AuthStateHub,
    pub dashboard: DashboardService,
    pub hackathons: HackathonService,
}

impl AppState {
    /// Wire every service over one store client and identity gateway.
    pub fn new(config: Config, db: FirestoreDb, identity: IdentityGateway) -> Self {
        let profiles = ProfileService::new(db.clone(), config.admin_email.clone());
        let auth_state = AuthStateHub::new(profiles.clone());
        let hackathons = HackathonService::new(db.clone());
        let dashboard =
            DashboardService::new(db.clone(), hackathons.clone(), config.admin_email.clone());

        Self {
            config,
            db,
            identity,
            profiles,
            auth_state,
            dashboard,
            hackathons,
        }
    }
}
