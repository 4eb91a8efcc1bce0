// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod dashboard;
pub mod hackathons;
pub mod identity;
pub mod profile;
pub mod session;

pub use dashboard::{DashboardService, StatsOutcome, Tab, TabView, UserRow};
pub use hackathons::{HackathonListing, HackathonService};
pub use identity::{Identity, IdentityGateway};
pub use profile::{ProfileService, ReconcileOutcome, UploadReceipt};
pub use session::{AuthChange, AuthStateHub, PersistenceMode, Subscription};

use serde::Serialize;

/// Where the data behind a panel came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// Read from the document store
    Live,
    /// Store was empty; fixed demo content shown
    Demo,
    /// Store read failed; fixed demo content shown
    Fallback { reason: String },
}

/// Reason reported to clients for any failed store read; the detail is logged.
pub const STORE_UNAVAILABLE: &str = "store_unavailable";

impl DataSource {
    pub fn is_live(&self) -> bool {
        matches!(self, DataSource::Live)
    }

    pub fn store_unavailable() -> Self {
        DataSource::Fallback {
            reason: STORE_UNAVAILABLE.to_string(),
        }
    }
}
