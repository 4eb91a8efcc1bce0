// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin dashboard aggregation.
//!
//! Every load is a fresh read-aggregate cycle over the `users` and
//! `assessments` collections; a retry is just another load.

use crate::db::{collections, FirestoreDb, UpdatePolicy};
use crate::error::StoreError;
use crate::models::{AssessmentRecord, DashboardStats, Role, UserActivity, UserProfile};
use crate::services::hackathons::{HackathonListing, HackathonService};
use crate::services::DataSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Stats together with where they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsOutcome {
    pub stats: DashboardStats,
    pub source: DataSource,
}

/// Row in the user-management table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub points: u32,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Users,
    Analytics,
    Hackathons,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Overview,
        Tab::Users,
        Tab::Analytics,
        Tab::Hackathons,
        Tab::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Users => "users",
            Tab::Analytics => "analytics",
            Tab::Hackathons => "hackathons",
            Tab::Settings => "settings",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tab::ALL
            .into_iter()
            .find(|tab| tab.as_str() == s)
            .ok_or_else(|| format!("unknown tab '{}'", s))
    }
}

/// Content of one dashboard tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tab", rename_all = "snake_case")]
pub enum TabView {
    Overview {
        stats: DashboardStats,
        source: DataSource,
    },
    Users {
        users: Vec<UserRow>,
        source: DataSource,
    },
    Analytics {
        stats: DashboardStats,
        #[serde(rename = "activeRate")]
        active_rate: f64,
        source: DataSource,
    },
    Hackathons {
        #[serde(flatten)]
        listing: HackathonListing,
    },
    Settings {
        #[serde(rename = "adminEmail")]
        admin_email: String,
        #[serde(rename = "missingDocumentPolicy")]
        missing_document_policy: &'static str,
    },
}

#[derive(Clone)]
pub struct DashboardService {
    db: FirestoreDb,
    hackathons: HackathonService,
    admin_email: String,
}

impl DashboardService {
    pub fn new(db: FirestoreDb, hackathons: HackathonService, admin_email: impl Into<String>) -> Self {
        Self {
            db,
            hackathons,
            admin_email: admin_email.into(),
        }
    }

    /// Aggregate dashboard stats, or the demo figures if either read fails.
    pub async fn load_stats(&self, now: DateTime<Utc>) -> StatsOutcome {
        let users = self
            .db
            .list_documents::<UserActivity>(collections::USERS, None, None);
        let assessments = self
            .db
            .list_documents::<AssessmentRecord>(collections::ASSESSMENTS, None, None);

        match futures_util::try_join!(users, assessments) {
            Ok((users, assessments)) => {
                let users: Vec<UserActivity> = users.into_iter().map(|d| d.data).collect();
                let assessments: Vec<AssessmentRecord> =
                    assessments.into_iter().map(|d| d.data).collect();
                let stats = DashboardStats::compute(&users, &assessments, now);
                tracing::debug!(
                    total_users = stats.total_users,
                    active_users = stats.active_users,
                    assessments = stats.assessments_completed,
                    "Dashboard stats computed"
                );
                StatsOutcome {
                    stats,
                    source: DataSource::Live,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load dashboard stats, showing demo figures");
                StatsOutcome {
                    stats: DashboardStats::demo(),
                    source: DataSource::store_unavailable(),
                }
            }
        }
    }

    pub async fn list_users(&self) -> Result<Vec<UserRow>, StoreError> {
        let docs = self
            .db
            .list_documents::<UserProfile>(collections::USERS, None, None)
            .await?;

        Ok(docs
            .into_iter()
            .map(|doc| UserRow {
                uid: doc.id,
                email: doc.data.email,
                display_name: doc.data.display_name,
                role: doc.data.role.unwrap_or_default(),
                points: doc.data.points,
                last_login: doc.data.last_login,
            })
            .collect())
    }

    /// Run one read-aggregate cycle for `tab`.
    pub async fn load_tab(&self, tab: Tab, now: DateTime<Utc>) -> TabView {
        tracing::debug!(%tab, "Loading dashboard tab");
        match tab {
            Tab::Overview => {
                let StatsOutcome { stats, source } = self.load_stats(now).await;
                TabView::Overview { stats, source }
            }
            Tab::Users => match self.list_users().await {
                Ok(users) => TabView::Users {
                    users,
                    source: DataSource::Live,
                },
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list users");
                    TabView::Users {
                        users: Vec::new(),
                        source: DataSource::store_unavailable(),
                    }
                }
            },
            Tab::Analytics => {
                let StatsOutcome { stats, source } = self.load_stats(now).await;
                TabView::Analytics {
                    active_rate: stats.active_rate(),
                    stats,
                    source,
                }
            }
            Tab::Hackathons => TabView::Hackathons {
                listing: self.hackathons.list_hackathons().await,
            },
            Tab::Settings => TabView::Settings {
                admin_email: self.admin_email.clone(),
                missing_document_policy: match self.db.update_policy() {
                    UpdatePolicy::Upsert => "upsert",
                    UpdatePolicy::FailIfMissing => "fail",
                },
            },
        }
    }
}
