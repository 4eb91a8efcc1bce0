// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hackathon listing with a fixed demo fallback.

use crate::db::{collections, FirestoreDb};
use crate::error::StoreError;
use crate::models::{Hackathon, HackathonStatus, HackathonView, NewHackathon};
use crate::services::DataSource;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum number of hackathons shown in the panel.
pub const LISTING_LIMIT: u32 = 5;

/// Hackathons for the panel, with where they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HackathonListing {
    pub items: Vec<HackathonView>,
    pub source: DataSource,
}

/// The demo list shown when the store is empty or unreadable.
pub fn demo_hackathons() -> Vec<HackathonView> {
    [
        ("demo-1", "JavaScript Algorithms Challenge", "August 15, 2025", HackathonStatus::Active, 120),
        ("demo-2", "React UI/UX Hackathon", "September 1, 2025", HackathonStatus::Upcoming, 85),
        ("demo-3", "Node.js Backend Battle", "July 20, 2025", HackathonStatus::Completed, 95),
    ]
    .into_iter()
    .map(|(id, name, date, status, participants)| HackathonView {
        id: id.to_string(),
        name: name.to_string(),
        date: date.to_string(),
        status,
        participants,
        action: status.action(),
    })
    .collect()
}

#[derive(Clone)]
pub struct HackathonService {
    db: FirestoreDb,
}

impl HackathonService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Up to `LISTING_LIMIT` hackathons ordered by date, or the demo list.
    pub async fn list_hackathons(&self) -> HackathonListing {
        match self
            .db
            .list_documents::<Hackathon>(collections::HACKATHONS, Some("date"), Some(LISTING_LIMIT))
            .await
        {
            Ok(docs) if !docs.is_empty() => HackathonListing {
                items: docs
                    .into_iter()
                    .map(|doc| HackathonView::from_document(doc.id, &doc.data))
                    .collect(),
                source: DataSource::Live,
            },
            Ok(_) => {
                tracing::debug!("No hackathons stored, showing demo list");
                HackathonListing {
                    items: demo_hackathons(),
                    source: DataSource::Demo,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to list hackathons, showing demo list");
                HackathonListing {
                    items: demo_hackathons(),
                    source: DataSource::store_unavailable(),
                }
            }
        }
    }

    pub async fn create_hackathon(
        &self,
        request: NewHackathon,
        now: DateTime<Utc>,
    ) -> Result<HackathonView, StoreError> {
        let doc = self
            .db
            .create_document(collections::HACKATHONS, &request.into_document(now))
            .await?;
        tracing::info!(id = %doc.id, name = %doc.data.name, "Hackathon created");
        Ok(HackathonView::from_document(doc.id, &doc.data))
    }
}
