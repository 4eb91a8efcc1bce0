// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hackathon model for storage and the admin listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HackathonStatus {
    Active,
    Upcoming,
    Completed,
}

/// The single call-to-action offered for a hackathon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HackathonAction {
    Join,
    ViewDetails,
    ViewResults,
}

impl HackathonStatus {
    pub fn action(&self) -> HackathonAction {
        match self {
            HackathonStatus::Active => HackathonAction::Join,
            HackathonStatus::Upcoming => HackathonAction::ViewDetails,
            HackathonStatus::Completed => HackathonAction::ViewResults,
        }
    }
}

/// Participants are stored either as a head count or as a list of user keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Participants {
    Count(u32),
    List(Vec<String>),
}

impl Default for Participants {
    fn default() -> Self {
        Participants::List(Vec::new())
    }
}

impl Participants {
    pub fn count(&self) -> u32 {
        match self {
            Participants::Count(n) => *n,
            Participants::List(ids) => ids.len() as u32,
        }
    }
}

/// Hackathon document in the `hackathons` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hackathon {
    pub name: String,
    /// Display date, also the listing sort key
    pub date: String,
    pub status: HackathonStatus,
    #[serde(default)]
    pub participants: Participants,
    #[serde(default)]
    pub submissions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Create request for a hackathon.
#[derive(Debug, Clone, Deserialize, validator::Validate)]
pub struct NewHackathon {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub date: String,
    pub status: HackathonStatus,
}

impl NewHackathon {
    pub fn into_document(self, now: DateTime<Utc>) -> Hackathon {
        Hackathon {
            name: self.name,
            date: self.date,
            status: self.status,
            participants: Participants::default(),
            submissions: Vec::new(),
            created_at: Some(now),
        }
    }
}

/// Row shown in the hackathon panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HackathonView {
    pub id: String,
    pub name: String,
    pub date: String,
    pub status: HackathonStatus,
    pub participants: u32,
    pub action: HackathonAction,
}

impl HackathonView {
    pub fn from_document(id: String, hackathon: &Hackathon) -> Self {
        Self {
            id,
            name: hackathon.name.clone(),
            date: hackathon.date.clone(),
            status: hackathon.status,
            participants: hackathon.participants.count(),
            action: hackathon.status.action(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exactly_one_action_per_status() {
        assert_eq!(HackathonStatus::Active.action(), HackathonAction::Join);
        assert_eq!(HackathonStatus::Upcoming.action(), HackathonAction::ViewDetails);
        assert_eq!(HackathonStatus::Completed.action(), HackathonAction::ViewResults);
    }

    #[test]
    fn test_participants_count_or_list() {
        let counted: Hackathon = serde_json::from_value(json!({
            "name": "A", "date": "2025-01-01", "status": "Active", "participants": 42
        }))
        .unwrap();
        assert_eq!(counted.participants.count(), 42);

        let listed: Hackathon = serde_json::from_value(json!({
            "name": "B", "date": "2025-01-02", "status": "Completed",
            "participants": ["u1", "u2"], "submissions": [{"team": "x"}]
        }))
        .unwrap();
        assert_eq!(listed.participants.count(), 2);
        assert_eq!(listed.submissions.len(), 1);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result: Result<Hackathon, _> = serde_json::from_value(json!({
            "name": "C", "date": "2025-01-03", "status": "Cancelled"
        }));
        assert!(result.is_err());
    }
}
