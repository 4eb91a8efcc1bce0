// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile and session models for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Most recent sign-ins kept in `sessionData.loginHistory`.
pub const LOGIN_HISTORY_LIMIT: usize = 20;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// The reserved-address rule: only an exact match grants `Admin`.
    pub fn for_email(email: Option<&str>, admin_email: &str) -> Role {
        match email {
            Some(email) if email == admin_email => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Per-user learning counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    pub assessments_completed: u32,
    pub skills_assessed: u32,
    pub videos_completed: u32,
    pub hackathons_joined: u32,
}

/// One sign-in event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginEntry {
    pub timestamp: DateTime<Utc>,
    pub device: String,
}

/// Client session state persisted alongside the profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionData {
    pub resume_uploaded: bool,
    #[serde(rename = "resumeURL")]
    pub resume_url: Option<String>,
    pub resume_file_name: String,
    pub assessment_started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_progress: Option<Map<String, Value>>,
    pub current_step: String,
    pub device_info: String,
    pub login_history: Vec<LoginEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

/// Partial session write. `None` means "not mentioned by this update".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionUpdate {
    pub resume_uploaded: Option<bool>,
    #[serde(rename = "resumeURL")]
    pub resume_url: Option<String>,
    pub resume_file_name: Option<String>,
    pub assessment_started: Option<bool>,
    pub assessment_progress: Option<Map<String, Value>>,
    pub current_step: Option<String>,
    pub device_info: Option<String>,
}

impl SessionData {
    /// Shallow-merge `update` over `self`.
    ///
    /// An uploaded resume and a started assessment are sticky: once stored as
    /// `true` they stay `true`, together with their URL / progress payload,
    /// unless the update itself asserts the flag again.
    pub fn merge(&self, update: &SessionUpdate) -> SessionData {
        let mut merged = self.clone();

        let keep_resume = self.resume_uploaded && update.resume_uploaded != Some(true);
        if !keep_resume {
            if let Some(uploaded) = update.resume_uploaded {
                merged.resume_uploaded = uploaded;
            }
            if update.resume_url.is_some() {
                merged.resume_url = update.resume_url.clone();
            }
        }

        let keep_assessment = self.assessment_started && update.assessment_started != Some(true);
        if !keep_assessment {
            if let Some(started) = update.assessment_started {
                merged.assessment_started = started;
            }
            if update.assessment_progress.is_some() {
                merged.assessment_progress = update.assessment_progress.clone();
            }
        }

        if let Some(file_name) = &update.resume_file_name {
            merged.resume_file_name = file_name.clone();
        }
        if let Some(step) = &update.current_step {
            merged.current_step = step.clone();
        }
        if let Some(device) = &update.device_info {
            merged.device_info = device.clone();
        }

        merged
    }

    /// Append a sign-in, keeping only the newest `LOGIN_HISTORY_LIMIT` entries.
    pub fn push_login(&mut self, entry: LoginEntry) {
        self.login_history.push(entry);
        if self.login_history.len() > LOGIN_HISTORY_LIMIT {
            let excess = self.login_history.len() - LOGIN_HISTORY_LIMIT;
            self.login_history.drain(..excess);
        }
    }
}

/// User profile stored in the `users` collection, keyed by identity key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Absent on documents written before roles existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_data: Option<SessionData>,
}

impl UserProfile {
    /// True for a document holding only session data, written before the
    /// profile itself was ever created.
    pub fn is_placeholder(&self) -> bool {
        self.created_at.is_none() && self.email.is_none() && self.role.is_none()
    }
}

/// Admin-editable profile fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl ProfileUpdate {
    /// Field paths this update writes.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.display_name.is_some() {
            paths.push("displayName");
        }
        if self.points.is_some() {
            paths.push("points");
        }
        if self.badges.is_some() {
            paths.push("badges");
        }
        if self.progress.is_some() {
            paths.push("progress");
        }
        paths
    }
}

/// Enriched identity handed to auth-state subscribers and API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_data: Option<SessionData>,
}
