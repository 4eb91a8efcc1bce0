// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile reconciliation and session bookkeeping.
//!
//! Turns a raw identity from the identity service into a `SessionUser`:
//! resolves the role, creates the profile on first sight, and keeps the
//! stored `sessionData` block merged rather than overwritten.

use crate::db::{collections, FirestoreDb};
use crate::error::StoreError;
use crate::models::{
    LoginEntry, ProfileUpdate, Role, SessionData, SessionUpdate, SessionUser, UserProfile,
};
use crate::services::identity::Identity;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of reconciling an identity with its stored profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub user: SessionUser,
    /// A profile document was created during this reconciliation
    pub created: bool,
    /// The store could not be used; the role comes from the email rule alone
    pub degraded: bool,
}

/// Returned by the (disabled) object upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub reference: String,
    pub session_data: SessionData,
}

#[derive(Serialize)]
struct RoleWrite {
    role: Role,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LivenessWrite {
    last_active: DateTime<Utc>,
    session_data: LivenessSession,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LivenessSession {
    last_active: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWrite {
    last_login: DateTime<Utc>,
    last_active: DateTime<Utc>,
    session_data: SessionData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionWrite {
    session_data: SessionData,
    last_updated: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileWrite<'a> {
    #[serde(flatten)]
    update: &'a ProfileUpdate,
    last_updated: DateTime<Utc>,
}

/// Profile service over the `users` collection.
#[derive(Clone)]
pub struct ProfileService {
    db: FirestoreDb,
    admin_email: String,
}

impl ProfileService {
    pub fn new(db: FirestoreDb, admin_email: impl Into<String>) -> Self {
        Self {
            db,
            admin_email: admin_email.into(),
        }
    }

    pub fn role_for_email(&self, email: Option<&str>) -> Role {
        Role::for_email(email, &self.admin_email)
    }

    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        self.db.read_document(collections::USERS, uid).await
    }

    /// Reconcile `identity` with its stored profile.
    ///
    /// Never fails: store errors are logged and the reserved-address rule
    /// alone decides the role.
    pub async fn reconcile(
        &self,
        identity: &Identity,
        device: &str,
        now: DateTime<Utc>,
    ) -> ReconcileOutcome {
        match self.try_reconcile(identity, device, now).await {
            Ok((user, created)) => ReconcileOutcome {
                user,
                created,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(
                    uid = %identity.uid,
                    error = %e,
                    "Profile reconciliation failed, falling back to email role rule"
                );
                ReconcileOutcome {
                    user: SessionUser {
                        uid: identity.uid.clone(),
                        email: identity.email.clone(),
                        display_name: identity.display_name.clone(),
                        role: self.role_for_email(identity.email.as_deref()),
                        session_data: None,
                    },
                    created: false,
                    degraded: true,
                }
            }
        }
    }

    async fn try_reconcile(
        &self,
        identity: &Identity,
        device: &str,
        now: DateTime<Utc>,
    ) -> Result<(SessionUser, bool), StoreError> {
        let uid = identity.uid.as_str();

        let stored = self.get_profile(uid).await?;
        let Some(profile) = stored.filter(|p| !p.is_placeholder()) else {
            let profile = self.create_profile(identity, None, device, now).await?;
            return Ok((session_user(identity, &profile, profile.role.unwrap_or_default()), true));
        };

        let role = if self.role_for_email(identity.email.as_deref()) == Role::Admin {
            if profile.role != Some(Role::Admin) {
                self.db
                    .update_document(
                        collections::USERS,
                        uid,
                        &RoleWrite { role: Role::Admin },
                        &["role"],
                    )
                    .await?;
                tracing::info!(uid, "Granted admin role to reserved address");
            }
            Role::Admin
        } else {
            profile.role.unwrap_or_default()
        };

        let mut profile = profile;
        if let Some(session) = profile.session_data.as_mut() {
            self.db
                .update_document(
                    collections::USERS,
                    uid,
                    &LivenessWrite {
                        last_active: now,
                        session_data: LivenessSession { last_active: now },
                    },
                    &["lastActive", "sessionData.lastActive"],
                )
                .await?;
            session.last_active = Some(now);
        }

        tracing::debug!(uid, role = role.as_str(), "Profile reconciled");
        Ok((session_user(identity, &profile, role), false))
    }

    /// Write the default profile for `identity` (upsert).
    ///
    /// Any `sessionData` already stored under the key is carried over so a
    /// racing session write is not lost. A requested `admin` role is only
    /// honoured for the reserved address.
    pub async fn create_profile(
        &self,
        identity: &Identity,
        requested_role: Option<Role>,
        device: &str,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, StoreError> {
        let uid = identity.uid.as_str();
        let role = self.role_for_email(identity.email.as_deref());
        if requested_role == Some(Role::Admin) && role != Role::Admin {
            tracing::info!(uid, "Ignoring requested admin role for non-reserved address");
        }

        let existing = self.get_profile(uid).await?;
        let mut session = existing
            .and_then(|p| p.session_data)
            .unwrap_or_default();
        session.device_info = device.to_string();
        session.last_active = Some(now);
        session.push_login(LoginEntry {
            timestamp: now,
            device: device.to_string(),
        });

        let profile = UserProfile {
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            role: Some(role),
            created_at: Some(now),
            last_login: Some(now),
            last_active: Some(now),
            last_updated: Some(now),
            session_data: Some(session),
            ..UserProfile::default()
        };

        self.db.set_document(collections::USERS, uid, &profile).await?;
        tracing::info!(uid, role = role.as_str(), "Created user profile");

        Ok(profile)
    }

    /// Stamp a sign-in on an existing profile.
    ///
    /// Returns `false` without writing when no profile exists yet (or only
    /// session data does); the reconciliation that follows creates it.
    pub async fn record_sign_in(
        &self,
        uid: &str,
        device: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(profile) = self.get_profile(uid).await?.filter(|p| !p.is_placeholder()) else {
            return Ok(false);
        };

        let mut session = profile.session_data.unwrap_or_default();
        session.last_active = Some(now);
        session.push_login(LoginEntry {
            timestamp: now,
            device: device.to_string(),
        });

        self.db
            .update_document(
                collections::USERS,
                uid,
                &SignInWrite {
                    last_login: now,
                    last_active: now,
                    session_data: session,
                },
                &["lastLogin", "lastActive", "sessionData"],
            )
            .await?;

        Ok(true)
    }

    /// Merge `update` into the stored session data and return the result.
    pub async fn update_session(
        &self,
        uid: &str,
        update: &SessionUpdate,
        now: DateTime<Utc>,
    ) -> Result<SessionData, StoreError> {
        match self.get_profile(uid).await? {
            None => {
                let mut session = SessionData::default().merge(update);
                session.last_active = Some(now);
                let write = SessionWrite {
                    session_data: session.clone(),
                    last_updated: now,
                    last_active: now,
                };
                self.db.set_document(collections::USERS, uid, &write).await?;
                tracing::debug!(uid, "Session data written to new document");
                Ok(session)
            }
            Some(profile) => {
                let mut session = profile.session_data.unwrap_or_default().merge(update);
                session.last_active = Some(now);
                let write = SessionWrite {
                    session_data: session.clone(),
                    last_updated: now,
                    last_active: now,
                };
                self.db
                    .update_document(
                        collections::USERS,
                        uid,
                        &write,
                        &["sessionData", "lastUpdated", "lastActive"],
                    )
                    .await?;
                tracing::debug!(uid, "Session data merged");
                Ok(session)
            }
        }
    }

    pub async fn update_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut paths = update.field_paths();
        paths.push("lastUpdated");

        self.db
            .update_document(
                collections::USERS,
                uid,
                &ProfileWrite {
                    update,
                    last_updated: now,
                },
                &paths,
            )
            .await
    }

    /// Role used for access checks. Read-only: never writes.
    pub async fn resolve_role(&self, uid: &str, email: Option<&str>) -> Role {
        let email_role = self.role_for_email(email);
        if email_role == Role::Admin {
            return Role::Admin;
        }

        match self.get_profile(uid).await {
            Ok(Some(profile)) => profile.role.unwrap_or_default(),
            Ok(None) => email_role,
            Err(e) => {
                tracing::warn!(uid, error = %e, "Role lookup failed, using email role rule");
                email_role
            }
        }
    }

    /// Accept a resume upload.
    ///
    /// Object storage is disabled: nothing leaves the process. The file is
    /// recorded under a synthetic `local://` reference and the session is
    /// marked as having an uploaded resume.
    pub async fn upload_object(
        &self,
        uid: &str,
        file_name: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<UploadReceipt, StoreError> {
        let reference = format!("local://resumes/{}/{}", uid, urlencoding::encode(file_name));
        tracing::info!(uid, size = bytes.len(), reference = %reference, "Resume upload recorded locally");

        let update = SessionUpdate {
            resume_uploaded: Some(true),
            resume_url: Some(reference.clone()),
            resume_file_name: Some(file_name.to_string()),
            ..SessionUpdate::default()
        };
        let session_data = self.update_session(uid, &update, now).await?;

        Ok(UploadReceipt {
            reference,
            session_data,
        })
    }
}

fn session_user(identity: &Identity, profile: &UserProfile, role: Role) -> SessionUser {
    SessionUser {
        uid: identity.uid.clone(),
        email: identity.email.clone().or_else(|| profile.email.clone()),
        display_name: identity
            .display_name
            .clone()
            .or_else(|| profile.display_name.clone()),
        role,
        session_data: profile.session_data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UpdatePolicy;
    use chrono::TimeZone;

    const ADMIN: &str = "admin@mavericks.com";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap()
    }

    fn identity(uid: &str, email: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: Some(email.to_string()),
            display_name: Some("Test".to_string()),
            id_token: None,
        }
    }

    fn service() -> ProfileService {
        ProfileService::new(FirestoreDb::new_in_memory(UpdatePolicy::FailIfMissing), ADMIN)
    }

    #[tokio::test]
    async fn test_first_reconcile_creates_admin_profile() {
        let profiles = service();

        let outcome = profiles
            .reconcile(&identity("a1", ADMIN), "Chrome", now())
            .await;

        assert!(outcome.created);
        assert!(!outcome.degraded);
        assert_eq!(outcome.user.role, Role::Admin);

        let stored = profiles.get_profile("a1").await.unwrap().unwrap();
        assert_eq!(stored.role, Some(Role::Admin));
        assert_eq!(stored.points, 0);
        assert!(stored.badges.is_empty());
        assert_eq!(stored.progress, Default::default());
        let session = stored.session_data.unwrap();
        assert_eq!(session.login_history.len(), 1);
        assert_eq!(session.login_history[0].device, "Chrome");
    }

    #[tokio::test]
    async fn test_reserved_address_overrides_stored_user_role() {
        let profiles = service();
        let mut stale = UserProfile {
            email: Some(ADMIN.to_string()),
            role: Some(Role::User),
            ..UserProfile::default()
        };
        stale.points = 12;
        profiles
            .db
            .set_document(collections::USERS, "a2", &stale)
            .await
            .unwrap();

        let outcome = profiles.reconcile(&identity("a2", ADMIN), "x", now()).await;

        assert_eq!(outcome.user.role, Role::Admin);
        let stored = profiles.get_profile("a2").await.unwrap().unwrap();
        assert_eq!(stored.role, Some(Role::Admin));
        assert_eq!(stored.points, 12);
    }

    #[tokio::test]
    async fn test_other_addresses_keep_stored_role() {
        let profiles = service();
        for (uid, role) in [("u1", Some(Role::Admin)), ("u2", Some(Role::User)), ("u3", None)] {
            let profile = UserProfile {
                email: Some("a@b.com".to_string()),
                role,
                ..UserProfile::default()
            };
            profiles
                .db
                .set_document(collections::USERS, uid, &profile)
                .await
                .unwrap();
        }

        let r1 = profiles.reconcile(&identity("u1", "a@b.com"), "x", now()).await;
        let r2 = profiles.reconcile(&identity("u2", "a@b.com"), "x", now()).await;
        let r3 = profiles.reconcile(&identity("u3", "a@b.com"), "x", now()).await;

        assert_eq!(r1.user.role, Role::Admin);
        assert_eq!(r2.user.role, Role::User);
        assert_eq!(r3.user.role, Role::User);
        assert_eq!(profiles.get_profile("u3").await.unwrap().unwrap().role, None);
    }

    #[tokio::test]
    async fn test_reconcile_stamps_liveness_on_session() {
        let profiles = service();
        profiles
            .create_profile(&identity("s1", "s@b.com"), None, "Safari", now())
            .await
            .unwrap();

        let later = now() + chrono::Duration::hours(2);
        let outcome = profiles
            .reconcile(&identity("s1", "s@b.com"), "Safari", later)
            .await;

        let session = outcome.user.session_data.unwrap();
        assert_eq!(session.last_active, Some(later));
        let stored = profiles.get_profile("s1").await.unwrap().unwrap();
        assert_eq!(stored.last_active, Some(later));
        assert_eq!(stored.session_data.unwrap().last_active, Some(later));
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_email_rule() {
        let profiles = ProfileService::new(FirestoreDb::new_mock(), ADMIN);

        let admin = profiles.reconcile(&identity("a", ADMIN), "x", now()).await;
        let user = profiles.reconcile(&identity("b", "b@b.com"), "x", now()).await;

        assert!(admin.degraded);
        assert_eq!(admin.user.role, Role::Admin);
        assert!(user.degraded);
        assert_eq!(user.user.role, Role::User);
        assert!(user.user.session_data.is_none());
    }

    #[tokio::test]
    async fn test_requested_admin_role_is_not_granted() {
        let profiles = service();
        let profile = profiles
            .create_profile(&identity("n1", "new@b.com"), Some(Role::Admin), "x", now())
            .await
            .unwrap();
        assert_eq!(profile.role, Some(Role::User));
    }

    #[tokio::test]
    async fn test_create_profile_keeps_racing_session_data() {
        let profiles = service();
        profiles
            .update_session(
                "r1",
                &SessionUpdate {
                    resume_uploaded: Some(true),
                    resume_url: Some("local://resumes/r1/cv.pdf".to_string()),
                    ..SessionUpdate::default()
                },
                now(),
            )
            .await
            .unwrap();

        let profile = profiles
            .create_profile(&identity("r1", "r@b.com"), None, "x", now())
            .await
            .unwrap();

        let session = profile.session_data.unwrap();
        assert!(session.resume_uploaded);
        assert_eq!(session.login_history.len(), 1);
    }

    #[tokio::test]
    async fn test_session_only_document_gets_full_profile_on_sign_in() {
        let profiles = service();
        profiles
            .update_session(
                "o1",
                &SessionUpdate {
                    resume_uploaded: Some(true),
                    resume_url: Some("local://resumes/o1/cv.pdf".to_string()),
                    ..SessionUpdate::default()
                },
                now(),
            )
            .await
            .unwrap();
        let placeholder = profiles.get_profile("o1").await.unwrap().unwrap();
        assert!(placeholder.is_placeholder());
        assert!(!profiles.record_sign_in("o1", "x", now()).await.unwrap());

        let later = now() + chrono::Duration::minutes(5);
        let outcome = profiles
            .reconcile(&identity("o1", "o@b.com"), "Firefox", later)
            .await;
        assert!(outcome.created);
        assert!(!outcome.degraded);

        let stored = profiles.get_profile("o1").await.unwrap().unwrap();
        assert!(!stored.is_placeholder());
        assert_eq!(stored.email.as_deref(), Some("o@b.com"));
        assert_eq!(stored.role, Some(Role::User));
        assert_eq!(stored.created_at, Some(later));
        let session = stored.session_data.unwrap();
        assert!(session.resume_uploaded);
        assert_eq!(session.resume_url.as_deref(), Some("local://resumes/o1/cv.pdf"));
        assert_eq!(session.login_history.len(), 1);
    }

    #[tokio::test]
    async fn test_record_sign_in_appends_history() {
        let profiles = service();
        assert!(!profiles.record_sign_in("m1", "x", now()).await.unwrap());

        profiles
            .create_profile(&identity("m1", "m@b.com"), None, "first", now())
            .await
            .unwrap();
        let later = now() + chrono::Duration::days(1);
        assert!(profiles.record_sign_in("m1", "second", later).await.unwrap());

        let stored = profiles.get_profile("m1").await.unwrap().unwrap();
        assert_eq!(stored.last_login, Some(later));
        let history = stored.session_data.unwrap().login_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].device, "second");
    }

    #[tokio::test]
    async fn test_update_session_merges_monotonically() {
        let profiles = service();
        profiles
            .create_profile(&identity("m2", "m@b.com"), None, "x", now())
            .await
            .unwrap();
        profiles
            .update_session(
                "m2",
                &SessionUpdate {
                    assessment_started: Some(true),
                    assessment_progress: Some(serde_json::Map::from_iter([(
                        "section".to_string(),
                        serde_json::json!("arrays"),
                    )])),
                    ..SessionUpdate::default()
                },
                now(),
            )
            .await
            .unwrap();

        let merged = profiles
            .update_session(
                "m2",
                &SessionUpdate {
                    current_step: Some("results".to_string()),
                    ..SessionUpdate::default()
                },
                now(),
            )
            .await
            .unwrap();

        assert!(merged.assessment_started);
        assert!(merged.assessment_progress.is_some());
        assert_eq!(merged.current_step, "results");
        assert_eq!(merged.login_history.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_object_marks_resume() {
        let profiles = service();
        let receipt = profiles
            .upload_object("up1", "my cv.pdf", b"%PDF-1.4", now())
            .await
            .unwrap();

        assert_eq!(receipt.reference, "local://resumes/up1/my%20cv.pdf");
        assert!(receipt.session_data.resume_uploaded);
        assert_eq!(receipt.session_data.resume_file_name, "my cv.pdf");

        let stored = profiles.get_profile("up1").await.unwrap().unwrap();
        let session = stored.session_data.unwrap();
        assert_eq!(session.resume_url.as_deref(), Some(receipt.reference.as_str()));
    }

    #[tokio::test]
    async fn test_update_profile_respects_missing_policy() {
        let profiles = service();
        let update = ProfileUpdate {
            points: Some(50),
            ..ProfileUpdate::default()
        };

        let err = profiles.update_profile("ghost", &update, now()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        profiles
            .create_profile(&identity("p1", "p@b.com"), None, "x", now())
            .await
            .unwrap();
        profiles.update_profile("p1", &update, now()).await.unwrap();
        let stored = profiles.get_profile("p1").await.unwrap().unwrap();
        assert_eq!(stored.points, 50);
        assert_eq!(stored.email.as_deref(), Some("p@b.com"));
    }

    #[tokio::test]
    async fn test_resolve_role_is_read_only() {
        let profiles = service();
        assert_eq!(profiles.resolve_role("none", Some(ADMIN)).await, Role::Admin);
        assert!(profiles.get_profile("none").await.unwrap().is_none());
        assert_eq!(profiles.resolve_role("none", Some("x@y.z")).await, Role::User);
    }
}
