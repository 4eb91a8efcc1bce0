// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session persistence and auth-state notifications.

use crate::error::ConfigurationError;
use crate::models::SessionUser;
use crate::services::identity::Identity;
use crate::services::profile::{ProfileService, ReconcileOutcome};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Buffered auth events per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 64;

/// How long a client keeps its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceMode {
    /// Survives browser restarts
    #[default]
    Local,
    /// Ends with the browser session
    Session,
    /// Not persisted at all
    None,
}

impl PersistenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceMode::Local => "local",
            PersistenceMode::Session => "session",
            PersistenceMode::None => "none",
        }
    }
}

impl std::str::FromStr for PersistenceMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(PersistenceMode::Local),
            "session" => Ok(PersistenceMode::Session),
            "none" => Ok(PersistenceMode::None),
            _ => Err(ConfigurationError::InvalidPersistenceMode(s.to_string())),
        }
    }
}

/// Select a persistence mode.
///
/// Never fails: an unrecognised mode is logged and the default is kept.
/// The flag reports whether the requested mode was applied.
pub fn set_persistence_mode(raw: &str) -> (PersistenceMode, bool) {
    match raw.parse::<PersistenceMode>() {
        Ok(mode) => (mode, true),
        Err(e) => {
            tracing::warn!(error = %e, "Keeping default session persistence");
            (PersistenceMode::default(), false)
        }
    }
}

/// An auth-state transition. `user` is `None` on sign-out.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub uid: String,
    pub user: Option<SessionUser>,
}

/// Handle for an auth-state subscription. Dropping it unsubscribes.
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop delivering events to the callback. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

struct HubInner {
    profiles: ProfileService,
    sender: Mutex<Option<broadcast::Sender<AuthChange>>>,
}

/// Fan-out of enriched auth-state changes.
///
/// Sign-ins are reconciled with the profile store before subscribers see
/// them, so every delivered user carries its resolved role.
#[derive(Clone)]
pub struct AuthStateHub {
    inner: Arc<HubInner>,
}

impl AuthStateHub {
    pub fn new(profiles: ProfileService) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(HubInner {
                profiles,
                sender: Mutex::new(Some(sender)),
            }),
        }
    }

    fn sender(&self) -> Option<broadcast::Sender<AuthChange>> {
        match self.inner.sender.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Register `callback` for every later auth-state change.
    ///
    /// Must be called within a tokio runtime. After `close` the returned
    /// subscription is already inactive.
    pub fn subscribe_auth_state<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthChange) + Send + 'static,
    {
        let Some(sender) = self.sender() else {
            return Subscription { handle: None };
        };
        let mut receiver = sender.subscribe();
        drop(sender);

        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => callback(change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth-state subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Subscription {
            handle: Some(handle),
        }
    }

    /// Reconcile a fresh sign-in and notify subscribers.
    pub async fn signed_in(&self, identity: &Identity, device: &str) -> ReconcileOutcome {
        let outcome = self.inner.profiles.reconcile(identity, device, Utc::now()).await;
        self.publish(AuthChange {
            uid: identity.uid.clone(),
            user: Some(outcome.user.clone()),
        });
        outcome
    }

    pub fn signed_out(&self, uid: &str) {
        self.publish(AuthChange {
            uid: uid.to_string(),
            user: None,
        });
    }

    fn publish(&self, change: AuthChange) {
        if let Some(sender) = self.sender() {
            // Err only means there are no subscribers right now
            let _ = sender.send(change);
        }
    }

    /// Close the hub. Subscribers finish once buffered events are delivered.
    pub fn close(&self) {
        let sender = match self.inner.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if sender.is_some() {
            tracing::info!("Auth-state hub closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FirestoreDb, UpdatePolicy};
    use crate::models::Role;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn hub() -> AuthStateHub {
        AuthStateHub::new(ProfileService::new(
            FirestoreDb::new_in_memory(UpdatePolicy::Upsert),
            "admin@mavericks.com",
        ))
    }

    fn identity(uid: &str, email: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: Some(email.to_string()),
            display_name: None,
            id_token: None,
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<AuthChange>) -> AuthChange {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for auth change")
            .expect("channel closed")
    }

    #[test]
    fn test_persistence_modes() {
        assert_eq!("LOCAL".parse::<PersistenceMode>().unwrap(), PersistenceMode::Local);
        assert_eq!("session".parse::<PersistenceMode>().unwrap(), PersistenceMode::Session);
        assert_eq!("none".parse::<PersistenceMode>().unwrap(), PersistenceMode::None);
        assert!(matches!(
            "forever".parse::<PersistenceMode>(),
            Err(ConfigurationError::InvalidPersistenceMode(_))
        ));
    }

    #[test]
    fn test_invalid_persistence_is_swallowed() {
        assert_eq!(set_persistence_mode("session"), (PersistenceMode::Session, true));
        assert_eq!(set_persistence_mode("bogus"), (PersistenceMode::Local, false));
    }

    #[tokio::test]
    async fn test_subscriber_sees_enriched_sign_in_and_sign_out() {
        let hub = hub();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = hub.subscribe_auth_state(move |change| {
            let _ = tx.send(change);
        });

        hub.signed_in(&identity("a1", "admin@mavericks.com"), "test").await;
        hub.signed_out("a1");

        let first = next(&mut rx).await;
        assert_eq!(first.uid, "a1");
        assert_eq!(first.user.unwrap().role, Role::Admin);

        let second = next(&mut rx).await;
        assert_eq!(second.uid, "a1");
        assert!(second.user.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let hub = hub();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscription = hub.subscribe_auth_state(move |change| {
            let _ = tx.send(change);
        });
        assert!(subscription.is_active());

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());

        hub.signed_out("u1");
        // The callback owned the only sender; aborting the task dropped it.
        let result = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let hub = hub();
        let (tx, mut rx) = mpsc::unbounded_channel::<AuthChange>();
        let subscription = hub.subscribe_auth_state(move |change| {
            let _ = tx.send(change);
        });

        hub.close();
        hub.close();

        let result = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(matches!(result, Ok(None)));
        tokio::time::timeout(Duration::from_secs(2), async {
            while subscription.is_active() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscription task did not finish");

        let late = hub.subscribe_auth_state(|_| {});
        assert!(!late.is_active());
    }
}
