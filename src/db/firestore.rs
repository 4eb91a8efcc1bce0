// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document store client with typed operations.
//!
//! Records are (de)serialized with serde at this boundary, so everything
//! above it works with strongly-typed models instead of loose maps.
//! Three backends share one API:
//! - Firestore (production, or the emulator via FIRESTORE_EMULATOR_HOST)
//! - In-memory (tests and local development)
//! - Offline (every call fails)

use crate::db::memory::MemoryStore;
use crate::db::{random_id, Document, UpdatePolicy, DOCUMENT_ID_LEN};
use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
    Offline,
}

/// Document store client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
    update_policy: UpdatePolicy,
}

fn transport(e: firestore::errors::FirestoreError) -> StoreError {
    match e {
        firestore::errors::FirestoreError::DeserializeError(err) => {
            StoreError::Serialization(err.to_string())
        }
        other => StoreError::Transport(other.to_string()),
    }
}

fn to_json<T: Serialize>(data: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_or_skip<T>(
    collection: &str,
    id: String,
    decoded: Result<T, StoreError>,
) -> Option<Document<T>> {
    match decoded {
        Ok(data) => Some(Document { id, data }),
        Err(e) => {
            tracing::warn!(collection, id = %id, error = %e, "Skipping malformed document");
            None
        }
    }
}

impl FirestoreDb {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, update_policy: UpdatePolicy) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, update_policy).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Transport(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, ?update_policy, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
            update_policy,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(
        project_id: &str,
        update_policy: UpdatePolicy,
    ) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Transport(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
            update_policy,
        })
    }

    /// Create a client backed by a fresh in-process store.
    pub fn new_in_memory(update_policy: UpdatePolicy) -> Self {
        Self::with_memory_store(Arc::new(MemoryStore::new()), update_policy)
    }

    /// Create a client over an existing in-process store (shared with a test).
    pub fn with_memory_store(store: Arc<MemoryStore>, update_policy: UpdatePolicy) -> Self {
        Self {
            backend: Backend::Memory(store),
            update_policy,
        }
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
            update_policy: UpdatePolicy::default(),
        }
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        self.update_policy
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Read one document. `Ok(None)` is the "not found" sentinel.
    pub async fn read_document<T>(&self, collection: &str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(transport),
            Backend::Memory(store) => store.get(collection, id).map(from_json).transpose(),
            Backend::Offline => Err(StoreError::Offline),
        }
    }

    /// List documents, optionally ordered ascending by `order_by` and capped
    /// at `limit`. Documents without the ordering field are not returned.
    ///
    /// Each document is decoded on its own; one that does not fit `T` is
    /// logged and skipped rather than failing the whole listing.
    pub async fn list_documents<T>(
        &self,
        collection: &str,
        order_by: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Document<T>>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let mut query = client.fluent().select().from(collection);
                if let Some(field) = order_by {
                    query = query
                        .order_by([(field, firestore::FirestoreQueryDirection::Ascending)]);
                }
                if let Some(limit) = limit {
                    query = query.limit(limit);
                }

                let docs = query.query().await.map_err(transport)?;

                Ok(docs
                    .iter()
                    .filter_map(|doc| {
                        let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
                        let decoded = firestore::FirestoreDb::deserialize_doc_to::<T>(doc)
                            .map_err(|e| StoreError::Serialization(e.to_string()));
                        decode_or_skip(collection, id, decoded)
                    })
                    .collect())
            }
            Backend::Memory(store) => Ok(store
                .list(collection, order_by, limit)
                .into_iter()
                .filter_map(|(id, value)| decode_or_skip(collection, id, from_json(value)))
                .collect()),
            Backend::Offline => Err(StoreError::Offline),
        }
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Store a new document under a generated key and return it as read back.
    pub async fn create_document<T>(
        &self,
        collection: &str,
        data: &T,
    ) -> Result<Document<T>, StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let id = random_id(DOCUMENT_ID_LEN)?;

        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .insert()
                    .into(collection)
                    .document_id(&id)
                    .object(data)
                    .execute()
                    .await
                    .map_err(transport)?;
            }
            Backend::Memory(store) => store.put(collection, &id, to_json(data)?),
            Backend::Offline => return Err(StoreError::Offline),
        }

        let stored = self
            .read_document(collection, &id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.clone(),
            })?;

        tracing::debug!(collection, id = %id, "Document created");
        Ok(Document { id, data: stored })
    }

    /// Create or replace a document (upsert).
    pub async fn set_document<T>(&self, collection: &str, id: &str, data: &T) -> Result<(), StoreError>
    where
        T: Serialize + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let value = to_json(data)?;
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id)
                    .object(&value)
                    .execute()
                    .await
                    .map_err(transport)?;
            }
            Backend::Memory(store) => store.put(collection, id, to_json(data)?),
            Backend::Offline => return Err(StoreError::Offline),
        }
        Ok(())
    }

    /// Write only `field_paths` (dotted for nested fields) of `partial`.
    ///
    /// A missing target is handled per the configured `UpdatePolicy`.
    pub async fn update_document<T>(
        &self,
        collection: &str,
        id: &str,
        partial: &T,
        field_paths: &[&str],
    ) -> Result<(), StoreError>
    where
        T: Serialize + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let value = to_json(partial)?;
                let builder = client
                    .fluent()
                    .update()
                    .fields(field_paths.iter().copied())
                    .in_col(collection);

                let builder = match self.update_policy {
                    UpdatePolicy::FailIfMissing => {
                        builder.precondition(firestore::FirestoreWritePrecondition::Exists(true))
                    }
                    UpdatePolicy::Upsert => builder,
                };

                let _: () = builder
                    .document_id(id)
                    .object(&value)
                    .execute()
                    .await
                    .map_err(|e| match e {
                        firestore::errors::FirestoreError::DataNotFoundError(_) => {
                            StoreError::NotFound {
                                collection: collection.to_string(),
                                id: id.to_string(),
                            }
                        }
                        other => transport(other),
                    })?;
                Ok(())
            }
            Backend::Memory(store) => store.update_fields(
                collection,
                id,
                &to_json(partial)?,
                field_paths,
                self.update_policy,
            ),
            Backend::Offline => Err(StoreError::Offline),
        }
    }
}
