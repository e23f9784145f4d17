// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed metadata store.
//!
//! Collections:
//! - `routes` (document ID is the numeric route ID)
//! - `cafes` (document ID is the numeric cafe ID)

use crate::db::{add_unique_email, collections, remove_pass, upsert_pass, RouteStore};
use crate::error::AppError;
use crate::models::route::track_filename;
use crate::models::{Cafe, CafePass, Direction, NewCafe, NewRoute, RouteRecord};
use async_trait::async_trait;
use firestore::errors::{BackoffError, FirestoreError};
use std::sync::Arc;

/// Attempts at creating a document under a freshly allocated ID.
const MAX_ID_ATTEMPTS: u32 = 3;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
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
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an unconnected client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Highest ID in use in `collection`, or 0 if empty.
    async fn max_id<T>(&self, collection: &str) -> Result<u64, AppError>
    where
        T: serde::de::DeserializeOwned + Send + HasId,
    {
        let newest: Vec<T> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .order_by([("id", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(newest.first().map(HasId::id).unwrap_or(0))
    }

    /// Read-modify-write a route in a Firestore transaction. The read
    /// goes through the transaction, so a concurrent write to the same
    /// route aborts the commit and the edit is retried on fresh data.
    async fn modify_route<F>(&self, route_id: u64, f: F) -> Result<(), AppError>
    where
        F: Fn(&mut RouteRecord) + Send + Sync + 'static,
    {
        let f = Arc::new(f);

        let found = self
            .get_client()?
            .run_transaction(move |db, transaction| {
                let f = f.clone();
                Box::pin(async move {
                    let current: Option<RouteRecord> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ROUTES)
                        .obj()
                        .one(&route_id.to_string())
                        .await?;

                    let Some(mut route) = current else {
                        return Ok(false);
                    };

                    (*f)(&mut route);

                    db.fluent()
                        .update()
                        .in_col(collections::ROUTES)
                        .document_id(route_id.to_string())
                        .object(&route)
                        .add_to_transaction(transaction)?;

                    Ok::<bool, BackoffError<FirestoreError>>(true)
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Route transaction failed: {}", e)))?;

        if !found {
            return Err(AppError::NotFound(format!("Route {}", route_id)));
        }
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, doc_id: u64) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id.to_string())
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Documents keyed by a numeric ID field.
trait HasId {
    fn id(&self) -> u64;
}

impl HasId for RouteRecord {
    fn id(&self) -> u64 {
        self.id
    }
}

impl HasId for Cafe {
    fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl RouteStore for FirestoreDb {
    fn backend_tag(&self) -> &'static str {
        "firestore"
    }

    async fn insert_route(
        &self,
        route: NewRoute,
        created_at: String,
    ) -> Result<RouteRecord, AppError> {
        let mut last_err = None;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = self.max_id::<RouteRecord>(collections::ROUTES).await? + 1;
            let record = RouteRecord {
                id,
                filename: track_filename(id),
                name: route.name.clone(),
                length_km: 0.0,
                ascent_m: 0.0,
                cafes_passed: Vec::new(),
                owner_email: route.owner_email.clone(),
                created_at: created_at.clone(),
                public: false,
                route_type: route.route_type,
                details: route.details.clone(),
                downloads: Vec::new(),
                direction: Direction::Unknown,
            };

            // insert() refuses to overwrite, so a racing upload that took
            // the same ID sends us round again.
            let result: Result<(), _> = self
                .get_client()?
                .fluent()
                .insert()
                .into(collections::ROUTES)
                .document_id(id.to_string())
                .object(&record)
                .execute()
                .await;

            match result {
                Ok(()) => return Ok(record),
                Err(e) => {
                    tracing::warn!(route_id = id, attempt, error = %e, "Route ID allocation failed");
                    last_err = Some(e);
                }
            }
        }

        Err(AppError::Database(format!(
            "Failed to allocate route ID: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn get_route(&self, route_id: u64) -> Result<Option<RouteRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ROUTES)
            .obj()
            .one(&route_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_routes(&self) -> Result<Vec<RouteRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ROUTES)
            .order_by([("id", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_stats(
        &self,
        route_id: u64,
        length_km: f64,
        ascent_m: f64,
    ) -> Result<(), AppError> {
        self.modify_route(route_id, move |r| {
            r.length_km = length_km;
            r.ascent_m = ascent_m;
        })
        .await
    }

    async fn set_direction(&self, route_id: u64, direction: Direction) -> Result<(), AppError> {
        self.modify_route(route_id, move |r| r.direction = direction).await
    }

    async fn set_public(&self, route_id: u64, public: bool) -> Result<(), AppError> {
        self.modify_route(route_id, move |r| r.public = public).await
    }

    async fn set_cafe_passes(
        &self,
        route_id: u64,
        passes: Vec<CafePass>,
    ) -> Result<(), AppError> {
        self.modify_route(route_id, move |r| r.cafes_passed = passes.clone())
            .await
    }

    async fn upsert_cafe_pass(&self, route_id: u64, pass: CafePass) -> Result<(), AppError> {
        self.modify_route(route_id, move |r| upsert_pass(&mut r.cafes_passed, pass))
            .await
    }

    async fn remove_cafe_pass(&self, route_id: u64, cafe_id: u64) -> Result<(), AppError> {
        self.modify_route(route_id, move |r| remove_pass(&mut r.cafes_passed, cafe_id))
            .await
    }

    async fn record_download(&self, route_id: u64, email: &str) -> Result<(), AppError> {
        let email = email.to_string();
        self.modify_route(route_id, move |r| {
            add_unique_email(&mut r.downloads, &email);
        })
        .await
    }

    async fn delete_route(&self, route_id: u64) -> Result<(), AppError> {
        self.delete_doc(collections::ROUTES, route_id).await
    }

    async fn list_cafes(&self) -> Result<Vec<Cafe>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CAFES)
            .order_by([("id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert_cafe(&self, cafe: NewCafe) -> Result<Cafe, AppError> {
        let id = self.max_id::<Cafe>(collections::CAFES).await? + 1;
        let cafe = Cafe {
            id,
            name: cafe.name,
            lat: cafe.lat,
            lon: cafe.lon,
        };

        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::CAFES)
            .document_id(id.to_string())
            .object(&cafe)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(cafe)
    }

    async fn delete_cafe(&self, cafe_id: u64) -> Result<(), AppError> {
        self.delete_doc(collections::CAFES, cafe_id).await
    }
}
