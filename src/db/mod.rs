// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route and cafe metadata storage.
//!
//! Handlers and services work against [`RouteStore`]; production uses
//! Firestore and tests or local runs use the in-memory store.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Cafe, CafePass, Direction, NewCafe, NewRoute, RouteRecord};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const ROUTES: &str = "routes";
    pub const CAFES: &str = "cafes";
}

#[async_trait]
pub trait RouteStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Create a route record with a fresh ID, zero stats and the
    /// `gpx_{id}.gpx` filename.
    async fn insert_route(&self, route: NewRoute, created_at: String)
        -> Result<RouteRecord, AppError>;

    async fn get_route(&self, route_id: u64) -> Result<Option<RouteRecord>, AppError>;

    /// All routes, newest first.
    async fn list_routes(&self) -> Result<Vec<RouteRecord>, AppError>;

    /// Store rounded length and ascent.
    async fn update_stats(
        &self,
        route_id: u64,
        length_km: f64,
        ascent_m: f64,
    ) -> Result<(), AppError>;

    async fn set_direction(&self, route_id: u64, direction: Direction) -> Result<(), AppError>;

    async fn set_public(&self, route_id: u64, public: bool) -> Result<(), AppError>;

    /// Replace the whole cafe list, for a route whose track changed.
    async fn set_cafe_passes(&self, route_id: u64, passes: Vec<CafePass>)
        -> Result<(), AppError>;

    /// Add or replace the pass for `pass.cafe_id`. Other passes are kept
    /// as currently stored.
    async fn upsert_cafe_pass(&self, route_id: u64, pass: CafePass) -> Result<(), AppError>;

    /// Drop the pass for `cafe_id`, if the route has one.
    async fn remove_cafe_pass(&self, route_id: u64, cafe_id: u64) -> Result<(), AppError>;

    /// Add `email` to the route's downloaders if not already present.
    async fn record_download(&self, route_id: u64, email: &str) -> Result<(), AppError>;

    async fn delete_route(&self, route_id: u64) -> Result<(), AppError>;

    async fn list_cafes(&self) -> Result<Vec<Cafe>, AppError>;

    async fn insert_cafe(&self, cafe: NewCafe) -> Result<Cafe, AppError>;

    async fn delete_cafe(&self, cafe_id: u64) -> Result<(), AppError>;
}

/// Append `email` unless an equal (case-insensitive) entry exists.
pub(crate) fn add_unique_email(emails: &mut Vec<String>, email: &str) -> bool {
    if emails.iter().any(|e| e.eq_ignore_ascii_case(email)) {
        return false;
    }
    emails.push(email.to_string());
    true
}

/// Put `pass` in place of any pass for the same cafe.
pub(crate) fn upsert_pass(passes: &mut Vec<CafePass>, pass: CafePass) {
    match passes.iter_mut().find(|p| p.cafe_id == pass.cafe_id) {
        Some(existing) => *existing = pass,
        None => passes.push(pass),
    }
}

pub(crate) fn remove_pass(passes: &mut Vec<CafePass>, cafe_id: u64) {
    passes.retain(|p| p.cafe_id != cafe_id);
}
