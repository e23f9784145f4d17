// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory metadata store for tests and offline runs.

use crate::db::{add_unique_email, remove_pass, upsert_pass, RouteStore};
use crate::error::AppError;
use crate::models::route::track_filename;
use crate::models::{Cafe, CafePass, Direction, NewCafe, NewRoute, RouteRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    routes: DashMap<u64, RouteRecord>,
    cafes: DashMap<u64, Cafe>,
    next_route_id: AtomicU64,
    next_cafe_id: AtomicU64,
    /// Number of upcoming `update_stats` calls that should fail.
    failing_stats_updates: AtomicU32,
    failing_direction_updates: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` stats updates fail.
    pub fn fail_next_stats_updates(&self, count: u32) {
        self.failing_stats_updates.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` direction updates fail.
    pub fn fail_next_direction_updates(&self, count: u32) {
        self.failing_direction_updates.store(count, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn with_route<F>(&self, route_id: u64, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut RouteRecord),
    {
        let mut route = self
            .routes
            .get_mut(&route_id)
            .ok_or_else(|| AppError::NotFound(format!("Route {}", route_id)))?;
        f(route.value_mut());
        Ok(())
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert_route(
        &self,
        route: NewRoute,
        created_at: String,
    ) -> Result<RouteRecord, AppError> {
        let id = self.next_route_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = RouteRecord {
            id,
            filename: track_filename(id),
            name: route.name,
            length_km: 0.0,
            ascent_m: 0.0,
            cafes_passed: Vec::new(),
            owner_email: route.owner_email,
            created_at,
            public: false,
            route_type: route.route_type,
            details: route.details,
            downloads: Vec::new(),
            direction: Direction::Unknown,
        };
        self.routes.insert(id, record.clone());
        Ok(record)
    }

    async fn get_route(&self, route_id: u64) -> Result<Option<RouteRecord>, AppError> {
        Ok(self.routes.get(&route_id).map(|r| r.clone()))
    }

    async fn list_routes(&self) -> Result<Vec<RouteRecord>, AppError> {
        let mut routes: Vec<RouteRecord> = self.routes.iter().map(|r| r.clone()).collect();
        routes.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(routes)
    }

    async fn update_stats(
        &self,
        route_id: u64,
        length_km: f64,
        ascent_m: f64,
    ) -> Result<(), AppError> {
        if Self::take_failure(&self.failing_stats_updates) {
            return Err(AppError::Database("Injected stats failure".to_string()));
        }

        self.with_route(route_id, |r| {
            r.length_km = length_km;
            r.ascent_m = ascent_m;
        })
    }

    async fn set_direction(&self, route_id: u64, direction: Direction) -> Result<(), AppError> {
        if Self::take_failure(&self.failing_direction_updates) {
            return Err(AppError::Database("Injected direction failure".to_string()));
        }
        self.with_route(route_id, |r| r.direction = direction)
    }

    async fn set_public(&self, route_id: u64, public: bool) -> Result<(), AppError> {
        self.with_route(route_id, |r| r.public = public)
    }

    async fn set_cafe_passes(
        &self,
        route_id: u64,
        passes: Vec<CafePass>,
    ) -> Result<(), AppError> {
        self.with_route(route_id, |r| r.cafes_passed = passes)
    }

    async fn upsert_cafe_pass(&self, route_id: u64, pass: CafePass) -> Result<(), AppError> {
        self.with_route(route_id, |r| upsert_pass(&mut r.cafes_passed, pass))
    }

    async fn remove_cafe_pass(&self, route_id: u64, cafe_id: u64) -> Result<(), AppError> {
        self.with_route(route_id, |r| remove_pass(&mut r.cafes_passed, cafe_id))
    }

    async fn record_download(&self, route_id: u64, email: &str) -> Result<(), AppError> {
        self.with_route(route_id, |r| {
            add_unique_email(&mut r.downloads, email);
        })
    }

    async fn delete_route(&self, route_id: u64) -> Result<(), AppError> {
        self.routes.remove(&route_id);
        Ok(())
    }

    async fn list_cafes(&self) -> Result<Vec<Cafe>, AppError> {
        let mut cafes: Vec<Cafe> = self.cafes.iter().map(|c| c.clone()).collect();
        cafes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cafes)
    }

    async fn insert_cafe(&self, cafe: NewCafe) -> Result<Cafe, AppError> {
        let id = self.next_cafe_id.fetch_add(1, Ordering::SeqCst) + 1;
        let cafe = Cafe {
            id,
            name: cafe.name,
            lat: cafe.lat,
            lon: cafe.lon,
        };
        self.cafes.insert(id, cafe.clone());
        Ok(cafe)
    }

    async fn delete_cafe(&self, cafe_id: u64) -> Result<(), AppError> {
        self.cafes.remove(&cafe_id);
        Ok(())
    }
}
