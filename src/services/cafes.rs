// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Which cafes each route passes.

use crate::db::RouteStore;
use crate::error::{AppError, TrackError};
use crate::models::track::round_to_tenth;
use crate::models::{Cafe, CafePass, NewCafe, RouteRecord, TrackPoint};
use crate::services::geometry::{self, MIN_DIST_TO_CAFE_KM};
use crate::services::normalizer::RouteNormalizer;
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_ROUTE_CHECKS: usize = 8;

/// Pass record for `cafe` if the route comes within range of it.
pub fn cafe_pass(segments: &[Vec<TrackPoint>], cafe: &Cafe) -> Option<CafePass> {
    let approach = geometry::closest_approach(segments, cafe.lat, cafe.lon)?;
    (approach.distance_km <= MIN_DIST_TO_CAFE_KM).then(|| CafePass {
        cafe_id: cafe.id,
        distance_from_route_km: round_to_tenth(approach.distance_km),
        distance_along_route_km: round_to_tenth(approach.along_route_km),
    })
}

/// Pass records for every cafe the route comes within range of.
pub fn cafe_passes(segments: &[Vec<TrackPoint>], cafes: &[Cafe]) -> Vec<CafePass> {
    cafes
        .iter()
        .filter_map(|cafe| cafe_pass(segments, cafe))
        .collect()
}

/// Where new cafes may be.
#[derive(Debug, Clone, Copy)]
pub struct CafeArea {
    pub centre_lat: f64,
    pub centre_lon: f64,
    pub max_range_km: f64,
}

impl CafeArea {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        geometry::within_range(
            lat,
            lon,
            self.centre_lat,
            self.centre_lon,
            self.max_range_km,
        )
    }
}

#[derive(Clone)]
pub struct CafeService {
    store: Arc<dyn RouteStore>,
    normalizer: RouteNormalizer,
    area: CafeArea,
}

impl CafeService {
    pub fn new(store: Arc<dyn RouteStore>, normalizer: RouteNormalizer, area: CafeArea) -> Self {
        Self {
            store,
            normalizer,
            area,
        }
    }

    /// Recompute a route's cafe list from its points and save it.
    pub async fn refresh_route(
        &self,
        route_id: u64,
        segments: &[Vec<TrackPoint>],
    ) -> Result<Vec<CafePass>, AppError> {
        let cafes = self.store.list_cafes().await?;
        let passes = cafe_passes(segments, &cafes);
        self.store.set_cafe_passes(route_id, passes.clone()).await?;

        tracing::debug!(route_id, cafes_passed = passes.len(), "Refreshed route cafes");
        Ok(passes)
    }

    /// Add a cafe and record it against every route that passes it.
    pub async fn add_cafe(&self, cafe: NewCafe) -> Result<Cafe, AppError> {
        if !cafe.lat.is_finite() || !cafe.lon.is_finite() || !self.area.contains(cafe.lat, cafe.lon)
        {
            return Err(AppError::BadRequest(format!(
                "Cafe must be within {} km of the club",
                self.area.max_range_km
            )));
        }

        let cafe = self.store.insert_cafe(cafe).await?;
        let routes = self.store.list_routes().await?;

        let updated = stream::iter(routes)
            .map(|route| {
                let cafe = &cafe;
                async move { self.update_route_for_cafe(route, cafe).await }
            })
            .buffer_unordered(MAX_CONCURRENT_ROUTE_CHECKS)
            .collect::<Vec<Result<bool, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<bool>, AppError>>()?
            .into_iter()
            .filter(|changed| *changed)
            .count();

        tracing::info!(cafe_id = cafe.id, name = %cafe.name, routes_updated = updated, "Cafe added");
        Ok(cafe)
    }

    /// Remove a cafe and drop it from every route's list.
    pub async fn remove_cafe(&self, cafe_id: u64) -> Result<(), AppError> {
        self.store.delete_cafe(cafe_id).await?;

        for route in self.store.list_routes().await? {
            if route.cafes_passed.iter().any(|p| p.cafe_id == cafe_id) {
                self.store.remove_cafe_pass(route.id, cafe_id).await?;
            }
        }

        tracing::info!(cafe_id, "Cafe removed");
        Ok(())
    }

    /// Returns whether the route's list changed.
    async fn update_route_for_cafe(
        &self,
        route: RouteRecord,
        cafe: &Cafe,
    ) -> Result<bool, AppError> {
        let segments = match self.normalizer.stored_segments(&route).await {
            Ok(segments) => segments,
            Err(TrackError::Missing(path)) => {
                tracing::warn!(route_id = route.id, path = %path.display(), "Track file missing, skipping cafe check");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        match cafe_pass(&segments, cafe) {
            Some(pass) => self.store.upsert_cafe_pass(route.id, pass).await?,
            None if route.cafes_passed.iter().any(|p| p.cafe_id == cafe.id) => {
                self.store.remove_cafe_pass(route.id, cafe.id).await?
            }
            None => return Ok(false),
        }
        Ok(true)
    }
}
