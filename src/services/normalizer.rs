// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route normalization pipeline.
//!
//! Parse the stored (or uploaded) track, decimate it, replace the track file
//! with the clean version and only then save the stats on the route record.

use crate::db::RouteStore;
use crate::error::TrackError;
use crate::models::{Direction, RouteRecord, TrackPoint};
use crate::services::geometry::{self, MIN_SPACING_KM};
use crate::services::gpx_file;
use crate::services::track_files::TrackFiles;
use gpx::Gpx;
use std::sync::Arc;
use std::time::Duration;

/// Attempts at saving stats once the file has been replaced.
const STATS_ATTEMPTS: u32 = 3;
const STATS_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Outcome of normalizing one route.
#[derive(Debug, Clone)]
pub struct NormalizeReport {
    pub route_id: u64,
    /// Rounded to 0.1 km
    pub length_km: f64,
    /// Rounded to 0.1 m
    pub ascent_m: f64,
    pub points_before: usize,
    pub points_after: usize,
    pub direction: Direction,
    /// Retained points, as written to the track file
    pub points: Vec<TrackPoint>,
}

#[derive(Clone)]
pub struct RouteNormalizer {
    store: Arc<dyn RouteStore>,
    files: TrackFiles,
    min_spacing_km: f64,
}

impl RouteNormalizer {
    pub fn new(store: Arc<dyn RouteStore>, files: TrackFiles) -> Self {
        Self {
            store,
            files,
            min_spacing_km: MIN_SPACING_KM,
        }
    }

    pub fn files(&self) -> &TrackFiles {
        &self.files
    }

    /// Normalize freshly uploaded bytes into the route's track file.
    pub async fn normalize_upload(
        &self,
        route: &RouteRecord,
        bytes: &[u8],
    ) -> Result<NormalizeReport, TrackError> {
        let gpx = gpx_file::parse_gpx(bytes)?;
        self.normalize_gpx(route, &gpx).await
    }

    /// Re-normalize the route's stored track file.
    pub async fn normalize_route(&self, route: &RouteRecord) -> Result<NormalizeReport, TrackError> {
        let bytes = self.files.read(&route.filename).await?;
        self.normalize_upload(route, &bytes).await
    }

    /// Make the `start_count`-th point the start of the route.
    pub async fn cut_start(
        &self,
        route: &RouteRecord,
        start_count: usize,
    ) -> Result<NormalizeReport, TrackError> {
        let mut gpx = self.load(route).await?;
        let remaining = gpx_file::cut_start(&mut gpx, start_count);
        tracing::debug!(route_id = route.id, start_count, remaining, "Cut route start");
        self.normalize_gpx(route, &gpx).await
    }

    /// Make the `end_count`-th point the end of the route.
    pub async fn cut_end(
        &self,
        route: &RouteRecord,
        end_count: usize,
    ) -> Result<NormalizeReport, TrackError> {
        let mut gpx = self.load(route).await?;
        let remaining = gpx_file::cut_end(&mut gpx, end_count);
        tracing::debug!(route_id = route.id, end_count, remaining, "Cut route end");
        self.normalize_gpx(route, &gpx).await
    }

    /// All track segments of the stored file.
    pub async fn stored_segments(
        &self,
        route: &RouteRecord,
    ) -> Result<Vec<Vec<TrackPoint>>, TrackError> {
        let gpx = self.load(route).await?;
        gpx_file::track_segments(&gpx)
    }

    /// Retitle and timestamp the stored file for distribution. The stored
    /// copy is updated too so it carries the current route name.
    pub async fn prepare_download(
        &self,
        route: &RouteRecord,
        club_name: &str,
        site_url: &str,
    ) -> Result<Vec<u8>, TrackError> {
        let gpx = self.load(route).await?;
        let title = format!("{}: {}", club_name, route.name);
        let link = format!("{}/route/{}", site_url.trim_end_matches('/'), route.id);
        let author = format!("{} website", club_name);

        let gpx = gpx_file::retitle_and_timestamp(gpx, &title, &link, &author);
        let bytes = gpx_file::to_gpx_bytes(&gpx)?;
        self.files.replace(&route.filename, &bytes).await?;

        tracing::debug!(route_id = route.id, title = %title, "Prepared route download");
        Ok(bytes)
    }

    async fn load(&self, route: &RouteRecord) -> Result<Gpx, TrackError> {
        let bytes = self.files.read(&route.filename).await?;
        gpx_file::parse_gpx(&bytes)
    }

    /// Normalize an already parsed track into the route's track file.
    pub async fn normalize_gpx(
        &self,
        route: &RouteRecord,
        gpx: &Gpx,
    ) -> Result<NormalizeReport, TrackError> {
        let segments = gpx_file::track_segments(gpx)?;
        let normalized = geometry::normalize_segments(&segments, self.min_spacing_km);
        let direction = geometry::route_direction(&normalized.points);

        let clean = gpx_file::build_clean_gpx(&route.name, &normalized.points);
        let bytes = gpx_file::to_gpx_bytes(&clean)?;
        self.files.replace(&route.filename, &bytes).await?;

        let report = NormalizeReport {
            route_id: route.id,
            length_km: normalized.length_km_rounded(),
            ascent_m: normalized.ascent_m_rounded(),
            points_before: normalized.points_before,
            points_after: normalized.points.len(),
            direction,
            points: normalized.points,
        };

        self.persist_stats(&report).await?;

        tracing::info!(
            route_id = route.id,
            length_km = report.length_km,
            ascent_m = report.ascent_m,
            points_before = report.points_before,
            points_after = report.points_after,
            direction = %report.direction,
            "Route normalized"
        );

        Ok(report)
    }

    async fn persist_stats(&self, report: &NormalizeReport) -> Result<(), TrackError> {
        let mut last_err = None;

        for attempt in 1..=STATS_ATTEMPTS {
            let result = async {
                self.store
                    .update_stats(report.route_id, report.length_km, report.ascent_m)
                    .await?;
                self.store
                    .set_direction(report.route_id, report.direction)
                    .await
            }
            .await;

            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        route_id = report.route_id,
                        attempt,
                        error = %e,
                        "Failed to save route stats"
                    );
                    last_err = Some(e);
                    if attempt < STATS_ATTEMPTS {
                        tokio::time::sleep(STATS_RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(TrackError::Persist {
            route_id: report.route_id,
            message: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}
