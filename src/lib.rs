// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Club routes: GPX route library backend
//!
//! Members upload GPX files of club rides. Each upload is normalized
//! (decimated, with length and ascent computed) before it is stored, and
//! downloads are retitled and timestamped so bike computers accept them.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::RouteStore;
use services::{CafeArea, CafeService, RouteNormalizer, TrackFiles};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RouteStore>,
    pub normalizer: RouteNormalizer,
    pub cafes: CafeService,
}

impl AppState {
    /// Wire up services around a metadata store.
    pub fn new(config: Config, store: Arc<dyn RouteStore>) -> Self {
        let files = TrackFiles::new(config.gpx_dir.clone())
            .with_wait(config.tmp_wait_attempts, config.tmp_wait_interval);
        let normalizer = RouteNormalizer::new(store.clone(), files);
        let area = CafeArea {
            centre_lat: config.home_lat,
            centre_lon: config.home_lon,
            max_range_km: config.cafe_max_range_km,
        };
        let cafes = CafeService::new(store.clone(), normalizer.clone(), area);

        Self {
            config,
            store,
            normalizer,
            cafes,
        }
    }
}
