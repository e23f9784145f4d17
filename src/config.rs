// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where route and cafe metadata is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL (CORS origin)
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    pub store_backend: StoreBackend,

    // --- Routes ---
    /// Directory holding `gpx_{id}.gpx` track files
    pub gpx_dir: PathBuf,
    /// Public site URL used for route links in downloaded files
    pub site_url: String,
    /// Club name used for titles, author and download filenames
    pub club_name: String,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
    /// Polls of a busy temp file before clearing it
    pub tmp_wait_attempts: u32,
    /// Delay between polls of a busy temp file
    pub tmp_wait_interval: Duration,

    // --- Cafes ---
    pub home_lat: f64,
    pub home_lon: f64,
    /// Cafes further than this from home are rejected
    pub cafe_max_range_km: f64,
}

impl Config {
    /// Config for tests.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            store_backend: StoreBackend::Memory,
            gpx_dir: PathBuf::from("data/gpx"),
            site_url: "http://localhost:5173".to_string(),
            club_name: "Club".to_string(),
            max_upload_bytes: 15 * 1024 * 1024,
            tmp_wait_attempts: 3,
            tmp_wait_interval: Duration::from_millis(10),
            home_lat: 52.203316,
            home_lon: 0.131689,
            cafe_max_range_km: 100.0,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,

            gpx_dir: env::var("GPX_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/gpx")),
            site_url: env::var("SITE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            club_name: env::var("CLUB_NAME").unwrap_or_else(|_| "Club".to_string()),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 15 * 1024 * 1024)?,
            tmp_wait_attempts: parse_or("TMP_WAIT_ATTEMPTS", 20)?,
            tmp_wait_interval: Duration::from_millis(parse_or("TMP_WAIT_MILLIS", 1000)?),

            home_lat: parse_or("HOME_LAT", 52.203316)?,
            home_lon: parse_or("HOME_LON", 0.131689)?,
            cafe_max_range_km: parse_or("CAFE_MAX_RANGE_KM", 100.0)?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, value)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
