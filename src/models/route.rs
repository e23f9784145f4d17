// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route metadata model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored route record. Raw points live in the track file, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    /// Numeric route ID (also used as document ID and in the filename)
    pub id: u64,
    /// Track filename, `gpx_{id}.gpx`
    pub filename: String,
    /// Route name as entered by the uploader
    pub name: String,
    /// Full-resolution length, rounded to 0.1 km
    pub length_km: f64,
    /// Total ascent, rounded to 0.1 m
    pub ascent_m: f64,
    /// Cafes within range of the route
    #[serde(default)]
    pub cafes_passed: Vec<CafePass>,
    /// Uploader's email
    pub owner_email: String,
    /// Upload time (RFC3339)
    pub created_at: String,
    /// Visible to other members
    #[serde(default)]
    pub public: bool,
    pub route_type: RouteType,
    pub details: Option<String>,
    /// Emails of members who downloaded the route (unique)
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
}

impl RouteRecord {
    /// Whether `email` may edit, publish or delete this route.
    pub fn can_edit(&self, email: &str, is_admin: bool) -> bool {
        is_admin || self.owner_email.eq_ignore_ascii_case(email)
    }
}

/// Fields supplied by the uploader when creating a route.
#[derive(Debug, Clone)]
pub struct NewRoute {
    pub name: String,
    pub owner_email: String,
    pub route_type: RouteType,
    pub details: Option<String>,
}

/// Filename convention for route track files.
pub fn track_filename(route_id: u64) -> String {
    format!("gpx_{}.gpx", route_id)
}

/// Kind of riding the route is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum RouteType {
    #[default]
    Road,
    Gravel,
    #[serde(rename = "MTB")]
    Mtb,
}

impl std::str::FromStr for RouteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "road" => Ok(RouteType::Road),
            "gravel" => Ok(RouteType::Gravel),
            "mtb" => Ok(RouteType::Mtb),
            other => Err(format!("Unknown route type '{}'", other)),
        }
    }
}

/// Which way round a circular route goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Direction {
    #[serde(rename = "CW")]
    Clockwise,
    #[serde(rename = "CCW")]
    AntiClockwise,
    #[serde(rename = "Not Circular")]
    NotCircular,
    #[default]
    Unknown,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Clockwise => "CW",
            Direction::AntiClockwise => "CCW",
            Direction::NotCircular => "Not Circular",
            Direction::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// A cafe the route passes close to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CafePass {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub cafe_id: u64,
    /// Closest approach to the cafe (km)
    pub distance_from_route_km: f64,
    /// How far along the route the closest approach is (km)
    pub distance_along_route_km: f64,
}

/// Route summary for API responses.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RouteSummary {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    pub length_km: f64,
    pub ascent_m: f64,
    pub route_type: RouteType,
    pub direction: Direction,
    pub public: bool,
    pub details: Option<String>,
    pub cafes_passed: Vec<CafePass>,
    pub download_count: u32,
}

impl From<&RouteRecord> for RouteSummary {
    fn from(route: &RouteRecord) -> Self {
        Self {
            id: route.id,
            name: route.name.clone(),
            length_km: route.length_km,
            ascent_m: route.ascent_m,
            route_type: route.route_type,
            direction: route.direction,
            public: route.public,
            details: route.details.clone(),
            cafes_passed: route.cafes_passed.clone(),
            download_count: route.downloads.len() as u32,
        }
    }
}
