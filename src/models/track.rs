// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Track geometry types shared by the normalizer, direction and cafe checks.

use serde::{Deserialize, Serialize};

/// A single track point, reduced to the fields we keep in stored files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Elevation in meters (some devices omit it)
    pub elevation: Option<f64>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64, elevation: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: Some(elevation),
        }
    }

    /// Point without elevation data.
    pub fn flat(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
        }
    }
}

/// Output of track normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTrack {
    /// Full-resolution length (km). Never derived from the decimated points.
    pub length_km: f64,
    /// Sum of positive elevation deltas (m), unfiltered.
    pub ascent_m: f64,
    /// Number of points in the input
    pub points_before: usize,
    /// Decimated points, in ride order
    pub points: Vec<TrackPoint>,
}

impl NormalizedTrack {
    /// Length rounded the way it is persisted.
    pub fn length_km_rounded(&self) -> f64 {
        round_to_tenth(self.length_km)
    }

    /// Ascent rounded the way it is persisted.
    pub fn ascent_m_rounded(&self) -> f64 {
        round_to_tenth(self.ascent_m)
    }
}

/// Round to one decimal place (stored stats and cafe distances).
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
