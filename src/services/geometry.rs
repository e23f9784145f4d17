// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route geometry: distance, ascent, decimation, direction and proximity.
//!
//! All distances are great-circle (haversine) ground distances on a
//! spherical Earth. Elevation never contributes to distance.

use crate::models::{Direction, NormalizedTrack, TrackPoint};

/// Mean Earth radius used for all distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Minimum spacing between retained points in stored track files.
pub const MIN_SPACING_KM: f64 = 0.05;

/// Start and finish further apart than this means the route is not a loop.
pub const MAX_CIRCULAR_DELTA_KM: f64 = 10.0;

/// A route passes a cafe if it comes within this distance.
pub const MIN_DIST_TO_CAFE_KM: f64 = 1.0;

/// Great-circle distance between two track points in km.
pub fn haversine_km(a: &TrackPoint, b: &TrackPoint) -> f64 {
    haversine_deg_km(a.lat, a.lon, b.lat, b.lon)
}

/// Great-circle distance between two lat/lon pairs (degrees) in km.
pub fn haversine_deg_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Normalize a single run of points.
///
/// Length and ascent are accumulated over every input point. The output
/// keeps the first point and then each point at least `min_spacing_km` from
/// the last *retained* point.
pub fn normalize(points: &[TrackPoint], min_spacing_km: f64) -> NormalizedTrack {
    let mut result = NormalizedTrack::default();
    accumulate_segment(points, min_spacing_km, &mut result);
    result
}

/// Normalize a multi-segment track into one decimated sequence.
///
/// Each segment starts fresh: nothing is accumulated across the gap between
/// segments and each segment's first point is retained.
pub fn normalize_segments(segments: &[Vec<TrackPoint>], min_spacing_km: f64) -> NormalizedTrack {
    let mut result = NormalizedTrack::default();
    for segment in segments {
        accumulate_segment(segment, min_spacing_km, &mut result);
    }
    result
}

fn accumulate_segment(points: &[TrackPoint], min_spacing_km: f64, out: &mut NormalizedTrack) {
    let Some(first) = points.first() else {
        return;
    };

    // Stats follow the full-resolution geometry
    let mut last_point = *first;
    let mut last_elevation = first.elevation;

    // Decimation follows the last retained point
    let mut saved_point: Option<TrackPoint> = None;

    for point in points {
        out.length_km += haversine_km(&last_point, point);
        last_point = *point;
        out.points_before += 1;

        if let Some(elevation) = point.elevation {
            if let Some(last) = last_elevation {
                if elevation > last {
                    out.ascent_m += elevation - last;
                }
            }
            last_elevation = Some(elevation);
        }

        let keep = saved_point.map_or(true, |saved| haversine_km(&saved, point) >= min_spacing_km);
        if keep {
            out.points.push(TrackPoint {
                lat: point.lat,
                lon: point.lon,
                elevation: point.elevation,
            });
            saved_point = Some(*point);
        }
    }
}

/// Sum of consecutive haversine distances over a point sequence.
pub fn path_length_km(points: &[TrackPoint]) -> f64 {
    points.windows(2).map(|w| haversine_km(&w[0], &w[1])).sum()
}

/// Work out which way round a loop goes.
///
/// Compares the bearing from the start to the point 25% along with the one
/// to the point 75% along. Tracks with fewer than three points are
/// `Unknown`.
pub fn route_direction(points: &[TrackPoint]) -> Direction {
    if points.len() < 3 {
        return Direction::Unknown;
    }
    let start = points[0];
    let last = points[points.len() - 1];

    if haversine_km(&last, &start) > MAX_CIRCULAR_DELTA_KM {
        return Direction::NotCircular;
    }

    let n = points.len();
    let outward = points[n / 4];
    let inward = points[(3 * n) / 4];

    let mut outward_deg = (outward.lat - start.lat)
        .atan2(outward.lon - start.lon)
        .to_degrees();
    let mut return_deg = (inward.lat - start.lat)
        .atan2(inward.lon - start.lon)
        .to_degrees();

    // Vectors either side of the +/-180 boundary
    if outward_deg > 90.0 && return_deg < -90.0 {
        return_deg += 360.0;
    }
    if return_deg > 90.0 && outward_deg < -90.0 {
        outward_deg += 360.0;
    }

    if outward_deg > return_deg {
        Direction::Clockwise
    } else {
        Direction::AntiClockwise
    }
}

/// Closest approach of a track to a fixed position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    /// Distance from the position to the nearest track point (km)
    pub distance_km: f64,
    /// Distance along the track to that point (km), measured within its segment
    pub along_route_km: f64,
}

/// Find where a track passes closest to `(lat, lon)`.
pub fn closest_approach(segments: &[Vec<TrackPoint>], lat: f64, lon: f64) -> Option<Approach> {
    let mut best: Option<Approach> = None;

    for segment in segments {
        let Some(first) = segment.first() else {
            continue;
        };
        let mut last_point = *first;
        let mut along_route_km = 0.0;

        for point in segment {
            along_route_km += haversine_km(&last_point, point);
            last_point = *point;

            let distance_km = haversine_deg_km(lat, lon, point.lat, point.lon);
            if best.map_or(true, |b| distance_km < b.distance_km) {
                best = Some(Approach {
                    distance_km,
                    along_route_km,
                });
            }
        }
    }

    best
}

/// Whether a position lies within `max_km` of a centre point.
pub fn within_range(lat: f64, lon: f64, centre_lat: f64, centre_lon: f64, max_km: f64) -> bool {
    haversine_deg_km(lat, lon, centre_lat, centre_lon) <= max_km
}
