// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route geometry for map display.

use crate::models::TrackPoint;
use geo::{Coord, LineString};
use geojson::{Feature, Geometry, JsonObject};
use serde::Serialize;

/// Geometry of one route, ready for a map widget.
#[derive(Debug, Clone, Serialize)]
pub struct RouteMap {
    pub route_id: u64,
    /// GeoJSON `LineString` feature (lon/lat order)
    pub feature: Feature,
    /// Encoded polyline, precision 5
    pub polyline: String,
    /// Mean position, for centring the map
    pub centre_lat: f64,
    pub centre_lon: f64,
    pub point_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Route has no points")]
    NoPoints,

    #[error("Failed to encode polyline: {0}")]
    Polyline(String),
}

/// Build map geometry from track segments. Segments are joined end to end.
pub fn route_map(
    route_id: u64,
    name: &str,
    segments: &[Vec<TrackPoint>],
) -> Result<RouteMap, MapError> {
    let line: LineString<f64> = segments
        .iter()
        .flatten()
        .map(|p| Coord { x: p.lon, y: p.lat })
        .collect();

    let point_count = line.0.len();
    if point_count == 0 {
        return Err(MapError::NoPoints);
    }

    let (sum_lat, sum_lon) = line
        .coords()
        .fold((0.0, 0.0), |(lat, lon), c| (lat + c.y, lon + c.x));

    let polyline = polyline::encode_coordinates(line.coords().copied(), 5)
        .map_err(|e| MapError::Polyline(e.to_string()))?;

    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), route_id.into());
    properties.insert("name".to_string(), name.into());

    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };

    Ok(RouteMap {
        route_id,
        feature,
        polyline,
        centre_lat: sum_lat / point_count as f64,
        centre_lon: sum_lon / point_count as f64,
        point_count,
    })
}
