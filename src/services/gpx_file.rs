// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPX parsing and writing.
//!
//! Stored track files only ever carry lat/lon/elevation. Device extension
//! data (heart rate, cadence, power) and timestamps are dropped when a file
//! is rebuilt from normalized points.

use crate::error::TrackError;
use crate::models::TrackPoint;
use gpx::{Gpx, GpxVersion, Link, Person, Track, TrackSegment, Waypoint};
use ring::rand::{SecureRandom, SystemRandom};
use time::{Duration, OffsetDateTime};

/// Accepted upload extension (compared case-insensitively).
pub const GPX_EXTENSION: &str = "gpx";

/// Fixed part of the gap between synthesized timestamps.
pub const TIMESTAMP_BASE_STEP_SECS: i64 = 180;

/// Upper bound of the random part of the gap between synthesized timestamps.
pub const TIMESTAMP_MAX_JITTER_SECS: i64 = 120;

const CREATOR: &str = "club-routes";

/// Track type written into distributed files.
const TRACK_TYPE: &str = "cycling";

/// Check an upload filename has a `.gpx` extension.
pub fn is_gpx_filename(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(GPX_EXTENSION))
}

/// Parse GPX bytes.
pub fn parse_gpx(bytes: &[u8]) -> Result<Gpx, TrackError> {
    gpx::read(bytes).map_err(|e| TrackError::Parse(e.to_string()))
}

/// Extract the points of every non-empty track segment.
///
/// Fails with [`TrackError::EmptyTrack`] if the file holds no track points
/// at all, and with [`TrackError::Parse`] on out-of-range coordinates.
pub fn track_segments(gpx: &Gpx) -> Result<Vec<Vec<TrackPoint>>, TrackError> {
    let mut segments = Vec::new();

    for track in &gpx.tracks {
        for segment in &track.segments {
            let mut points = Vec::with_capacity(segment.points.len());
            for waypoint in &segment.points {
                let point = waypoint.point();
                let (lat, lon) = (point.y(), point.x());
                if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0
                {
                    return Err(TrackError::Parse(format!(
                        "Invalid coordinate ({}, {})",
                        lat, lon
                    )));
                }
                points.push(TrackPoint {
                    lat,
                    lon,
                    elevation: waypoint.elevation.filter(|e| e.is_finite()),
                });
            }
            if !points.is_empty() {
                segments.push(points);
            }
        }
    }

    if segments.is_empty() {
        return Err(TrackError::EmptyTrack);
    }
    Ok(segments)
}

/// Build a fresh single-track, single-segment GPX from normalized points.
pub fn build_clean_gpx(track_name: &str, points: &[TrackPoint]) -> Gpx {
    let segment = TrackSegment {
        points: points
            .iter()
            .map(|p| {
                let mut waypoint = Waypoint::new(geo::Point::new(p.lon, p.lat));
                waypoint.elevation = p.elevation;
                waypoint
            })
            .collect(),
    };

    let track = Track {
        name: Some(track_name.to_string()),
        segments: vec![segment],
        ..Default::default()
    };

    Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.to_string()),
        tracks: vec![track],
        ..Default::default()
    }
}

/// Serialize to GPX 1.1 bytes.
pub fn to_gpx_bytes(gpx: &Gpx) -> Result<Vec<u8>, TrackError> {
    let mut buf = Vec::new();
    let result = if matches!(gpx.version, GpxVersion::Gpx11) {
        gpx::write(gpx, &mut buf)
    } else {
        // The writer only emits 1.1
        let mut upgraded = gpx.clone();
        upgraded.version = GpxVersion::Gpx11;
        gpx::write(&upgraded, &mut buf)
    };
    result.map_err(|e| TrackError::Serialize(e.to_string()))?;
    Ok(buf)
}

/// Total number of track points in a file.
pub fn count_points(gpx: &Gpx) -> usize {
    gpx.tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .map(|s| s.points.len())
        .sum()
}

/// Name a track for redistribution and give every point a timestamp.
///
/// Some importers silently drop points without timestamps, so each point
/// gets one: starting from now and stepping forward by a fixed base plus a
/// random jitter, strictly increasing across the whole file.
pub fn retitle_and_timestamp(gpx: Gpx, route_name: &str, route_link: &str, author: &str) -> Gpx {
    let rng = SystemRandom::new();
    retitle_and_timestamp_from(
        gpx,
        route_name,
        route_link,
        author,
        OffsetDateTime::now_utc(),
        || random_jitter_secs(&rng),
    )
}

/// [`retitle_and_timestamp`] with an explicit start time and jitter source.
pub fn retitle_and_timestamp_from<F>(
    mut gpx: Gpx,
    route_name: &str,
    route_link: &str,
    author: &str,
    start: OffsetDateTime,
    mut jitter_secs: F,
) -> Gpx
where
    F: FnMut() -> i64,
{
    // Whole seconds only; some importers reject fractional times
    let mut last_time = start.replace_nanosecond(0).unwrap_or(start);
    for track in &mut gpx.tracks {
        for segment in &mut track.segments {
            for point in &mut segment.points {
                let step =
                    TIMESTAMP_BASE_STEP_SECS + jitter_secs().clamp(0, TIMESTAMP_MAX_JITTER_SECS);
                last_time += Duration::seconds(step);
                point.time = Some(last_time.into());
            }
        }
    }

    let link = Link {
        href: route_link.to_string(),
        ..Default::default()
    };

    let mut metadata = gpx.metadata.take().unwrap_or_default();
    metadata.name = Some(route_name.to_string());
    metadata.author = Some(Person {
        name: Some(author.to_string()),
        link: Some(link.clone()),
        ..Default::default()
    });
    gpx.metadata = Some(metadata);

    if let Some(track) = gpx.tracks.first_mut() {
        track.name = Some(route_name.to_string());
        track.links = vec![link];
        track.type_ = Some(TRACK_TYPE.to_string());
    }

    gpx.version = GpxVersion::Gpx11;
    gpx
}

fn random_jitter_secs(rng: &SystemRandom) -> i64 {
    let mut buf = [0u8; 1];
    match rng.fill(&mut buf) {
        Ok(()) => i64::from(buf[0]) % (TIMESTAMP_MAX_JITTER_SECS + 1),
        Err(_) => 0,
    }
}

/// Drop points from the start of every segment so the `start_count`-th
/// point (1-based) becomes the first. Returns the point count afterwards.
pub fn cut_start(gpx: &mut Gpx, start_count: usize) -> usize {
    let to_drop = start_count.saturating_sub(1);
    for track in &mut gpx.tracks {
        for segment in &mut track.segments {
            let n = to_drop.min(segment.points.len());
            segment.points.drain(..n);
        }
    }
    count_points(gpx)
}

/// Keep only the first `end_count` points of every segment. Returns the
/// point count afterwards.
pub fn cut_end(gpx: &mut Gpx, end_count: usize) -> usize {
    for track in &mut gpx.tracks {
        for segment in &mut track.segments {
            segment.points.truncate(end_count);
        }
    }
    count_points(gpx)
}
