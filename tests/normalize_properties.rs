// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalization properties checked over synthetic and fixture tracks.

use club_routes::models::{Direction, TrackPoint};
use club_routes::services::geometry::{
    haversine_km, normalize, normalize_segments, path_length_km, route_direction, MIN_SPACING_KM,
};
use club_routes::services::gpx_file;
use time::OffsetDateTime;

mod common;
use common::fixture;

/// Deterministic wandering ride: uneven steps, rolling elevation.
fn wandering_ride(len: usize, seed: u64) -> Vec<TrackPoint> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) as f64) / ((1u64 << 31) as f64)
    };

    let (mut lat, mut lon, mut ele) = (52.2, 0.12, 20.0);
    (0..len)
        .map(|_| {
            // Steps of up to ~0.1 km, biased north-east
            lat += (next() - 0.3) * 0.001;
            lon += (next() - 0.3) * 0.0015;
            ele += (next() - 0.5) * 4.0;
            TrackPoint::new(lat, lon, ele)
        })
        .collect()
}

#[test]
fn test_decimation_is_idempotent() {
    for seed in [1, 7, 42] {
        let first = normalize(&wandering_ride(800, seed), MIN_SPACING_KM);
        let second = normalize(&first.points, MIN_SPACING_KM);

        assert_eq!(second.points, first.points);
        assert_eq!(second.points_before, first.points.len());
        // Stats of a decimated sequence are those of its own path
        assert!((second.length_km - path_length_km(&first.points)).abs() < 1e-9);

        let third = normalize(&second.points, MIN_SPACING_KM);
        assert_eq!(third, second);
    }
}

#[test]
fn test_retained_points_respect_spacing() {
    for seed in [3, 11, 99] {
        let result = normalize(&wandering_ride(1000, seed), MIN_SPACING_KM);
        assert!(result.points.len() > 1);
        for pair in result.points.windows(2) {
            assert!(haversine_km(&pair[0], &pair[1]) >= MIN_SPACING_KM);
        }
    }
}

#[test]
fn test_first_point_always_retained() {
    let ride = wandering_ride(300, 5);
    let result = normalize(&ride, MIN_SPACING_KM);
    assert_eq!(result.points[0], ride[0]);
}

#[test]
fn test_stats_non_negative() {
    let single = normalize(&[TrackPoint::new(52.0, 0.0, 100.0)], MIN_SPACING_KM);
    assert_eq!(single.length_km, 0.0);
    assert_eq!(single.ascent_m, 0.0);
    assert_eq!(single.points.len(), 1);

    // All downhill
    let descent: Vec<TrackPoint> = (0..20)
        .map(|i| TrackPoint::new(52.0 + i as f64 * 0.001, 0.0, 200.0 - i as f64 * 5.0))
        .collect();
    let result = normalize(&descent, MIN_SPACING_KM);
    assert!(result.length_km > 0.0);
    assert_eq!(result.ascent_m, 0.0);
}

#[test]
fn test_length_is_full_resolution() {
    let ride = wandering_ride(1200, 17);
    let result = normalize(&ride, MIN_SPACING_KM);

    assert!((result.length_km - path_length_km(&ride)).abs() < 1e-9);
    // Decimation cuts corners, so the stored path is never longer
    assert!(path_length_km(&result.points) <= result.length_km);
}

#[test]
fn test_three_point_example() {
    let points = vec![
        TrackPoint::new(52.0, 0.0, 10.0),
        TrackPoint::new(52.0009, 0.0, 10.0),
        TrackPoint::new(52.002, 0.0, 15.0),
    ];
    let result = normalize(&points, 0.05);

    assert!((result.length_km - 0.2224).abs() < 0.001);
    assert_eq!(result.ascent_m, 5.0);
    assert_eq!(result.points, points);
}

#[test]
fn test_close_fourth_point_dropped_but_counted() {
    let mut points = vec![
        TrackPoint::new(52.0, 0.0, 10.0),
        TrackPoint::new(52.0009, 0.0, 10.0),
        TrackPoint::new(52.002, 0.0, 15.0),
    ];
    let three = normalize(&points, 0.05);

    points.push(TrackPoint::new(52.00209, 0.0, 12.0));
    let four = normalize(&points, 0.05);

    assert_eq!(four.points, three.points);
    assert_eq!(four.ascent_m, 5.0);
    assert_eq!(four.points_before, 4);
    assert!((four.length_km - three.length_km - 0.01).abs() < 0.001);
}

#[test]
fn test_synthesized_timestamps_strictly_increase() {
    let ride = normalize(&wandering_ride(500, 23), MIN_SPACING_KM);
    let gpx = gpx_file::build_clean_gpx("Ride", &ride.points);

    // Worst case: the jitter source asks for the full range and beyond
    let mut calls = 0i64;
    let gpx = gpx_file::retitle_and_timestamp_from(
        gpx,
        "Club: Ride",
        "https://club.example/route/1",
        "Club website",
        OffsetDateTime::UNIX_EPOCH,
        || {
            calls += 1;
            if calls % 2 == 0 {
                -500
            } else {
                500
            }
        },
    );

    let times: Vec<OffsetDateTime> = gpx.tracks[0].segments[0]
        .points
        .iter()
        .map(|p| p.time.unwrap().into())
        .collect();
    assert_eq!(times.len(), ride.points.len());
    assert!(times[0] > OffsetDateTime::UNIX_EPOCH);
    assert!(times.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_fixture_loop_stats_and_direction() {
    let gpx = gpx_file::parse_gpx(&fixture("clockwise_loop.gpx")).unwrap();
    let segments = gpx_file::track_segments(&gpx).unwrap();
    let result = normalize_segments(&segments, MIN_SPACING_KM);

    assert_eq!(result.points_before, 401);
    assert_eq!(result.points.len(), 167);
    assert_eq!(result.length_km_rounded(), 9.9);
    assert_eq!(result.ascent_m_rounded(), 100.0);
    assert_eq!(route_direction(&result.points), Direction::Clockwise);

    let reversed: Vec<TrackPoint> = result.points.iter().rev().copied().collect();
    assert_eq!(route_direction(&reversed), Direction::AntiClockwise);
}

#[test]
fn test_fixture_segments_do_not_bridge() {
    let gpx = gpx_file::parse_gpx(&fixture("two_segments.gpx")).unwrap();
    let segments = gpx_file::track_segments(&gpx).unwrap();
    assert_eq!(segments.len(), 2);

    let result = normalize_segments(&segments, MIN_SPACING_KM);
    let separate: f64 = segments.iter().map(|s| path_length_km(s)).sum();
    assert!((result.length_km - separate).abs() < 1e-9);
    assert_eq!(result.points.len(), 6);
}
