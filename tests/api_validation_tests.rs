// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upload validation tests. Rejected uploads must leave nothing behind.

use axum::http::StatusCode;
use club_routes::db::RouteStore;

mod common;
use common::{body_json, create_test_app, create_test_app_with, fixture, TestApp, MEMBER};

async fn assert_nothing_stored(app: &TestApp) {
    assert!(app.store.list_routes().await.unwrap().is_empty());
    assert_eq!(std::fs::read_dir(app.dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_rejects_non_gpx_extension() {
    let app = create_test_app();

    let response = app
        .upload(MEMBER, "Ride", "ride.fit", &fixture("example_ride.gpx"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "bad_request");
    assert!(json["details"].as_str().unwrap().contains("ride.fit"));
    assert_nothing_stored(&app).await;
}

#[tokio::test]
async fn test_rejects_malformed_xml() {
    let app = create_test_app();

    let response = app
        .upload(MEMBER, "Ride", "ride.gpx", b"<gpx><trk><trkseg><trkpt")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_gpx");
    assert_nothing_stored(&app).await;
}

#[tokio::test]
async fn test_rejects_track_without_points() {
    let app = create_test_app();

    let response = app
        .upload(MEMBER, "Ride", "empty.gpx", &fixture("no_points.gpx"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_gpx");
    assert_eq!(json["details"], "GPX file contains no track points");
    assert_nothing_stored(&app).await;
}

#[tokio::test]
async fn test_rejects_out_of_range_coordinates() {
    let app = create_test_app();
    let bad = br#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="95.0" lon="0.0"><ele>1</ele></trkpt>
    <trkpt lat="52.0" lon="0.0"><ele>1</ele></trkpt>
  </trkseg></trk>
</gpx>"#;

    let response = app.upload(MEMBER, "Ride", "ride.gpx", bad).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_gpx");
    assert_nothing_stored(&app).await;
}

#[tokio::test]
async fn test_rejects_blank_name() {
    let app = create_test_app();

    let response = app
        .upload(MEMBER, "   ", "ride.gpx", &fixture("example_ride.gpx"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["details"].as_str().unwrap().contains("Route name"));
    assert_nothing_stored(&app).await;
}

#[tokio::test]
async fn test_rejects_name_too_long() {
    let app = create_test_app();
    let long_name = "a".repeat(101);

    let response = app
        .upload(MEMBER, &long_name, "ride.gpx", &fixture("example_ride.gpx"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_nothing_stored(&app).await;
}

#[tokio::test]
async fn test_rejects_missing_file() {
    let app = create_test_app();
    let (content_type, body) = common::multipart_body(&[("name", None, b"Ride")]);

    let response = app
        .send(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/routes")
                .header(
                    axum::http::header::AUTHORIZATION,
                    format!("Bearer {}", app.token(MEMBER)),
                )
                .header(axum::http::header::CONTENT_TYPE, content_type)
                .body(axum::body::Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["details"], "No GPX file attached");
    assert_nothing_stored(&app).await;
}

#[tokio::test]
async fn test_rejects_oversize_upload() {
    let app = create_test_app_with(|config| config.max_upload_bytes = 1024);

    let response = app
        .upload(MEMBER, "Ride", "ride.gpx", &fixture("clockwise_loop.gpx"))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json = body_json(response).await;
    assert_eq!(json["error"], "payload_too_large");
    assert_eq!(json["details"], "Uploads are limited to 1024 bytes");
    assert_nothing_stored(&app).await;
}

#[tokio::test]
async fn test_upload_at_limit_is_accepted() {
    let bytes = fixture("example_ride.gpx");
    let limit = bytes.len();
    let app = create_test_app_with(|config| config.max_upload_bytes = limit);

    let response = app.upload(MEMBER, "Ride", "ride.gpx", &bytes).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}
