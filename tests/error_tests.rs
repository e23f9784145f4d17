// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use club_routes::error::{AppError, TrackError, GENERIC_FAILURE_MESSAGE};
use std::path::PathBuf;

mod common;
use common::body_json;

#[test]
fn test_invalid_input_classification() {
    assert!(TrackError::Parse("bad xml".to_string()).is_invalid_input());
    assert!(TrackError::EmptyTrack.is_invalid_input());

    assert!(!TrackError::Missing(PathBuf::from("gpx_1.gpx")).is_invalid_input());
    assert!(!TrackError::Contention {
        path: PathBuf::from("gpx_1.gpx.tmp"),
        attempts: 3,
    }
    .is_invalid_input());
    assert!(!TrackError::Persist {
        route_id: 1,
        message: "unavailable".to_string(),
    }
    .is_invalid_input());
}

#[tokio::test]
async fn test_bad_gpx_maps_to_400() {
    let response = AppError::from(TrackError::EmptyTrack).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_gpx");
    assert_eq!(json["details"], "GPX file contains no track points");
}

#[tokio::test]
async fn test_server_track_failures_hide_detail() {
    let errors = [
        TrackError::Contention {
            path: PathBuf::from("/srv/gpx/gpx_7.gpx.tmp"),
            attempts: 3,
        },
        TrackError::Persist {
            route_id: 7,
            message: "deadline exceeded".to_string(),
        },
        TrackError::Missing(PathBuf::from("/srv/gpx/gpx_7.gpx")),
    ];

    for err in errors {
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "track_error");
        assert_eq!(json["details"], GENERIC_FAILURE_MESSAGE);
    }
}

#[tokio::test]
async fn test_database_error_has_no_details() {
    let response = AppError::Database("connection reset".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["error"], "database_error");
    assert!(json.get("details").is_none());
}

#[test]
fn test_track_error_messages() {
    let err = TrackError::Contention {
        path: PathBuf::from("gpx_3.gpx.tmp"),
        attempts: 3,
    };
    assert_eq!(
        err.to_string(),
        "Temp file gpx_3.gpx.tmp still contended after 3 attempts"
    );

    let err = TrackError::Persist {
        route_id: 3,
        message: "timeout".to_string(),
    };
    assert!(err.to_string().contains("route 3"));
}

#[tokio::test]
async fn test_offline_store_reports_database_error() {
    use axum::body::Body;
    use axum::http::Request;
    use club_routes::config::Config;
    use club_routes::db::FirestoreDb;
    use club_routes::AppState;
    use std::sync::Arc;
    use tower::ServiceExt;

    let state = Arc::new(AppState::new(
        Config::test_default(),
        Arc::new(FirestoreDb::new_mock()),
    ));
    let app = club_routes::routes::create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/api/routes").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "database_error");
}
