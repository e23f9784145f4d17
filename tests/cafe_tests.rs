// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cafe proximity through the API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use club_routes::db::RouteStore;

mod common;
use common::{body_json, create_test_app, TestApp, MEMBER};

async fn add_cafe(app: &TestApp, name: &str, lat: f64, lon: f64) -> axum::response::Response {
    app.send(
        Request::builder()
            .method("POST")
            .uri("/api/cafes")
            .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token()))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "name": name, "lat": lat, "lon": lon }).to_string(),
            ))
            .unwrap(),
    )
    .await
}

async fn add_cafe_ok(app: &TestApp, name: &str, lat: f64, lon: f64) -> u64 {
    let response = add_cafe(app, name, lat, lon).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_new_cafe_recorded_on_passing_routes() {
    let app = create_test_app();
    let loop_id = app.upload_ok(MEMBER, "clockwise_loop.gpx").await;
    let ride_id = app.upload_ok(MEMBER, "example_ride.gpx").await;

    // Just west of the loop's first side
    let near = add_cafe_ok(&app, "Mill Cafe", 52.21, 0.095).await;
    // Inside the club area but 3 km north of the loop
    add_cafe_ok(&app, "Far Farm Shop", 52.25, 0.12).await;

    let route = app.store.get_route(loop_id).await.unwrap().unwrap();
    assert_eq!(route.cafes_passed.len(), 1);
    let pass = route.cafes_passed[0];
    assert_eq!(pass.cafe_id, near);
    assert_eq!(pass.distance_from_route_km, 0.3);
    assert!((pass.distance_along_route_km - 1.1).abs() <= 0.1);

    let ride = app.store.get_route(ride_id).await.unwrap().unwrap();
    assert!(ride.cafes_passed.is_empty());
}

#[tokio::test]
async fn test_upload_picks_up_existing_cafes() {
    let app = create_test_app();
    let cafe_id = add_cafe_ok(&app, "Mill Cafe", 52.21, 0.095).await;

    let response = app
        .upload(
            MEMBER,
            "Loop",
            "loop.gpx",
            &common::fixture("clockwise_loop.gpx"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["route"]["cafes_passed"][0]["cafe_id"], cafe_id);
    assert_eq!(json["route"]["direction"], "CW");
}

#[tokio::test]
async fn test_cafe_outside_club_area_rejected() {
    let app = create_test_app();

    // Manchester
    let response = add_cafe(&app, "Northern Quarter", 53.48, -2.24).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.list_cafes().await.unwrap().is_empty());

    let response = add_cafe(&app, "Nowhere", 123.0, 0.0).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_removing_cafe_clears_passes() {
    let app = create_test_app();
    let loop_id = app.upload_ok(MEMBER, "clockwise_loop.gpx").await;
    let cafe_id = add_cafe_ok(&app, "Mill Cafe", 52.21, 0.095).await;

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/cafes/{}", cafe_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let route = app.store.get_route(loop_id).await.unwrap().unwrap();
    assert!(route.cafes_passed.is_empty());

    let response = app
        .send(Request::builder().uri("/api/cafes").body(Body::empty()).unwrap())
        .await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
}
