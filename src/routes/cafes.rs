// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cafe API.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Cafe, NewCafe};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/cafes", get(list_cafes))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/cafes", post(add_cafe))
        .route("/api/cafes/{id}", delete(remove_cafe))
}

#[derive(Debug, Deserialize, Validate)]
struct NewCafeRequest {
    #[validate(length(min = 1, max = 100, message = "Cafe name must be 1-100 characters"))]
    name: String,
    #[validate(range(min = -90.0, max = 90.0))]
    lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    lon: f64,
}

fn require_admin(user: &AuthUser) -> Result<()> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admins only".to_string()))
    }
}

async fn list_cafes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Cafe>>> {
    Ok(Json(state.store.list_cafes().await?))
}

async fn add_cafe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewCafeRequest>,
) -> Result<(StatusCode, Json<Cafe>)> {
    require_admin(&user)?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let cafe = state
        .cafes
        .add_cafe(NewCafe {
            name: body.name.trim().to_string(),
            lat: body.lat,
            lon: body.lon,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(cafe)))
}

async fn remove_cafe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(cafe_id): Path<u64>,
) -> Result<StatusCode> {
    require_admin(&user)?;
    state.cafes.remove_cafe(cafe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
