// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route library API.

use crate::error::{AppError, Result, TrackError};
use crate::middleware::auth::{AuthUser, Viewer};
use crate::models::{NewRoute, RouteRecord, RouteSummary, RouteType};
use crate::services::{gpx_file, route_map, MapError, NormalizeReport, RouteMap};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Routes open to everyone (caller identity is optional).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/routes", get(list_routes))
        .route("/api/routes/{id}", get(get_route))
        .route("/api/routes/{id}/map", get(get_route_map))
}

/// Routes that need a signed-in member.
pub fn member_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/routes", post(upload_route))
        .route("/api/routes/{id}", axum::routing::delete(delete_route))
        .route("/api/routes/{id}/download", get(download_route))
        .route("/api/routes/{id}/cut-start", post(cut_start))
        .route("/api/routes/{id}/cut-end", post(cut_end))
        .route("/api/routes/{id}/publish", post(publish_route))
        .route("/api/routes/{id}/hide", post(hide_route))
}

// ─── Helpers ─────────────────────────────────────────────────

async fn load_route(state: &AppState, route_id: u64) -> Result<RouteRecord> {
    state
        .store
        .get_route(route_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route {}", route_id)))
}

/// Hidden routes are only visible to their owner and admins.
fn is_visible(route: &RouteRecord, user: Option<&AuthUser>) -> bool {
    route.public || user.is_some_and(|u| route.can_edit(&u.email, u.is_admin))
}

async fn load_visible_route(
    state: &AppState,
    route_id: u64,
    user: Option<&AuthUser>,
) -> Result<RouteRecord> {
    let route = load_route(state, route_id).await?;
    if !is_visible(&route, user) {
        return Err(AppError::NotFound(format!("Route {}", route_id)));
    }
    Ok(route)
}

async fn load_editable_route(
    state: &AppState,
    route_id: u64,
    user: &AuthUser,
) -> Result<RouteRecord> {
    let route = load_route(state, route_id).await?;
    if !route.can_edit(&user.email, user.is_admin) {
        return Err(AppError::Forbidden(
            "Only the route owner or an admin can change this route".to_string(),
        ));
    }
    Ok(route)
}

/// Attachment name for a downloaded route, e.g. `Club_Hills_and_Dales.gpx`.
pub fn download_filename(club_name: &str, route_name: &str) -> String {
    let stem: String = format!("{}_{}", club_name, route_name.trim())
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| !c.is_control() && !matches!(c, '"' | '/' | '\\'))
        .collect();
    format!("{}.gpx", stem)
}

/// `Content-Disposition` value with an ASCII fallback name and the full
/// UTF-8 name for clients that understand it.
fn attachment_header(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    )
}

// ─── Listing ─────────────────────────────────────────────────

async fn list_routes(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<RouteSummary>>> {
    let routes = state.store.list_routes().await?;
    let summaries = routes
        .iter()
        .filter(|r| is_visible(r, viewer.user()))
        .map(RouteSummary::from)
        .collect();
    Ok(Json(summaries))
}

async fn get_route(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(route_id): Path<u64>,
) -> Result<Json<RouteSummary>> {
    let route = load_visible_route(&state, route_id, viewer.user()).await?;
    Ok(Json(RouteSummary::from(&route)))
}

async fn get_route_map(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(route_id): Path<u64>,
) -> Result<Json<RouteMap>> {
    let route = load_visible_route(&state, route_id, viewer.user()).await?;
    let segments = state.normalizer.stored_segments(&route).await?;

    let map = route_map(route.id, &route.name, &segments).map_err(|e| match e {
        MapError::NoPoints => AppError::NotFound(format!("Route {} has no points", route.id)),
        other => AppError::Internal(other.into()),
    })?;
    Ok(Json(map))
}

// ─── Upload ──────────────────────────────────────────────────

#[derive(Debug, Default, Validate)]
struct UploadForm {
    #[validate(length(min = 1, max = 100, message = "Route name must be 1-100 characters"))]
    name: String,
    route_type: RouteType,
    #[validate(length(max = 2000, message = "Details must be at most 2000 characters"))]
    details: Option<String>,
    filename: Option<String>,
    file: Option<Vec<u8>>,
}

async fn read_upload_form(mut multipart: Multipart, max_bytes: usize) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    let form_error = |e: MultipartError| multipart_error(e, max_bytes);

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => {
                form.name = field.text().await.map_err(form_error)?.trim().to_string();
            }
            "type" => {
                let value = field.text().await.map_err(form_error)?;
                form.route_type = value.parse().map_err(AppError::BadRequest)?;
            }
            "details" => {
                let value = field.text().await.map_err(form_error)?;
                let value = value.trim();
                form.details = (!value.is_empty()).then(|| value.to_string());
            }
            "file" => {
                form.filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(form_error)?;
                if bytes.len() > max_bytes {
                    return Err(AppError::PayloadTooLarge(max_bytes));
                }
                form.file = Some(bytes.to_vec());
            }
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(max_bytes)
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Result of an upload or cut. When the stats could not be saved the new
/// track is still stored; `stats_saved` is false and the route summary
/// carries the previous stats.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RouteUpdateResponse {
    pub route: RouteSummary,
    /// Unknown when the stats were not saved
    pub points_before: Option<usize>,
    pub points_after: usize,
    pub stats_saved: bool,
}

/// Accept a new route: validate, create the record, normalize the track.
async fn upload_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<RouteUpdateResponse>)> {
    let form = read_upload_form(multipart, state.config.max_upload_bytes).await?;
    form.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let filename = form
        .filename
        .ok_or_else(|| AppError::BadRequest("No GPX file attached".to_string()))?;
    if !gpx_file::is_gpx_filename(&filename) {
        return Err(AppError::BadRequest(format!(
            "'{}' is not a .gpx file",
            filename
        )));
    }
    let bytes = form
        .file
        .ok_or_else(|| AppError::BadRequest("No GPX file attached".to_string()))?;

    // Reject bad files before anything is stored
    let gpx = gpx_file::parse_gpx(&bytes)?;
    gpx_file::track_segments(&gpx)?;

    let route = state
        .store
        .insert_route(
            NewRoute {
                name: form.name,
                owner_email: user.email.clone(),
                route_type: form.route_type,
                details: form.details,
            },
            format_utc_rfc3339(chrono::Utc::now()),
        )
        .await?;

    tracing::info!(
        route_id = route.id,
        owner = %user.email,
        upload = %filename,
        bytes = bytes.len(),
        "Route uploaded"
    );

    let outcome = match state.normalizer.normalize_gpx(&route, &gpx).await {
        Err(e) if !e.file_replaced() => {
            discard_route(&state, &route).await;
            return Err(e.into());
        }
        outcome => outcome,
    };

    let response = finish_update(&state, &route, outcome).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Best-effort removal of a route whose upload failed part way.
async fn discard_route(state: &AppState, route: &RouteRecord) {
    if let Err(e) = state.store.delete_route(route.id).await {
        tracing::warn!(route_id = route.id, error = %e, "Failed to remove record of failed upload");
    }
    if let Err(e) = state.normalizer.files().remove(&route.filename).await {
        tracing::warn!(route_id = route.id, error = %e, "Failed to remove file of failed upload");
    }
}

/// Refresh cafes after a track change and build the response.
///
/// A stats failure after the file was replaced still refreshes cafes from
/// the stored track.
async fn finish_update(
    state: &AppState,
    route: &RouteRecord,
    outcome: std::result::Result<NormalizeReport, TrackError>,
) -> Result<RouteUpdateResponse> {
    let (segments, points_before, stats_saved) = match outcome {
        Ok(report) => (vec![report.points], Some(report.points_before), true),
        Err(e) if e.file_replaced() => {
            tracing::warn!(route_id = route.id, error = %e, "Track stored with stale stats");
            (state.normalizer.stored_segments(route).await?, None, false)
        }
        Err(e) => return Err(e.into()),
    };
    state.cafes.refresh_route(route.id, &segments).await?;

    let updated = load_route(state, route.id).await?;
    Ok(RouteUpdateResponse {
        route: RouteSummary::from(&updated),
        points_before,
        points_after: segments.iter().map(Vec::len).sum(),
        stats_saved,
    })
}

// ─── Download ────────────────────────────────────────────────

async fn download_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<u64>,
) -> Result<Response> {
    let route = load_visible_route(&state, route_id, Some(&user)).await?;
    let bytes = state
        .normalizer
        .prepare_download(&route, &state.config.club_name, &state.config.site_url)
        .await?;

    if let Err(e) = state.store.record_download(route.id, &user.email).await {
        tracing::warn!(route_id = route.id, error = %e, "Failed to record download");
    }

    let attachment = download_filename(&state.config.club_name, &route.name);
    tracing::info!(route_id = route.id, member = %user.email, file = %attachment, "Route downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, "application/gpx+xml".to_string()),
            (header::CONTENT_DISPOSITION, attachment_header(&attachment)),
        ],
        bytes,
    )
        .into_response())
}

// ─── Editing ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CutRequest {
    /// 1-based index of the point to cut at
    count: usize,
}

async fn cut_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<u64>,
    Json(body): Json<CutRequest>,
) -> Result<Json<RouteUpdateResponse>> {
    let route = load_editable_route(&state, route_id, &user).await?;
    let outcome = state.normalizer.cut_start(&route, body.count).await;
    Ok(Json(finish_update(&state, &route, outcome).await?))
}

async fn cut_end(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<u64>,
    Json(body): Json<CutRequest>,
) -> Result<Json<RouteUpdateResponse>> {
    let route = load_editable_route(&state, route_id, &user).await?;
    let outcome = state.normalizer.cut_end(&route, body.count).await;
    Ok(Json(finish_update(&state, &route, outcome).await?))
}

async fn set_visibility(
    state: &AppState,
    route_id: u64,
    user: &AuthUser,
    public: bool,
) -> Result<Json<RouteSummary>> {
    let route = load_editable_route(state, route_id, user).await?;
    state.store.set_public(route.id, public).await?;
    tracing::info!(route_id, public, by = %user.email, "Route visibility changed");

    let updated = load_route(state, route_id).await?;
    Ok(Json(RouteSummary::from(&updated)))
}

async fn publish_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<u64>,
) -> Result<Json<RouteSummary>> {
    set_visibility(&state, route_id, &user, true).await
}

async fn hide_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<u64>,
) -> Result<Json<RouteSummary>> {
    set_visibility(&state, route_id, &user, false).await
}

async fn delete_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<u64>,
) -> Result<StatusCode> {
    let route = load_editable_route(&state, route_id, &user).await?;

    state.store.delete_route(route.id).await?;
    state.normalizer.files().remove(&route.filename).await?;

    tracing::info!(route_id, by = %user.email, "Route deleted");
    Ok(StatusCode::NO_CONTENT)
}
