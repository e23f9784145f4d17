// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use club_routes::config::Config;
use club_routes::db::{FirestoreDb, MemoryStore};
use club_routes::middleware::auth::Claims;
use club_routes::routes::create_router;
use club_routes::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const MEMBER: &str = "rider@club.org";
pub const OTHER_MEMBER: &str = "someone@club.org";
pub const ADMIN: &str = "admin@club.org";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Sign a session token the way the club website does.
#[allow(dead_code)]
pub fn create_test_jwt(email: &str, is_admin: bool, signing_key: &[u8]) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: email.to_string(),
        iat: now,
        exp: now + 30 * 24 * 60 * 60,
        admin: is_admin,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .expect("Failed to sign test token")
}

/// App wired to an in-memory store and a throwaway track directory.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    pub fn token(&self, email: &str) -> String {
        create_test_jwt(email, false, &self.state.config.jwt_signing_key)
    }

    pub fn admin_token(&self) -> String {
        create_test_jwt(ADMIN, true, &self.state.config.jwt_signing_key)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Upload a fixture as `email`, returning the response.
    pub async fn upload(&self, email: &str, name: &str, filename: &str, bytes: &[u8]) -> Response {
        let (content_type, body) = multipart_body(&[
            ("name", None, name.as_bytes()),
            ("type", None, b"Gravel"),
            ("details", None, b"Coffee stop at the halfway point"),
            ("file", Some(filename), bytes),
        ]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/routes")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(email)))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Upload a fixture and return the new route's ID.
    pub async fn upload_ok(&self, email: &str, fixture_name: &str) -> u64 {
        let response = self.upload(email, "Test Route", fixture_name, &fixture(fixture_name)).await;
        assert_eq!(response.status(), 201, "upload of {} failed", fixture_name);
        let json = body_json(response).await;
        json["route"]["id"].as_u64().unwrap()
    }

    pub fn track_path(&self, route_id: u64) -> PathBuf {
        self.dir.path().join(format!("gpx_{}.gpx", route_id))
    }
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(|_| {})
}

/// Like [`create_test_app`], with a hook to adjust the config first.
#[allow(dead_code)]
pub fn create_test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::test_default();
    config.gpx_dir = dir.path().to_path_buf();
    config.club_name = "Club".to_string();
    config.site_url = "https://club.example".to_string();
    adjust(&mut config);

    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config, store.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        dir,
    }
}

/// Read a file from `tests/fixtures`.
#[allow(dead_code)]
pub fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Build a multipart/form-data body from (field, filename, content) parts.
#[allow(dead_code)]
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "club-routes-test-boundary";
    let mut body = Vec::new();

    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/gpx+xml\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
