//! Common test utilities for integration tests.
//!
//! Each test spins up a local axum server on an ephemeral port that stands in for a
//! hosted API, so the production reqwest clients are exercised end to end.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

/// Serve the router built by `build` and return its base URL.
///
/// `build` receives the base URL so responses can point back at the server.
pub async fn serve<F>(build: F) -> String
where
    F: FnOnce(String) -> Router,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let base = format!("http://{}", listener.local_addr().expect("No local address"));
    let app = build(base.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    base
}

/// In-memory GitHub repository serving the contents API and raw downloads.
#[derive(Clone, Default)]
pub struct FakeGitHub {
    files: Arc<Mutex<BTreeMap<String, String>>>,
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

#[derive(Clone)]
struct GitHubState {
    base: String,
    repo: FakeGitHub,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file at a repository path.
    pub fn put(&self, path: &str, content: impl Into<String>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.into());
    }

    /// `Authorization` header of every contents API request, in order.
    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().unwrap().clone()
    }

    /// Start the server and return its base URL.
    pub async fn start(&self) -> String {
        let repo = self.clone();
        serve(move |base| {
            Router::new()
                .route("/repos/:owner/:repo/contents/*path", get(contents))
                .route("/raw/*path", get(raw))
                .with_state(GitHubState { base, repo })
        })
        .await
    }
}

fn entry(base: &str, path: &str) -> serde_json::Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({
        "name": name,
        "path": path,
        "sha": format!("sha-{}", path.len()),
        "type": "file",
        "download_url": format!("{}/raw/{}", base, path),
    })
}

async fn contents(
    State(state): State<GitHubState>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    state.repo.auth_headers.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );

    let files = state.repo.files.lock().unwrap().clone();
    let path = path.trim_matches('/').to_string();

    if files.contains_key(&path) {
        return Json(entry(&state.base, &path)).into_response();
    }

    let prefix = format!("{}/", path);
    let listing: Vec<serde_json::Value> = files
        .keys()
        .filter(|key| {
            key.strip_prefix(&prefix)
                .map_or(false, |rest| !rest.contains('/'))
        })
        .map(|key| entry(&state.base, key))
        .collect();

    if listing.is_empty() {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response();
    }
    Json(listing).into_response()
}

async fn raw(State(state): State<GitHubState>, Path(path): Path<String>) -> Response {
    match state.repo.files.lock().unwrap().get(path.trim_matches('/')) {
        Some(content) => content.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
