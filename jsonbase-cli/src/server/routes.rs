use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonbase_lib::key::normalize_key;
use jsonbase_lib::{Identity, StoreError};
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;
use crate::value::parse_value;

#[derive(Deserialize, Default)]
pub struct GetParams {
    default: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct PutParams {
    pretty: Option<bool>,
}

// ── Helpers ──────────────────────────────────────────────────

fn error_response(err: StoreError) -> Response {
    let status = match err {
        StoreError::InvalidIdentity { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

/// Rejects bad identities with 400 before the store is touched.
fn validate_identity(identity: String) -> Result<Identity, Response> {
    Identity::new(identity).map_err(|err| {
        tracing::debug!("rejected request: {}", err);
        error_response(err)
    })
}

async fn get_value(
    state: &AppState,
    identity: Option<&str>,
    key: &str,
    params: GetParams,
) -> Response {
    let default = params
        .default
        .as_deref()
        .map(parse_value)
        .unwrap_or(Value::Null);
    let value = state.store.get(identity, key, default).await;
    (
        StatusCode::OK,
        Json(json!({"key": normalize_key(key), "value": value})),
    )
        .into_response()
}

async fn put_value(
    state: &AppState,
    identity: Option<&str>,
    key: &str,
    params: PutParams,
    value: Value,
) -> Response {
    let pretty = params.pretty.unwrap_or(state.pretty_default);
    match state.store.try_set(identity, key, value, pretty).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            tracing::warn!(key, "set failed: {}", err);
            error_response(err)
        }
    }
}

// ── Health ───────────────────────────────────────────────────

pub async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    let initialized = state.store.ensure_initialized().await;
    let status = if initialized {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if initialized { "ok" } else { "unavailable" },
            "root": state.store.root().display().to_string(),
        })),
    )
        .into_response()
}

// ── GET|PUT /global/{key} ────────────────────────────────────

pub async fn handle_get_global(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<GetParams>,
) -> Response {
    get_value(&state, None, &key, params).await
}

pub async fn handle_put_global(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<PutParams>,
    Json(value): Json<Value>,
) -> Response {
    put_value(&state, None, &key, params, value).await
}

// ── GET|PUT /users/{id}/{key} ────────────────────────────────

pub async fn handle_get_private(
    State(state): State<Arc<AppState>>,
    Path((identity, key)): Path<(String, String)>,
    Query(params): Query<GetParams>,
) -> Response {
    let identity = match validate_identity(identity) {
        Ok(identity) => identity,
        Err(resp) => return resp,
    };
    get_value(&state, Some(identity.as_str()), &key, params).await
}

pub async fn handle_put_private(
    State(state): State<Arc<AppState>>,
    Path((identity, key)): Path<(String, String)>,
    Query(params): Query<PutParams>,
    Json(value): Json<Value>,
) -> Response {
    let identity = match validate_identity(identity) {
        Ok(identity) => identity,
        Err(resp) => return resp,
    };
    put_value(&state, Some(identity.as_str()), &key, params, value).await
}

// ── /users and /users/{id} ───────────────────────────────────

pub async fn handle_list_users(State(state): State<Arc<AppState>>) -> Response {
    match state.store.try_list_identities().await {
        Ok(ids) => {
            let ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
            (StatusCode::OK, Json(json!({"users": ids}))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn handle_user_exists(
    State(state): State<Arc<AppState>>,
    Path(identity): Path<String>,
) -> Response {
    let identity = match validate_identity(identity) {
        Ok(identity) => identity,
        Err(resp) => return resp,
    };
    match state.store.try_identity_exists(identity.as_str()).await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({"user": identity.as_str(), "exists": true})),
        )
            .into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"user": identity.as_str(), "exists": false})),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn handle_create_user(
    State(state): State<Arc<AppState>>,
    Path(identity): Path<String>,
) -> Response {
    let identity = match validate_identity(identity) {
        Ok(identity) => identity,
        Err(resp) => return resp,
    };
    match state.store.try_create_identity(identity.as_str()).await {
        Ok(true) => {
            tracing::info!(%identity, "user created");
            (
                StatusCode::CREATED,
                Json(json!({"user": identity.as_str(), "created": true})),
            )
                .into_response()
        }
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(json!({"user": identity.as_str(), "created": false})),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

// ── Metadata ─────────────────────────────────────────────────

async fn meta_response(state: &AppState, identity: Option<&str>) -> Response {
    match state.store.try_meta(identity).await {
        Ok(Some(meta)) => (StatusCode::OK, Json(meta)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "namespace not found"})),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn handle_global_meta(State(state): State<Arc<AppState>>) -> Response {
    meta_response(&state, None).await
}

pub async fn handle_user_meta(
    State(state): State<Arc<AppState>>,
    Path(identity): Path<String>,
) -> Response {
    match validate_identity(identity) {
        Ok(identity) => meta_response(&state, Some(identity.as_str())).await,
        Err(resp) => resp,
    }
}

// ── DELETE /data ─────────────────────────────────────────────

pub async fn handle_clear(State(state): State<Arc<AppState>>) -> Response {
    match state.store.try_clear_all().await {
        Ok(()) => {
            tracing::info!(root = %state.store.root().display(), "store cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonbase_lib::Store;

    fn state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("Database"));
        (dir, Arc::new(AppState::new(store, false)))
    }

    #[test]
    fn test_error_status_mapping() {
        let invalid = Identity::new("a/b").unwrap_err();
        assert_eq!(error_response(invalid).status(), StatusCode::BAD_REQUEST);

        let io = StoreError::Io {
            path: "/db".into(),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(
            error_response(io).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_private_routes_reject_bad_identities() {
        let (_dir, state) = state();
        for bad in ["..", "a\\b"] {
            let put = handle_put_private(
                State(Arc::clone(&state)),
                Path((bad.to_string(), "k".to_string())),
                Query(PutParams::default()),
                Json(json!(1)),
            )
            .await;
            assert_eq!(put.status(), StatusCode::BAD_REQUEST, "put {:?}", bad);

            let get = handle_get_private(
                State(Arc::clone(&state)),
                Path((bad.to_string(), "k".to_string())),
                Query(GetParams::default()),
            )
            .await;
            assert_eq!(get.status(), StatusCode::BAD_REQUEST, "get {:?}", bad);

            let meta = handle_user_meta(State(Arc::clone(&state)), Path(bad.to_string())).await;
            assert_eq!(meta.status(), StatusCode::BAD_REQUEST, "meta {:?}", bad);

            let exists =
                handle_user_exists(State(Arc::clone(&state)), Path(bad.to_string())).await;
            assert_eq!(exists.status(), StatusCode::BAD_REQUEST, "exists {:?}", bad);

            let create =
                handle_create_user(State(Arc::clone(&state)), Path(bad.to_string())).await;
            assert_eq!(create.status(), StatusCode::BAD_REQUEST, "create {:?}", bad);
        }
        assert!(state.store.list_identities().await.is_empty());
    }

    #[tokio::test]
    async fn test_private_round_trip() {
        let (_dir, state) = state();
        let put = handle_put_private(
            State(Arc::clone(&state)),
            Path(("Bob".to_string(), "Score".to_string())),
            Query(PutParams::default()),
            Json(json!(42)),
        )
        .await;
        assert_eq!(put.status(), StatusCode::NO_CONTENT);

        let exists = handle_user_exists(State(Arc::clone(&state)), Path("Bob".to_string())).await;
        assert_eq!(exists.status(), StatusCode::OK);
        let missing = handle_user_exists(State(Arc::clone(&state)), Path("bob".to_string())).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let meta = handle_user_meta(State(Arc::clone(&state)), Path("Bob".to_string())).await;
        assert_eq!(meta.status(), StatusCode::OK);
        assert_eq!(
            state.store.get(Some("Bob"), "score", Value::Null).await,
            json!(42)
        );

        let created = handle_create_user(State(Arc::clone(&state)), Path("Bob".to_string())).await;
        assert_eq!(created.status(), StatusCode::CONFLICT);
    }
}
