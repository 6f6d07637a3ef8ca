//! HTTP settings surface (spec §6): `GET/PUT/POST/DELETE /settings`,
//! `POST/PUT /reset`, `POST/PUT /erase`, `HEAD * -> 405`. Axum router over
//! the shared [`crate::System`], matching the depot services' `Router` +
//! `State` + `CorsLayer` shape.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::System;

pub fn router(system: Arc<System>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/settings", get(get_settings).put(put_settings).post(put_settings).delete(delete_settings))
        .route("/reset", post(schedule_reset).put(schedule_reset))
        .route("/erase", post(erase_settings).put(erase_settings))
        .fallback(method_not_supported)
        .layer(middleware::from_fn(reject_head))
        .layer(CorsLayer::permissive())
        .with_state(system)
}

/// `HEAD *` always returns `405` (spec §6), overriding Axum's default
/// behavior of answering `HEAD` from a route's `GET` handler.
async fn reject_head(request: Request, next: Next) -> Response {
    if request.method() == Method::HEAD {
        StatusCode::METHOD_NOT_ALLOWED.into_response()
    } else {
        next.run(request).await
    }
}

async fn root() -> impl IntoResponse {
    Redirect::to("/index.html")
}

async fn get_settings(axum::extract::State(system): axum::extract::State<Arc<System>>) -> impl IntoResponse {
    let store = system.settings.lock().await;
    // Two-pass size-then-send: the body is fully serialized before any
    // response is constructed, so its length is known up front (spec §4.8).
    let body = settings::json_get(&store).to_string();
    drop(store);
    (StatusCode::OK, [("Content-Type", "application/json")], body)
}

async fn put_settings(
    axum::extract::State(system): axum::extract::State<Arc<System>>,
    body: Bytes,
) -> impl IntoResponse {
    let mut store = system.settings.lock().await;
    match settings::json_put(&mut store, &body) {
        Ok(settings::PutOutcome::Applied) => {
            drop(store);
            system.reload_from_settings().await;
            StatusCode::OK
        }
        Ok(settings::PutOutcome::EmptyBody) => StatusCode::NO_CONTENT,
        Ok(settings::PutOutcome::ParseError) => StatusCode::BAD_REQUEST,
        Err(e) => {
            warn!(?e, "settings PUT failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn delete_settings(
    axum::extract::State(system): axum::extract::State<Arc<System>>,
    body: Bytes,
) -> impl IntoResponse {
    let mut store = system.settings.lock().await;
    match settings::json_delete(&mut store, &body) {
        Ok(settings::DeleteOutcome::Applied) => {
            drop(store);
            system.reload_from_settings().await;
            StatusCode::OK
        }
        Ok(settings::DeleteOutcome::EmptyBody) => StatusCode::NO_CONTENT,
        Ok(settings::DeleteOutcome::ParseError) => StatusCode::BAD_REQUEST,
        Err(e) => {
            warn!(?e, "settings DELETE failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn schedule_reset(axum::extract::State(system): axum::extract::State<Arc<System>>) -> impl IntoResponse {
    info!("reset scheduled over HTTP");
    system.scheduler.lock().await.schedule_reset(crate::RESET_COUNTDOWN_TICKS);
    StatusCode::OK
}

async fn erase_settings(axum::extract::State(system): axum::extract::State<Arc<System>>) -> impl IntoResponse {
    warn!("settings erase requested over HTTP");
    let mut store = system.settings.lock().await;
    match store.erase() {
        Ok(()) => {
            let _ = settings::ensure_defaults(&mut store);
            drop(store);
            StatusCode::OK
        }
        Err(e) => {
            warn!(?e, "settings erase failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn method_not_supported() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}
