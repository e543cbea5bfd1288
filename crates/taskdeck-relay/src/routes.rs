//! Route definitions and handlers

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{html, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/callback", get(callback))
        .route("/auth/start", get(auth_start))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}

/// Query string the provider redirects back with.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

#[tracing::instrument(skip_all)]
pub async fn callback(State(state): State<AppState>, Query(params): Query<CallbackParams>) -> Response {
    if let Some(error) = present(params.error.as_ref()) {
        warn!(error = %error, "provider returned an authorization error");
        return (StatusCode::BAD_REQUEST, Html(html::error_page(error))).into_response();
    }

    let Some(code) = present(params.code.as_ref()) else {
        warn!("callback without authorization code");
        return (StatusCode::BAD_REQUEST, Html(html::missing_code_page())).into_response();
    };

    let target = state.config.forward_target(code, present(params.state.as_ref()));
    info!(forward_url = %state.config.forward_url, "forwarding authorization code");
    Html(html::forward_page(&target)).into_response()
}

/// Starts a login by redirecting to the provider's authorization URL.
#[tracing::instrument(skip_all)]
pub async fn auth_start(State(state): State<AppState>) -> Response {
    let Some(auth) = state.auth.as_ref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "OAuth client not configured").into_response();
    };
    match auth.login() {
        Ok(request) => {
            info!("redirecting to authorization endpoint");
            (StatusCode::FOUND, [(header::LOCATION, request.url)]).into_response()
        }
        Err(err) => {
            warn!(error = %err, "failed to build authorization URL");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "Not Found",
    )
        .into_response()
}
