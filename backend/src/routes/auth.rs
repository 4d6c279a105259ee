use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    error::AppResult,
    middleware::auth::{clear_session_cookie, session_cookie, session_token},
    models::account::{LoginRequest, RegisterRequest},
    services::auth::{decode_session_token, AuthService},
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let grant = AuthService::register(state.store.as_ref(), &state.config, &body).await?;
    let cookie = session_cookie(&grant.token, state.config.jwt_expiry_seconds);
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(grant)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let grant = AuthService::authenticate(state.store.as_ref(), &state.config, &body).await?;
    let cookie = session_cookie(&grant.token, state.config.jwt_expiry_seconds);
    Ok(([(header::SET_COOKIE, cookie)], Json(grant)))
}

/// Always succeeds; a missing or stale token simply has nothing to revoke.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    if let Some(token) = session_token(&headers) {
        if let Ok(session) = decode_session_token(&token, &state.config.jwt_secret) {
            AuthService::end_session(state.store.as_ref(), session.session_id).await?;
        }
    }
    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "message": "Signed out" })),
    ))
}
