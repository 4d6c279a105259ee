use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::auth::clear_session_cookie,
    models::{
        auth::AuthenticatedAccount,
        child::{Child, CreateChildRequest, UpdateChildRequest},
    },
    services::profiles::ProfileService,
    AppState,
};

pub async fn create_child(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Json(body): Json<CreateChildRequest>,
) -> AppResult<(StatusCode, Json<Child>)> {
    let child = ProfileService::add_child(state.store.as_ref(), auth.account_id, &body).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn update_child(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChildRequest>,
) -> AppResult<Json<Child>> {
    ProfileService::update_child(state.store.as_ref(), id, auth.account_id, &body)
        .await
        .map(Json)
}

/// Deleting the last child closes the account, so the session cookie goes too.
pub async fn delete_child(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let res = ProfileService::delete_child(state.store.as_ref(), id, auth.account_id).await?;

    let mut headers = Vec::new();
    if res.account_deleted {
        state.tracking.forget(auth.account_id).await;
        headers.push((header::SET_COOKIE, clear_session_cookie()));
    }
    Ok((AppendHeaders(headers), Json(res)))
}
