use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        auth::AuthenticatedAccount,
        driver::{CreateDriverRequest, DriverProfile, UpdateDriverRequest},
    },
    services::profiles::ProfileService,
    AppState,
};

pub async fn create_driver(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Json(body): Json<CreateDriverRequest>,
) -> AppResult<(StatusCode, Json<DriverProfile>)> {
    let driver = ProfileService::add_driver(state.store.as_ref(), auth.account_id, &body).await?;
    Ok((StatusCode::CREATED, Json(driver)))
}

pub async fn update_driver(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateDriverRequest>,
) -> AppResult<Json<DriverProfile>> {
    ProfileService::update_driver(state.store.as_ref(), id, auth.account_id, &body)
        .await
        .map(Json)
}

pub async fn delete_driver(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let removed = ProfileService::delete_driver(state.store.as_ref(), id, auth.account_id).await?;
    state
        .tracking
        .stop_if_tracking(auth.account_id, &removed)
        .await;
    Ok(Json(json!({ "message": "Driver deleted" })))
}
