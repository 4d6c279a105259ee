use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{auth::AuthenticatedAccount, tracking::StartTrackingRequest},
    services::{profiles::ProfileService, tracking::TrackingSnapshot},
    AppState,
};

pub async fn start_tracking(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Json(body): Json<StartTrackingRequest>,
) -> AppResult<Json<TrackingSnapshot>> {
    ProfileService::vehicle_for_account(state.store.as_ref(), body.vehicle_id, auth.account_id)
        .await?;
    let snapshot = state.tracking.start(auth.account_id, body.vehicle_id).await;
    Ok(Json(snapshot))
}

pub async fn stop_tracking(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
) -> Json<TrackingSnapshot> {
    Json(state.tracking.stop(auth.account_id).await)
}

pub async fn tracking_status(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
) -> Json<TrackingSnapshot> {
    Json(state.tracking.snapshot(auth.account_id).await)
}
