use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        auth::AuthenticatedAccount,
        location::{LocationSample, RecordLocationRequest},
    },
    services::{
        map::{render, MapScene, SvgCanvas, DEFAULT_HEIGHT, DEFAULT_WIDTH},
        profiles::ProfileService,
    },
    AppState,
};

pub async fn record_location(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(vehicle_id): Path<Uuid>,
    Json(body): Json<RecordLocationRequest>,
) -> AppResult<(StatusCode, Json<LocationSample>)> {
    ProfileService::vehicle_for_account(state.store.as_ref(), vehicle_id, auth.account_id).await?;
    let sample = state
        .feed
        .record(vehicle_id, body.latitude, body.longitude)
        .await?;
    Ok((StatusCode::CREATED, Json(sample)))
}

pub async fn latest_location(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<Json<LocationSample>> {
    ProfileService::vehicle_for_account(state.store.as_ref(), vehicle_id, auth.account_id).await?;
    state.feed.latest(vehicle_id).await.map(Json)
}

pub async fn location_history(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<Json<Vec<LocationSample>>> {
    ProfileService::vehicle_for_account(state.store.as_ref(), vehicle_id, auth.account_id).await?;
    state.feed.history(vehicle_id).await.map(Json)
}

/// GET /vehicles/{id}/map.svg: schematic map with the latest position.
pub async fn map_svg(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    ProfileService::vehicle_for_account(state.store.as_ref(), vehicle_id, auth.account_id).await?;
    let sample = state.feed.latest(vehicle_id).await?;

    let scene = MapScene::new(
        DEFAULT_WIDTH,
        DEFAULT_HEIGHT,
        state.config.reference_point(),
        Some(sample.point()),
    );
    let mut canvas = SvgCanvas::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
    render(Some(&mut canvas), &scene);

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], canvas.finish()))
}
