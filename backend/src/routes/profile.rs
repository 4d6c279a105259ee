use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{
        account::{AccountProfile, Profile, UpdateAccountRequest},
        auth::AuthenticatedAccount,
    },
    services::profiles::ProfileService,
    AppState,
};

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
) -> AppResult<Json<Profile>> {
    ProfileService::get_profile(state.store.as_ref(), auth.account_id)
        .await
        .map(Json)
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
    Json(body): Json<UpdateAccountRequest>,
) -> AppResult<Json<AccountProfile>> {
    ProfileService::update_account(state.store.as_ref(), auth.account_id, &body)
        .await
        .map(Json)
}
