use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StartTrackingRequest {
    pub vehicle_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct WsQueryParams {
    pub token: String,
}
