use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const VIN_LENGTH: usize = 17;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub license_number: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub phone_number: String,
    pub vin: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDriverRequest {
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub phone_number: Option<String>,
    pub vin: Option<String>,
}

/// A driver together with the vehicle(s) registered under them.
#[derive(Debug, Clone, Serialize)]
pub struct DriverProfile {
    #[serde(flatten)]
    pub driver: Driver,
    pub vehicles: Vec<Vehicle>,
}
