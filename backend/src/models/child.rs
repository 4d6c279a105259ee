use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Child {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub age: i32,
    pub grade: String,
    pub school: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChildRequest {
    pub name: String,
    pub age: i32,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub school: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub grade: Option<String>,
    pub school: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteChildResponse {
    /// True when this was the last child and the whole account went with it.
    pub account_deleted: bool,
}
