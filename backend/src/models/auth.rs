use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Claims embedded in the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account UUID
    pub sid: String, // session UUID (to enable revocation)
    pub exp: usize,
    pub iat: usize,
}

/// Server-side record of an issued session token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Returned by register and login; the token also goes out as a cookie.
#[derive(Debug, Clone, Serialize)]
pub struct SessionGrant {
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Extracted from a valid session token and available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account_id: Uuid,
    pub session_id: Uuid,
}
