use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        account::{Account, LoginRequest, RegisterRequest},
        auth::{AuthenticatedAccount, Claims, Session, SessionGrant},
    },
    services::{
        metrics::{LOGINS_COUNTER, REGISTRATIONS_COUNTER},
        profiles::ProfileService,
    },
    store::Store,
};

/// Emails are matched case-insensitively and without surrounding blanks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_email(email: &str) -> AppResult<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput("A valid email is required".into()));
    }
    Ok(())
}

pub struct AuthService;

impl AuthService {
    /// Create an account (and optionally its first child), then open a session.
    ///
    /// Only a bcrypt verifier of the password is stored.
    pub async fn register(
        store: &dyn Store,
        config: &Config,
        req: &RegisterRequest,
    ) -> AppResult<SessionGrant> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Name is required".into()));
        }
        let email = normalize_email(&req.email);
        validate_email(&email)?;
        if req.password.is_empty() {
            return Err(AppError::InvalidInput("Password is required".into()));
        }
        if let Some(child) = &req.child {
            ProfileService::validate_child(&child.name, child.age)?;
        }

        if store.find_account_by_email(&email).await?.is_some() {
            warn!("Registration rejected, email already in use: {}", email);
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = bcrypt::hash(&req.password, config.bcrypt_cost)
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {e}"))?;

        let account = Account {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            password_hash,
            created_at: Utc::now(),
        };
        store.insert_account(&account).await?;

        if let Some(child) = &req.child {
            ProfileService::add_child(store, account.id, child).await?;
        }

        REGISTRATIONS_COUNTER.inc();
        info!("Account registered: {}", account.id);

        Self::open_session(store, config, account.id).await
    }

    /// Check credentials and open a session.
    pub async fn authenticate(
        store: &dyn Store,
        config: &Config,
        req: &LoginRequest,
    ) -> AppResult<SessionGrant> {
        let email = normalize_email(&req.email);

        let Some(account) = store.find_account_by_email(&email).await? else {
            LOGINS_COUNTER.with_label_values(&["unknown_email"]).inc();
            info!("Login attempt for unknown email: {}", email);
            return Err(AppError::NotFound("Account"));
        };

        let valid = bcrypt::verify(&req.password, &account.password_hash)
            .map_err(|_| AppError::InvalidCredentials)?;
        if !valid {
            LOGINS_COUNTER.with_label_values(&["invalid_credentials"]).inc();
            info!("Invalid password for account {}", account.id);
            return Err(AppError::InvalidCredentials);
        }

        LOGINS_COUNTER.with_label_values(&["success"]).inc();
        info!("Login successful for account {}", account.id);

        Self::open_session(store, config, account.id).await
    }

    /// Revoke a session. Unknown or already-revoked sessions are fine.
    pub async fn end_session(store: &dyn Store, session_id: Uuid) -> AppResult<()> {
        if store.revoke_session(session_id).await? {
            info!("Session ended: {}", session_id);
        }
        Ok(())
    }

    /// Map a session token back to its account.
    ///
    /// Fails with `Unauthenticated` for a bad or expired token, a revoked or
    /// unknown session, or an account that no longer exists.
    pub async fn resolve_session(
        store: &dyn Store,
        config: &Config,
        token: &str,
    ) -> AppResult<AuthenticatedAccount> {
        let claims = decode_session_token(token, &config.jwt_secret)?;

        let session = store
            .find_session(claims.session_id)
            .await?
            .filter(|s| s.account_id == claims.account_id && s.is_live(Utc::now()))
            .ok_or(AppError::Unauthenticated)?;

        if store.find_account(session.account_id).await?.is_none() {
            return Err(AppError::Unauthenticated);
        }

        Ok(claims)
    }

    async fn open_session(
        store: &dyn Store,
        config: &Config,
        account_id: Uuid,
    ) -> AppResult<SessionGrant> {
        let now = Utc::now();
        let expires_at = i64::try_from(config.jwt_expiry_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| anyhow::anyhow!("Session lifetime out of range"))?;
        let session = Session {
            id: Uuid::new_v4(),
            account_id,
            created_at: now,
            expires_at,
            revoked: false,
        };
        store.insert_session(&session).await?;

        let claims = Claims {
            sub: account_id.to_string(),
            sid: session.id.to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .map_err(|e| anyhow::anyhow!("Token signing failed: {e}"))?;

        Ok(SessionGrant {
            account_id,
            token,
            expires_at,
        })
    }
}

/// Verify the signature and expiry of a session token without touching the store.
pub fn decode_session_token(token: &str, secret: &str) -> AppResult<AuthenticatedAccount> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|_| AppError::Unauthenticated)?;
    let claims = data.claims;

    Ok(AuthenticatedAccount {
        account_id: claims.sub.parse().map_err(|_| AppError::Unauthenticated)?,
        session_id: claims.sid.parse().map_err(|_| AppError::Unauthenticated)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::child::CreateChildRequest;
    use crate::store::MemoryStore;

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Alex".into(),
            email: email.into(),
            password: "hunter22".into(),
            child: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let store = MemoryStore::new();
        let config = Config::for_tests();

        let grant = AuthService::register(&store, &config, &register_req("Alex@Example.com "))
            .await
            .unwrap();

        let account = store.find_account(grant.account_id).await.unwrap().unwrap();
        assert_eq!(account.email, "alex@example.com");
        assert_ne!(account.password_hash, "hunter22");

        let login = AuthService::authenticate(
            &store,
            &config,
            &LoginRequest { email: "alex@example.com".into(), password: "hunter22".into() },
        )
        .await
        .unwrap();
        assert_eq!(login.account_id, grant.account_id);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryStore::new();
        let config = Config::for_tests();
        AuthService::register(&store, &config, &register_req("a@example.com"))
            .await
            .unwrap();
        let err = AuthService::register(&store, &config, &register_req("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let store = MemoryStore::new();
        let config = Config::for_tests();
        AuthService::register(&store, &config, &register_req("a@example.com"))
            .await
            .unwrap();

        let err = AuthService::authenticate(
            &store,
            &config,
            &LoginRequest { email: "a@example.com".into(), password: "wrong".into() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = AuthService::authenticate(
            &store,
            &config,
            &LoginRequest { email: "nobody@example.com".into(), password: "hunter22".into() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_register_with_first_child() {
        let store = MemoryStore::new();
        let config = Config::for_tests();
        let mut req = register_req("a@example.com");
        req.child = Some(CreateChildRequest {
            name: "Timmy".into(),
            age: 9,
            grade: "4".into(),
            school: "Lincoln".into(),
        });

        let grant = AuthService::register(&store, &config, &req).await.unwrap();
        let children = store.list_children(grant.account_id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "Timmy");
    }

    #[tokio::test]
    async fn test_end_session_is_idempotent() {
        let store = MemoryStore::new();
        let config = Config::for_tests();
        let grant = AuthService::register(&store, &config, &register_req("a@example.com"))
            .await
            .unwrap();

        let auth = AuthService::resolve_session(&store, &config, &grant.token)
            .await
            .unwrap();
        assert_eq!(auth.account_id, grant.account_id);

        AuthService::end_session(&store, auth.session_id).await.unwrap();
        AuthService::end_session(&store, auth.session_id).await.unwrap();

        let err = AuthService::resolve_session(&store, &config, &grant.token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthenticated() {
        let store = MemoryStore::new();
        let config = Config::for_tests();
        let err = AuthService::resolve_session(&store, &config, "not-a-jwt")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_oversized_session_lifetime_is_an_error() {
        let store = MemoryStore::new();
        let mut config = Config::for_tests();
        config.jwt_expiry_seconds = u64::MAX;

        let err = AuthService::register(&store, &config, &register_req("big@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        config.jwt_expiry_seconds = i64::MAX as u64;
        let err = AuthService::authenticate(
            &store,
            &config,
            &LoginRequest { email: "big@example.com".into(), password: "hunter22".into() },
        )
        .await;
        assert!(err.is_err());
    }
}
