//! Authentication and authorization.
//!
//! Bearer JWTs are validated by a middleware layer that resolves the token
//! into an [`AuthUser`] request extension; handlers receive the identity as
//! an explicit extractor argument and pass it on to the services. There is
//! no ambient current-user anywhere below the handler boundary.

use crate::entities::{refresh_token, Profile, RefreshToken, Role, User, UserModel};
use crate::errors::ServiceError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const REFRESH_TOKEN_LEN: usize = 64;

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Option<Role>,
    pub staff: bool,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated identity extracted from a validated token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Option<Role>,
    pub is_staff: bool,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    /// Errors with `Forbidden` unless the caller holds the given role.
    pub fn require_role(&self, role: Role, action: &str) -> Result<(), ServiceError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!("Only {role:?}s can {action}").to_lowercase()))
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Internal auth error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::MissingAuth => (StatusCode::UNAUTHORIZED, "AUTH_MISSING"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_TOKEN"),
            Self::ExpiredToken => (StatusCode::UNAUTHORIZED, "AUTH_EXPIRED_TOKEN"),
            Self::InsufficientPermissions => (StatusCode::FORBIDDEN, "AUTH_FORBIDDEN"),
            Self::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_INTERNAL"),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

/// Token pair returned on login and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Issues and validates tokens, hashes passwords, manages refresh tokens.
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
    }

    pub fn verify_password(&self, hash: &str, password: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| ServiceError::InternalError(format!("stored hash unreadable: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Issues an access token plus a stored refresh token for the user.
    pub async fn issue_token_pair(
        &self,
        user: &UserModel,
        role: Option<Role>,
    ) -> Result<TokenPair, ServiceError> {
        let access_token = self.encode_access_token(user, role)?;
        let refresh_token = self.create_refresh_token(user.id).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl.as_secs(),
        })
    }

    fn encode_access_token(
        &self,
        user: &UserModel,
        role: Option<Role>,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role,
            staff: user.is_staff,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ChronoDuration::seconds(self.config.access_token_ttl.as_secs() as i64))
                .timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token encoding failed: {e}")))
    }

    /// Validates an access token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
    }

    async fn create_refresh_token(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REFRESH_TOKEN_LEN)
            .map(char::from)
            .collect();

        let row = refresh_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(Self::hash_refresh_token(&token)),
            revoked: Set(false),
            expires_at: Set(Utc::now()
                + ChronoDuration::seconds(self.config.refresh_token_ttl.as_secs() as i64)),
            created_at: Set(Utc::now()),
        };
        row.insert(&*self.db).await?;

        Ok(token)
    }

    /// Rotates a refresh token: the presented token is revoked and a fresh
    /// pair is issued for its user.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, ServiceError> {
        let stored = self
            .find_refresh_token(presented)
            .await?
            .filter(|row| row.is_usable())
            .ok_or_else(|| ServiceError::Unauthorized("invalid refresh token".to_string()))?;

        let user = User::find_by_id(stored.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("account no longer exists".to_string()))?;

        let role = Profile::find()
            .filter(crate::entities::profile::Column::UserId.eq(user.id))
            .one(&*self.db)
            .await?
            .map(|p| p.role);

        let mut revoke: refresh_token::ActiveModel = stored.into();
        revoke.revoked = Set(true);
        revoke.update(&*self.db).await?;

        self.issue_token_pair(&user, role).await
    }

    /// Revokes the presented refresh token. Unknown tokens are a no-op.
    pub async fn revoke_refresh_token(&self, presented: &str) -> Result<(), ServiceError> {
        if let Some(stored) = self.find_refresh_token(presented).await? {
            let mut revoke: refresh_token::ActiveModel = stored.into();
            revoke.revoked = Set(true);
            revoke.update(&*self.db).await?;
        }
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        presented: &str,
    ) -> Result<Option<refresh_token::Model>, ServiceError> {
        Ok(RefreshToken::find()
            .filter(refresh_token::Column::TokenHash.eq(Self::hash_refresh_token(presented)))
            .one(&*self.db)
            .await?)
    }

    fn hash_refresh_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Validates the bearer token and stores the resulting [`AuthUser`] in the
/// request extensions. Requires an `Arc<AuthService>` extension, injected by
/// a layer in `main`.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .map(str::to_owned);

    let Some(token) = token else {
        return AuthError::MissingAuth.into_response();
    };

    let claims = match auth_service.validate_token(&token) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return AuthError::InvalidToken.into_response();
    };

    request.extensions_mut().insert(AuthUser {
        user_id,
        email: claims.email,
        role: claims.role,
        is_staff: claims.staff,
        token_id: claims.jti,
    });

    next.run(request).await
}

async fn staff_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.is_staff {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to attach auth middleware.
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_staff(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_staff(self) -> Self {
        self.layer(axum::middleware::from_fn(staff_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn test_service() -> AuthService {
        let db = Arc::new(
            sea_orm::Database::connect("sqlite::memory:")
                .await
                .expect("in-memory sqlite"),
        );
        AuthService::new(
            AuthConfig {
                jwt_secret: "unit-test-secret-key-with-enough-length".to_string(),
                issuer: "realty-auth".to_string(),
                audience: "realty-api".to_string(),
                access_token_ttl: Duration::from_secs(3600),
                refresh_token_ttl: Duration::from_secs(86_400),
            },
            db,
        )
    }

    fn test_user() -> UserModel {
        UserModel {
            id: Uuid::new_v4(),
            email: "agent@example.com".to_string(),
            password_hash: String::new(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let service = test_service().await;
        let hash = service.hash_password("s3cure-pass").unwrap();
        assert!(service.verify_password(&hash, "s3cure-pass").unwrap());
        assert!(!service.verify_password(&hash, "wrong-pass").unwrap());
    }

    #[tokio::test]
    async fn access_token_round_trip_preserves_identity() {
        let service = test_service().await;
        let user = test_user();

        let token = service
            .encode_access_token(&user, Some(Role::Agent))
            .unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Some(Role::Agent));
        assert!(!claims.staff);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let service = test_service().await;
        let user = test_user();

        let mut token = service.encode_access_token(&user, None).unwrap();
        token.push('x');
        assert_matches!(service.validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn require_role_rejects_other_roles() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            email: "buyer@example.com".to_string(),
            role: Some(Role::RenterBuyer),
            is_staff: false,
            token_id: Uuid::new_v4().to_string(),
        };

        assert!(user.require_role(Role::RenterBuyer, "make enquiries").is_ok());
        assert_matches!(
            user.require_role(Role::Agent, "post listings"),
            Err(ServiceError::Forbidden(_))
        );
    }
}
