/*!
 * # Authentication and Authorization
 *
 * HS256 bearer tokens identify customers and admins. Handlers take an
 * [`AuthUser`] when a caller must be signed in, or a [`MaybeAuthUser`] when
 * guests are allowed too (guest bookings). Admin-only operations call
 * [`AuthUser::require_admin`].
 */

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{config::AppConfig, errors::ServiceError, AppState};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub role: Role,            // Customer or admin
    pub name: Option<String>,  // Display name
    pub email: Option<String>, // Contact email
    pub jti: String,           // Token ID
    pub iat: i64,              // Issued at
    pub exp: i64,              // Expiration time
    pub iss: String,           // Issuer
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to create token: {0}")]
    TokenCreation(String),
    #[error("Admin access required")]
    AdminRequired,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ServiceError::Unauthorized(err.to_string()),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::JwtError(err.to_string())
            }
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            AuthError::AdminRequired => ServiceError::Forbidden(err.to_string()),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl_secs: u64,
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            token_ttl_secs: cfg.jwt_expiration,
        }
    }
}

/// Issues and verifies access tokens.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Signs an access token for a user.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        role: Role,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = i64::try_from(self.config.token_ttl_secs)
            .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            name,
            email,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ChronoDuration::seconds(ttl)).timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Resolves the bearer token in `parts`, if any.
    fn authenticate(&self, parts: &Parts) -> Result<Option<AuthUser>, AuthError> {
        let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidToken)?;

        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        debug!(user_id = %user_id, role = %claims.role, "Authenticated request");

        Ok(Some(AuthUser {
            user_id,
            role: claims.role,
            name: claims.name,
            email: claims.email,
        }))
    }
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::AdminRequired.into())
        }
    }

    /// Admins may act on anything; customers only on what they own.
    pub fn can_access(&self, owner: Option<Uuid>) -> bool {
        self.is_admin() || owner == Some(self.user_id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state
            .auth
            .authenticate(parts)?
            .ok_or_else(|| AuthError::MissingCredentials.into())
    }
}

/// Identity of a caller that may also be a guest. A malformed or expired token
/// is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(state.auth.authenticate(parts)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn service() -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "test_secret_that_is_definitely_long_enough".into(),
            jwt_issuer: "rental-api".into(),
            token_ttl_secs: 3600,
        })
    }

    fn parts_with(header_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = header_value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn issued_tokens_round_trip() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let token = auth
            .issue_token(user_id, Role::Admin, Some("Lily".into()), None)
            .unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "rental-api");
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let other = AuthService::new(AuthConfig {
            jwt_secret: "a_completely_different_secret_value_123".into(),
            jwt_issuer: "rental-api".into(),
            token_ttl_secs: 3600,
        });
        let token = other
            .issue_token(Uuid::new_v4(), Role::Customer, None, None)
            .unwrap();
        assert!(matches!(
            service().validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn missing_header_is_a_guest_and_garbage_is_an_error() {
        let auth = service();
        assert_eq!(auth.authenticate(&parts_with(None)).unwrap(), None);
        assert!(auth.authenticate(&parts_with(Some("Basic abc"))).is_err());
        assert!(auth.authenticate(&parts_with(Some("Bearer nope"))).is_err());

        let token = auth
            .issue_token(Uuid::new_v4(), Role::Customer, None, None)
            .unwrap();
        let user = auth
            .authenticate(&parts_with(Some(&format!("Bearer {}", token))))
            .unwrap()
            .unwrap();
        assert_eq!(user.role, Role::Customer);
    }

    #[test]
    fn customers_only_reach_their_own_records() {
        let me = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
            name: None,
            email: None,
        };
        assert!(me.can_access(Some(me.user_id)));
        assert!(!me.can_access(Some(Uuid::new_v4())));
        assert!(!me.can_access(None));
        assert!(me.require_admin().is_err());

        let admin = AuthUser {
            role: Role::Admin,
            ..me.clone()
        };
        assert!(admin.can_access(None));
        assert!(admin.require_admin().is_ok());
    }
}
