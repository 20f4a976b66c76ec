use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::Role,
    state::AppState,
};

/// Identity of the caller for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Canteen
    }

    pub fn require_staff(&self) -> AppResult<()> {
        if !self.is_staff() {
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }

    pub fn from_token(token: &str, secret: &str) -> AppResult<Self> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            AppError::Unauthenticated
        })?;

        let user_id =
            Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthenticated)?;
        let role = decoded
            .claims
            .role
            .parse::<Role>()
            .map_err(|_| AppError::Unauthenticated)?;

        Ok(Session {
            user_id,
            email: decoded.claims.email,
            role,
        })
    }
}

/// Sign a token the way the identity service does. Used by the seed binary
/// and tests.
pub fn issue_token(session: &Session, secret: &str, ttl: Duration) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: session.user_id.to_string(),
        email: session.email.clone(),
        role: session.role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthenticated)?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthenticated)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthenticated)?
            .trim();

        Session::from_token(token, &state.config.jwt_secret)
    }
}
