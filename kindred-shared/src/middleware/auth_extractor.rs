use std::sync::OnceLock;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

static DECODING_KEY: OnceLock<DecodingKey> = OnceLock::new();

fn decoding_key() -> &'static DecodingKey {
    DECODING_KEY.get_or_init(|| {
        let secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "development-secret-change-in-production".into());
        DecodingKey::from_secret(secret.as_bytes())
    })
}

fn unauthorized(message: &str) -> AppError {
    AppError::new(ErrorCode::Unauthorized, message)
}

/// Decode and validate a bearer token issued by the auth service. The engine
/// trusts `sub` as the acting user id.
pub fn decode_token(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => unauthorized("token has expired"),
            _ => unauthorized("invalid token"),
        })
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("authorization header must use the Bearer scheme"))?;

        let claims = decode_token(token)?;
        if claims.is_expired() {
            return Err(unauthorized("token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}
