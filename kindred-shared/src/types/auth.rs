use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by the access token the auth service issues.
///
/// The engine never mints tokens; it validates them and trusts `sub` as the
/// acting user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }
}

/// The resolved acting user, produced by the bearer-token extractor.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub token_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            token_id: claims.jti,
        }
    }
}
