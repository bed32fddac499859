//! Bearer-token authentication.
//!
//! Tokens are minted by the account service; this crate only verifies them
//! and reads the caller's id out of the claims.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::settings;
use crate::error::AppError;
use crate::service::Caller;

pub const TOKEN_ISSUER: &str = "taverna-do-mestre";
/// Lifetime of tokens minted by [`issue_token`].
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
    #[serde(default)]
    pub iss: String,
}

/// Signs a token for `user_id` with the configured secret.
pub fn issue_token(user_id: i64, email: &str, admin: bool) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        user_id,
        email: email.to_owned(),
        admin,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp().max(0) as usize,
        iat: now.timestamp().max(0) as usize,
        iss: TOKEN_ISSUER.to_owned(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings().jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("signing token: {e}")))
}

/// Checks signature and expiry and returns the claims.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings().jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        log::debug!("rejected bearer token: {e}");
        AppError::Unauthenticated
    })?;

    if data.claims.user_id <= 0 {
        return Err(AppError::Unauthenticated);
    }
    Ok(data.claims)
}

/// Extracts and validates `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct JwtAuth {
    pub user_id: i64,
    pub email: String,
    pub admin: bool,
}

impl JwtAuth {
    pub fn caller(&self) -> Caller {
        Caller::new(self.user_id)
    }
}

impl FromRequest for JwtAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
        let res = (|| {
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(AppError::Unauthenticated)?;

            let claims = verify_token(token)?;
            Ok(JwtAuth {
                user_id: claims.user_id,
                email: claims.email,
                admin: claims.admin,
            })
        })();

        ready(res)
    }
}
