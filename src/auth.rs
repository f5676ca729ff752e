use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::config::Config;
use crate::core::db::{find_user_by_email, require_user};
use crate::core::errors::ApiError;
use crate::core::helpers::{bearer_token, json_response, now, parse_body, verify_password};
use crate::core::store::Store;
use crate::core::AppContext;
use crate::models::models::{PublicUser, TokenClaims, User};

pub fn issue_token(config: &Config, user_id: &str) -> anyhow::Result<String> {
    let iat = now().timestamp();
    let claims = TokenClaims {
        user_id: user_id.to_string(),
        iat,
        exp: iat + config.token_ttl_secs(),
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
}

/// Verifies signature and expiry, yielding the claims of a valid token.
pub fn validate_token(config: &Config, token: &str) -> Result<TokenClaims, ApiError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            warn!("rejected bearer token: {}", e);
            ApiError::Unauthorized
        })
}

pub fn login(store: &dyn Store, config: &Config, email: &str, password: &str) -> Result<(String, User), ApiError> {
    let user = find_user_by_email(store, email)?.ok_or_else(ApiError::user_not_found)?;
    if !verify_password(password, &user.password) {
        return Err(ApiError::Unauthorized);
    }
    let token = issue_token(config, &user.id)?;
    Ok((token, user))
}

// === HTTP Handlers ===

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub fn handle_login(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let creds: LoginRequest = parse_body(req)?;

    let (token, user) = login(ctx.store, ctx.config, &creds.email, &creds.password).inspect_err(|e| {
        warn!("login failed: {}", e);
    })?;
    info!(user = %user.id, "user logged in");

    Ok(json_response(
        200,
        &serde_json::json!({
            "token": token,
            "user": {
                "name": user.name,
                "email": user.email,
                "id": user.id,
            },
        }),
    )?)
}

pub fn handle_me(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let token = bearer_token(req).ok_or(ApiError::Unauthorized)?;
    let claims = validate_token(ctx.config, &token)?;
    let user = require_user(ctx.store, &claims.user_id).map_err(|_| ApiError::Unauthorized)?;
    Ok(json_response(200, &PublicUser::from(&user))?)
}
