use std::env;

use anyhow::Context;
use tracing::{info, warn};

// === Limits ===
pub const MAX_POST_LENGTH: usize = 100;
pub const MAX_NAME_LENGTH: usize = 50;
pub const DEFAULT_TOKEN_EXPIRATION_HOURS: i64 = 1;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

// === Storage keys ===
pub const USERS_LIST_KEY: &str = "users_list";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn email_key(email: &str) -> String {
    format!("email:{}", email)
}

// === Runtime configuration ===
#[derive(Clone, Debug)]
pub struct Config {
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub token_expiration_hours: i64,
    pub bind_addr: String,
}

impl Config {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            database_url: None,
            token_expiration_hours: DEFAULT_TOKEN_EXPIRATION_HOURS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("ROOST_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .context("ROOST_JWT_SECRET must be set")?;

        let database_url = env::var("ROOST_DATABASE_URL").ok().filter(|s| !s.is_empty());
        if database_url.is_none() {
            info!("ROOST_DATABASE_URL not set, using the default store");
        }

        Ok(Self {
            jwt_secret,
            database_url,
            token_expiration_hours: token_expiration_hours(),
            bind_addr: env::var("ROOST_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        })
    }

    pub fn token_ttl_secs(&self) -> i64 {
        self.token_expiration_hours * 3600
    }
}

fn token_expiration_hours() -> i64 {
    match env::var("ROOST_TOKEN_EXPIRATION_HOURS") {
        Ok(v) => v.parse::<i64>().ok().filter(|h| *h > 0).unwrap_or_else(|| {
            warn!("Invalid ROOST_TOKEN_EXPIRATION_HOURS value {v:?}, using default");
            DEFAULT_TOKEN_EXPIRATION_HOURS
        }),
        Err(_) => DEFAULT_TOKEN_EXPIRATION_HOURS,
    }
}
