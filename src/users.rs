use std::sync::OnceLock;

use ammonia::Builder;
use regex::Regex;
use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::config::*;
use crate::core::db::{
    all_users, claim_email, insert_user, load_posts, load_users, normalize_email, release_email, require_user,
};
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, json_response, new_id, parse_body};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::store::Store;
use crate::core::AppContext;
use crate::models::models::{ContactSummary, FollowerSummary, User, UserDetail, UserListing, UserStatus};

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Regex should compile")
    })
}

fn sanitize_text(text: &str) -> String {
    // Plain text only, every tag is stripped
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

pub fn register(store: &dyn Store, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
    let name = sanitize_text(name.trim());
    let email = normalize_email(email);

    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest(format!("Name must be at most {} characters", MAX_NAME_LENGTH)));
    }
    if !email_regex().is_match(&email) {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }

    let id = new_id();
    if !claim_email(store, &email, &id)? {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let created = hash_password(password).and_then(|hash| {
        let user = User::new(id, name, email.clone(), hash);
        insert_user(store, &user)?;
        Ok(user)
    });
    match created {
        Ok(user) => Ok(user),
        Err(e) => {
            if let Err(release) = release_email(store, &email) {
                warn!("Failed to release email claim: {}", release);
            }
            Err(e.into())
        }
    }
}

pub fn list_users(store: &dyn Store) -> Result<Vec<UserListing>, ApiError> {
    Ok(all_users(store)?
        .into_iter()
        .map(|user| UserListing {
            id: user.id,
            name: user.name,
            following_count: user.following_count,
            followers_list: user.followers_list,
        })
        .collect())
}

/// Every user but the caller, flagged with whether the caller follows them.
pub fn user_status(store: &dyn Store, caller_id: &str) -> Result<Vec<UserStatus>, ApiError> {
    Ok(all_users(store)?
        .iter()
        .filter(|user| user.id != caller_id)
        .map(|user| UserStatus::for_caller(user, caller_id))
        .collect())
}

/// Like [`user_status`], restricted to users the caller follows.
pub fn user_follows(store: &dyn Store, caller_id: &str) -> Result<Vec<UserStatus>, ApiError> {
    let caller = require_user(store, caller_id)?;
    Ok(all_users(store)?
        .iter()
        .filter(|user| user.id != caller.id && caller.following_list.contains(&user.id))
        .map(|user| UserStatus::for_caller(user, &caller.id))
        .collect())
}

pub fn get_user_detail(store: &dyn Store, user_id: &str) -> Result<UserDetail, ApiError> {
    let user = require_user(store, user_id)?;

    let followers = load_users(store, &user.followers_list)?
        .into_iter()
        .map(|f| FollowerSummary {
            id: f.id,
            name: f.name,
            email: f.email,
            following_count: f.following_count,
            following_list: Some(f.following_list),
        })
        .collect();
    let followings = load_users(store, &user.following_list)?
        .into_iter()
        .map(|f| FollowerSummary {
            id: f.id,
            name: f.name,
            email: f.email,
            following_count: f.following_count,
            following_list: None,
        })
        .collect();
    let posts = load_posts(store, &user.posts_list)?;

    Ok(UserDetail {
        id: user.id,
        name: user.name,
        email: user.email,
        followers_count: user.followers_count,
        following_count: user.following_count,
        posts_count: user.posts_count,
        followers_list: followers,
        following_list: followings,
        posts_list: posts,
    })
}

pub fn get_followers(store: &dyn Store, user_id: &str) -> Result<Vec<ContactSummary>, ApiError> {
    let user = require_user(store, user_id)?;
    Ok(load_users(store, &user.followers_list)?
        .into_iter()
        .map(|f| ContactSummary {
            id: f.id,
            name: f.name,
            email: f.email,
        })
        .collect())
}

// === HTTP Handlers ===

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub fn handle_register(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let body: RegisterRequest = parse_body(req)?;

    let user = register(ctx.store, &body.name, &body.email, &body.password).inspect_err(|e| {
        warn!("registration rejected: {}", e);
    })?;
    info!(user = %user.id, "user registered");

    Ok(json_response(
        201,
        &serde_json::json!({ "message": "User registered successfully" }),
    )?)
}

pub fn handle_list_users(ctx: &AppContext) -> Result<Response, ApiError> {
    Ok(json_response(200, &list_users(ctx.store)?)?)
}

fn caller_from_query(req: &Request) -> Result<String, ApiError> {
    let params = parse_query_params(req.uri());
    get_string(&params, "q").ok_or_else(|| ApiError::BadRequest("Query parameter q is required".to_string()))
}

pub fn handle_user_status(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let caller_id = caller_from_query(req)?;
    Ok(json_response(200, &user_status(ctx.store, &caller_id)?)?)
}

pub fn handle_user_follows(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let caller_id = caller_from_query(req)?;
    Ok(json_response(200, &user_follows(ctx.store, &caller_id)?)?)
}

pub fn handle_user_detail(ctx: &AppContext, user_id: &str) -> Result<Response, ApiError> {
    Ok(json_response(200, &get_user_detail(ctx.store, user_id)?)?)
}

pub fn handle_followers(ctx: &AppContext, user_id: &str) -> Result<Response, ApiError> {
    Ok(json_response(200, &get_followers(ctx.store, user_id)?)?)
}
