use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::validate_uuid;
use crate::core::store::{Store, StoreExt};
use crate::models::models::{Post, User};

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loads a user document. Ids that are not UUIDs never resolve.
pub fn load_user(store: &dyn Store, id: &str) -> anyhow::Result<Option<User>> {
    if !validate_uuid(id) {
        return Ok(None);
    }
    store.get_json(&user_key(id))
}

pub fn require_user(store: &dyn Store, id: &str) -> Result<User, ApiError> {
    load_user(store, id)?.ok_or_else(ApiError::user_not_found)
}

pub fn save_user(store: &dyn Store, user: &User) -> anyhow::Result<()> {
    store.set_json(&user_key(&user.id), user)
}

/// Loads every id that still resolves, preserving order.
pub fn load_users(store: &dyn Store, ids: &[String]) -> anyhow::Result<Vec<User>> {
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = load_user(store, id)? {
            users.push(user);
        }
    }
    Ok(users)
}

pub fn all_users(store: &dyn Store) -> anyhow::Result<Vec<User>> {
    let ids = store.members(USERS_LIST_KEY)?;
    load_users(store, &ids)
}

pub fn find_user_by_email(store: &dyn Store, email: &str) -> anyhow::Result<Option<User>> {
    let id: Option<String> = store.get_json(&email_key(&normalize_email(email)))?;
    match id {
        Some(id) => load_user(store, &id),
        None => Ok(None),
    }
}

/// Points the email index at `id` unless another account already holds it.
pub fn claim_email(store: &dyn Store, email: &str, id: &str) -> anyhow::Result<bool> {
    store.set_if_absent(&email_key(&normalize_email(email)), &serde_json::to_vec(id)?)
}

pub fn release_email(store: &dyn Store, email: &str) -> anyhow::Result<()> {
    store.delete(&email_key(&normalize_email(email)))
}

/// Writes a new user and appends it to the users list. The email must
/// already be claimed with [`claim_email`].
pub fn insert_user(store: &dyn Store, user: &User) -> anyhow::Result<()> {
    save_user(store, user)?;
    store.push(USERS_LIST_KEY, &user.id)
}

pub fn load_post(store: &dyn Store, id: &str) -> anyhow::Result<Option<Post>> {
    store.get_json(&post_key(id))
}

pub fn save_post(store: &dyn Store, post: &Post) -> anyhow::Result<()> {
    store.set_json(&post_key(&post.id), post)
}

pub fn load_posts(store: &dyn Store, ids: &[String]) -> anyhow::Result<Vec<Post>> {
    let mut posts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(post) = load_post(store, id)? {
            posts.push(post);
        }
    }
    Ok(posts)
}

#[cfg(test)]
pub(crate) fn seed_user(store: &dyn Store, name: &str) -> String {
    let user = User::new(
        crate::core::helpers::new_id(),
        name.into(),
        format!("{}@example.com", name),
        String::new(),
    );
    assert!(claim_email(store, &user.email, &user.id).unwrap());
    insert_user(store, &user).unwrap();
    user.id
}
