use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::config::*;
use crate::core::db::{load_posts, load_users, require_user, save_post, save_user};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, now, parse_body};
use crate::core::store::Store;
use crate::core::AppContext;
use crate::models::models::{Post, PostWithAuthor, User};

pub fn validate_content(content: &str) -> Result<(), ApiError> {
    let length = content.chars().count();
    if content.is_empty() || length > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest("Invalid post data".to_string()));
    }
    Ok(())
}

/// Stores a new post and appends it to its owner's post list.
pub fn create_post(store: &dyn Store, user_id: &str, content: &str) -> Result<(Post, User), ApiError> {
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("Invalid post data".to_string()));
    }
    validate_content(content)?;

    let mut user = require_user(store, user_id)?;

    let post = Post {
        id: new_id(),
        user: user.id.clone(),
        content: content.to_string(),
        created_at: now(),
    };
    save_post(store, &post)?;

    user.posts_list.push(post.id.clone());
    user.sync_counts();
    save_user(store, &user)?;

    Ok((post, user))
}

/// Posts of every followed user, newest first.
pub fn get_feed(store: &dyn Store, user_id: &str) -> Result<Vec<PostWithAuthor>, ApiError> {
    let user = require_user(store, user_id)?;
    let followings = load_users(store, &user.following_list)?;

    let mut feed = Vec::new();
    for author in &followings {
        for post in load_posts(store, &author.posts_list)? {
            // postsList is denormalized; trust the owner field on the post itself
            if post.user == author.id {
                feed.push(PostWithAuthor::new(post, author));
            }
        }
    }

    feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(feed)
}

pub fn get_user_posts(store: &dyn Store, user_id: &str) -> Result<Vec<PostWithAuthor>, ApiError> {
    let user = require_user(store, user_id)?;
    Ok(load_posts(store, &user.posts_list)?
        .into_iter()
        .map(|post| PostWithAuthor::new(post, &user))
        .collect())
}

// === HTTP Handlers ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    content: String,
}

pub fn handle_create_post(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let body: CreatePostRequest = parse_body(req)?;

    let (post, user) = create_post(ctx.store, &body.user_id, &body.content).inspect_err(|e| {
        warn!(user = %body.user_id, "post rejected: {}", e);
    })?;
    info!(user = %user.id, post = %post.id, "post created");

    Ok(json_response(
        201,
        &serde_json::json!({
            "message": "Post created successfully",
            "post": post,
            "user": {
                "id": user.id,
                "name": user.name,
                "postsCount": user.posts_count,
            },
        }),
    )?)
}

pub fn handle_feed(ctx: &AppContext, user_id: &str) -> Result<Response, ApiError> {
    let feed = get_feed(ctx.store, user_id)?;
    Ok(json_response(200, &feed)?)
}

pub fn handle_user_posts(ctx: &AppContext, user_id: &str) -> Result<Response, ApiError> {
    let posts = get_user_posts(ctx.store, user_id)?;
    Ok(json_response(200, &posts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{load_user, seed_user};
    use crate::core::store::MemoryStore;
    use crate::follow::toggle_follow;

    #[test]
    fn test_content_length_boundary() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice");

        let ok = "a".repeat(MAX_POST_LENGTH);
        assert!(create_post(&store, &alice, &ok).is_ok());

        let too_long = "a".repeat(MAX_POST_LENGTH + 1);
        assert!(matches!(
            create_post(&store, &alice, &too_long),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(create_post(&store, &alice, ""), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_whitespace_content_is_accepted() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice");

        let (post, _) = create_post(&store, &alice, "   ").unwrap();
        assert_eq!(post.content, "   ");
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice");
        assert!(create_post(&store, &alice, &"é".repeat(MAX_POST_LENGTH)).is_ok());
    }

    #[test]
    fn test_create_post_updates_owner() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice");

        let (post, user) = create_post(&store, &alice, "first").unwrap();
        assert_eq!(user.posts_count, 1);
        assert_eq!(post.user, alice);

        let stored = load_user(&store, &alice).unwrap().unwrap();
        assert_eq!(stored.posts_list, vec![post.id]);
        assert_eq!(stored.posts_count, 1);
    }

    #[test]
    fn test_create_post_for_unknown_user() {
        let store = MemoryStore::new();
        assert!(matches!(
            create_post(&store, &new_id(), "hi"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_feed_only_followed_and_newest_first() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let carol = seed_user(&store, "carol");
        let dave = seed_user(&store, "dave");

        toggle_follow(&store, &bob, &alice).unwrap();
        toggle_follow(&store, &carol, &alice).unwrap();

        create_post(&store, &bob, "bob one").unwrap();
        create_post(&store, &dave, "dave one").unwrap();
        create_post(&store, &carol, "carol one").unwrap();
        create_post(&store, &bob, "bob two").unwrap();

        let feed = get_feed(&store, &alice).unwrap();
        assert_eq!(feed.len(), 3);
        assert!(feed.iter().all(|p| p.user.id == bob || p.user.id == carol));
        assert!(feed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(feed[0].content, "bob two");
    }

    #[test]
    fn test_feed_empty_without_followings() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        create_post(&store, &bob, "hello").unwrap();

        assert!(get_feed(&store, &alice).unwrap().is_empty());
        assert!(matches!(get_feed(&store, &new_id()), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_user_posts_attach_author() {
        let store = MemoryStore::new();
        let bob = seed_user(&store, "bob");
        create_post(&store, &bob, "one").unwrap();
        create_post(&store, &bob, "two").unwrap();

        let posts = get_user_posts(&store, &bob).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].content, "one");
        assert_eq!(posts[1].user.name, "bob");
    }
}
