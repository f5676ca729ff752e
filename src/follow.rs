use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::core::db::{require_user, save_user};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, parse_body};
use crate::core::store::Store;
use crate::core::AppContext;
use crate::models::models::{PublicUser, User};

pub enum FollowOutcome {
    /// Carries the target after the edge was added.
    Followed(User),
    Unfollowed,
}

/// Flips the follow edge from `acting_id` to `target_id`.
///
/// Both documents are written one after the other with no transaction, so a
/// concurrent toggle on the same pair may lose an update, and a failure on the
/// second write leaves the pair out of sync.
pub fn toggle_follow(
    store: &dyn Store,
    target_id: &str,
    acting_id: &str,
) -> Result<FollowOutcome, ApiError> {
    let mut target = require_user(store, target_id)?;
    let mut acting = require_user(store, acting_id)?;

    if target.id == acting.id {
        return Err(ApiError::BadRequest("Users cannot follow themselves".to_string()));
    }

    let already_following = target.followers_list.iter().any(|id| id == &acting.id);

    if !already_following {
        target.followers_list.push(acting.id.clone());
        acting.following_list.push(target.id.clone());
    } else {
        target.followers_list.retain(|id| id != &acting.id);
        acting.following_list.retain(|id| id != &target.id);
    }
    target.sync_counts();
    acting.sync_counts();

    save_user(store, &target)?;
    save_user(store, &acting)?;

    if already_following {
        Ok(FollowOutcome::Unfollowed)
    } else {
        Ok(FollowOutcome::Followed(target))
    }
}

// === HTTP Handlers ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FollowRequest {
    #[serde(default)]
    user_id: String,
}

pub fn handle_follow(ctx: &AppContext, req: &Request, target_id: &str) -> Result<Response, ApiError> {
    let body: FollowRequest = parse_body(req)?;
    if body.user_id.is_empty() {
        warn!("follow request without userId");
        return Err(ApiError::BadRequest("userId is required".to_string()));
    }

    match toggle_follow(ctx.store, target_id, &body.user_id)? {
        FollowOutcome::Followed(target) => {
            info!(follower = %body.user_id, followed = %target.id, "user followed");
            Ok(json_response(
                200,
                &serde_json::json!({
                    "message": "User followed successfully",
                    "followedUser": PublicUser::from(&target),
                }),
            )?)
        }
        FollowOutcome::Unfollowed => {
            info!(follower = %body.user_id, unfollowed = %target_id, "user unfollowed");
            Ok(json_response(
                200,
                &serde_json::json!({ "message": "User unfollowed successfully" }),
            )?)
        }
    }
}
