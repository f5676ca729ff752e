use spin_sdk::http::{Method, Request, Response};
use tracing::{debug, error};

use crate::core::errors::ApiError;
use crate::core::helpers::text_response;
use crate::core::AppContext;
use crate::{auth, follow, posts, users};

fn method_name(method: &Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Post => "POST",
        Method::Put => "PUT",
        Method::Delete => "DELETE",
        Method::Patch => "PATCH",
        Method::Head => "HEAD",
        Method::Options => "OPTIONS",
        _ => "OTHER",
    }
}

/// Dispatches a request to its handler and turns every failure into a JSON
/// error response. Shared by the Spin component and the native server.
pub fn route(ctx: &AppContext, req: Request) -> Response {
    let method = method_name(req.method());
    let path = req.path().to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    debug!(method, path = %path, "dispatching request");

    let result = match (method, segments.as_slice()) {
        ("GET", []) => Ok(text_response(200, "Server is running")),
        ("POST", ["register"]) => users::handle_register(ctx, &req),
        ("POST", ["login"]) => auth::handle_login(ctx, &req),
        ("GET", ["me"]) => auth::handle_me(ctx, &req),
        ("POST", ["follow", target_id]) => follow::handle_follow(ctx, &req, target_id),
        ("GET", ["users"]) => users::handle_list_users(ctx),
        ("GET", ["userStatus"]) => users::handle_user_status(ctx, &req),
        ("GET", ["userFollows"]) => users::handle_user_follows(ctx, &req),
        ("GET", ["user", user_id]) => users::handle_user_detail(ctx, user_id),
        ("GET", ["user", user_id, "posts"]) => posts::handle_user_posts(ctx, user_id),
        ("GET", ["user", user_id, "feed"]) => posts::handle_feed(ctx, user_id),
        ("GET", ["user", user_id, "followers"]) => users::handle_followers(ctx, user_id),
        ("POST", ["posts"]) => posts::handle_create_post(ctx, &req),
        _ => Err(ApiError::NotFound("No route found".to_string())),
    };

    result.unwrap_or_else(|err| {
        if let ApiError::InternalError(msg) = &err {
            error!(method, path = %path, "request failed: {}", msg);
        }
        err.into()
    })
}
