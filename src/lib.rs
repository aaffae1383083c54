use spin_sdk::http::{Request, Response};

pub mod config;
pub mod models;
pub mod core;
pub mod policy;
pub mod auth;
pub mod users;
pub mod follow;
pub mod posts;
pub mod comments;
pub mod likes;
pub mod media;
pub mod admin;
pub mod static_server;

use crate::core::errors::ApiError;
use crate::core::helpers::store;

/// Route table shared by the Spin component and the native adapter binary.
///
/// Paths are matched with or without a trailing slash so that both
/// `/posts/` and `/posts` reach the same handler.
pub fn route(req: Request) -> anyhow::Result<Response> {
    let _ = crate::core::db::seed_admin(&store());

    let path = req.path().to_string();
    let path = if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path
    };
    let method = req.method().to_string();

    match (method.as_str(), path.as_str()) {
        // Accounts
        ("POST", "/accounts/register") => users::register(req),
        ("POST", "/login") => auth::login(req),
        ("POST", "/logout") => auth::logout(req),
        ("GET", "/accounts") => users::list_users(req),
        ("GET", "/accounts/profile") => users::get_profile(req),
        ("PUT", "/accounts/profile") | ("PATCH", "/accounts/profile") => {
            users::update_profile(req)
        }
        ("POST", p) if p.starts_with("/accounts/follow/") => follow::handle_follow(req),
        ("POST", p) if p.starts_with("/accounts/unfollow/") => follow::handle_unfollow(req),

        // Posts
        ("GET", "/posts") => posts::list_posts(req),
        ("POST", "/posts") => posts::create_post(req),
        ("GET", "/posts/my-posts") => posts::my_posts(req),
        ("GET", p) if p.starts_with("/posts/") => posts::get_post(req),
        ("PUT", p) if p.starts_with("/posts/") => posts::edit_post(req),
        ("DELETE", p) if p.starts_with("/posts/") => posts::delete_post(req),

        // Comments
        ("GET", "/comments") => comments::list_comments(req),
        ("POST", "/comments") => comments::create_comment(req),
        ("PUT", p) if p.starts_with("/comments/") => comments::edit_comment(req),
        ("DELETE", p) if p.starts_with("/comments/") => comments::delete_comment(req),

        // Likes
        ("POST", "/likes") => likes::create_like(req),
        ("DELETE", "/likes/remove") => likes::remove_like(req),

        // Uploaded images
        ("GET", p) if p.starts_with("/media/") => media::serve_media(req),

        // Staff-only management surface
        (_, p) if p.starts_with("/admin-") => admin::dispatch(req),

        ("GET", "/") | ("GET", "/index.html") => static_server::serve_static(&path),

        _ => Ok(ApiError::NotFound("No route found".to_string()).into()),
    }
}

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request};
    use spin_sdk::http_component;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        crate::route(req)
    }
}
