//! Staff-only management surface. Every route here is gated by a blanket
//! admin check instead of per-resource ownership: any staff actor may
//! create, read, update, or delete any post, comment, or user.

use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;

use crate::auth::authenticate;
use crate::comments;
use crate::config::{user_key, USERS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{request_base_url, sanitize_text, store, validate_uuid};
use crate::models::models::User;
use crate::policy::{enforce, is_admin, Check};
use crate::posts;
use crate::users;

pub fn dispatch(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if let Err(e) = enforce(&[Check::new("admin", is_admin(&actor))]) {
        return Ok(e.into());
    }

    let path = req.path().to_string();
    let path = if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path
    };
    let method = req.method().to_string();

    match (method.as_str(), path.as_str()) {
        ("GET", "/admin-posts") => list_posts(&req),
        ("POST", "/admin-posts") => create_post(&req, &actor),
        ("GET", p) if p.starts_with("/admin-posts/") => get_post(&req, p),
        ("PUT", p) if p.starts_with("/admin-posts/") => update_post(&req, p),
        ("DELETE", p) if p.starts_with("/admin-posts/") => delete_post(p),

        ("GET", "/admin-comments") => list_comments(),
        ("POST", "/admin-comments") => create_comment(&req, &actor),
        ("GET", p) if p.starts_with("/admin-comments/") => get_comment(p),
        ("PUT", p) if p.starts_with("/admin-comments/") => update_comment(&req, p),
        ("DELETE", p) if p.starts_with("/admin-comments/") => delete_comment(p),

        ("GET", "/admin-users") => list_users(),
        ("GET", p) if p.starts_with("/admin-users/") => get_user(p),
        ("PUT", p) if p.starts_with("/admin-users/") => update_user(&req, p),
        ("DELETE", p) if p.starts_with("/admin-users/") => deactivate_user(p),

        _ => Ok(ApiError::NotFound("No route found".to_string()).into()),
    }
}

fn path_id(path: &str) -> Option<String> {
    let id = path.rsplit('/').next().unwrap_or("");
    if id.is_empty() || !validate_uuid(id) {
        return None;
    }
    Some(id.to_string())
}

fn json_response(status: u16, body: &serde_json::Value) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body)?)
        .build())
}

// === Posts ===

fn list_posts(req: &Request) -> anyhow::Result<Response> {
    let store = store();
    let base_url = request_base_url(req);

    let mut out = Vec::new();
    for post in posts::all_posts(&store)? {
        out.push(posts::post_json(&store, &base_url, &post)?);
    }
    json_response(200, &serde_json::Value::Array(out))
}

fn create_post(req: &Request, actor: &User) -> anyhow::Result<Response> {
    let store = store();
    let input = match posts::parse_post_input(req) {
        Ok(i) => i,
        Err(e) => return Ok(e.into()),
    };
    if let Err(e) = posts::validate_content(&input.content) {
        return Ok(e.into());
    }

    let post = posts::insert_post(&store, &actor.id, &input)?;
    json_response(201, &posts::post_json(&store, &request_base_url(req), &post)?)
}

fn get_post(req: &Request, path: &str) -> anyhow::Result<Response> {
    let Some(id) = path_id(path) else {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    };

    let store = store();
    match posts::get_post_record(&store, &id)? {
        Some(post) => json_response(200, &posts::post_json(&store, &request_base_url(req), &post)?),
        None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
    }
}

fn update_post(req: &Request, path: &str) -> anyhow::Result<Response> {
    let Some(id) = path_id(path) else {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    };

    let store = store();
    let mut post = match posts::get_post_record(&store, &id)? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let input = match posts::parse_post_input(req) {
        Ok(i) => i,
        Err(e) => return Ok(e.into()),
    };
    if let Err(e) = posts::validate_content(&input.content) {
        return Ok(e.into());
    }

    posts::update_post_record(&store, &mut post, input)?;
    json_response(200, &posts::post_json(&store, &request_base_url(req), &post)?)
}

fn delete_post(path: &str) -> anyhow::Result<Response> {
    let Some(id) = path_id(path) else {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    };

    let store = store();
    let post = match posts::get_post_record(&store, &id)? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    posts::remove_post(&store, &post)?;
    Ok(Response::builder().status(204).build())
}

// === Comments ===

fn list_comments() -> anyhow::Result<Response> {
    let store = store();
    let mut out = Vec::new();
    for comment in comments::all_comments(&store)? {
        out.push(comments::comment_json(&store, &comment)?);
    }
    json_response(200, &serde_json::Value::Array(out))
}

fn create_comment(req: &Request, actor: &User) -> anyhow::Result<Response> {
    let store = store();
    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let post_id = body["post"].as_str().unwrap_or_default();
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post id is required".to_string()).into());
    }
    if posts::get_post_record(&store, post_id)?.is_none() {
        return Ok(ApiError::NotFound("Post not found".to_string()).into());
    }

    let text = body["text"].as_str().unwrap_or_default();
    if let Err(e) = comments::validate_text(text) {
        return Ok(e.into());
    }

    let comment = comments::insert_comment(&store, &actor.id, post_id, text)?;
    json_response(201, &comments::comment_json(&store, &comment)?)
}

fn get_comment(path: &str) -> anyhow::Result<Response> {
    let Some(id) = path_id(path) else {
        return Ok(ApiError::BadRequest("Comment ID required".to_string()).into());
    };

    let store = store();
    match comments::get_comment_record(&store, &id)? {
        Some(comment) => json_response(200, &comments::comment_json(&store, &comment)?),
        None => Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    }
}

fn update_comment(req: &Request, path: &str) -> anyhow::Result<Response> {
    let Some(id) = path_id(path) else {
        return Ok(ApiError::BadRequest("Comment ID required".to_string()).into());
    };

    let store = store();
    let mut comment = match comments::get_comment_record(&store, &id)? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let text = body["text"].as_str().unwrap_or_default();
    if let Err(e) = comments::validate_text(text) {
        return Ok(e.into());
    }

    comments::update_comment_record(&store, &mut comment, text)?;
    json_response(200, &comments::comment_json(&store, &comment)?)
}

fn delete_comment(path: &str) -> anyhow::Result<Response> {
    let Some(id) = path_id(path) else {
        return Ok(ApiError::BadRequest("Comment ID required".to_string()).into());
    };

    let store = store();
    if comments::get_comment_record(&store, &id)?.is_none() {
        return Ok(ApiError::NotFound("Comment not found".to_string()).into());
    }

    comments::remove_comment(&store, &id)?;
    Ok(Response::builder().status(204).build())
}

// === Users ===

fn list_users() -> anyhow::Result<Response> {
    let store = store();
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();

    let mut out = Vec::new();
    for id in ids {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            out.push(users::user_json(&store, &u)?);
        }
    }
    json_response(200, &serde_json::Value::Array(out))
}

fn load_user(store: &Store, path: &str) -> anyhow::Result<Result<User, ApiError>> {
    let Some(id) = path_id(path) else {
        return Ok(Err(ApiError::BadRequest("User ID required".to_string())));
    };
    match users::get_user(store, &id)? {
        Some(u) => Ok(Ok(u)),
        None => Ok(Err(ApiError::NotFound("User not found".to_string()))),
    }
}

fn get_user(path: &str) -> anyhow::Result<Response> {
    let store = store();
    match load_user(&store, path)? {
        Ok(user) => json_response(200, &users::user_json(&store, &user)?),
        Err(e) => Ok(e.into()),
    }
}

/// Admin user update: bio, staff flag, and active flag. Username, email,
/// and password are not editable here.
fn update_user(req: &Request, path: &str) -> anyhow::Result<Response> {
    let store = store();
    let mut user = match load_user(&store, path)? {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };

    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    if let Some(bio) = body["bio"].as_str() {
        if let Err(e) = users::validate_bio(bio) {
            return Ok(e.into());
        }
        let sanitized = sanitize_text(bio);
        user.bio = if sanitized.is_empty() { None } else { Some(sanitized) };
    }
    if let Some(is_staff) = body["is_staff"].as_bool() {
        user.is_staff = is_staff;
    }
    if let Some(is_active) = body["is_active"].as_bool() {
        user.is_active = is_active;
    }

    store.set_json(&user_key(&user.id), &user)?;
    json_response(200, &users::user_json(&store, &user)?)
}

/// Soft delete: the account is deactivated, not removed, so authored
/// posts and comments keep a resolvable author.
fn deactivate_user(path: &str) -> anyhow::Result<Response> {
    let store = store();
    let mut user = match load_user(&store, path)? {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };

    user.is_active = false;
    store.set_json(&user_key(&user.id), &user)?;

    Ok(Response::builder().status(204).build())
}
