use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::config::{like_key, post_likes_key};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, store};
use crate::core::query_params::parse_query_params;
use crate::models::models::Like;
use crate::posts::get_post_record;
use crate::users;

pub fn like_json(store: &Store, like: &Like) -> anyhow::Result<serde_json::Value> {
    let user = match users::get_user(store, &like.user_id)? {
        Some(u) => Some(users::user_json(store, &u)?),
        None => None,
    };

    Ok(serde_json::json!({
        "id": like.id,
        "post": like.post_id,
        "user": user,
        "created_at": like.created_at,
    }))
}

pub fn likes_for_post(store: &Store, post_id: &str) -> anyhow::Result<Vec<serde_json::Value>> {
    let user_ids: Vec<String> = store.get_json(&post_likes_key(post_id))?.unwrap_or_default();

    let mut out = Vec::new();
    for user_id in &user_ids {
        if let Some(like) = store.get_json::<Like>(&like_key(post_id, user_id))? {
            out.push(like_json(store, &like)?);
        }
    }
    Ok(out)
}

pub fn remove_likes_for_post(store: &Store, post_id: &str) -> anyhow::Result<()> {
    let user_ids: Vec<String> = store.get_json(&post_likes_key(post_id))?.unwrap_or_default();
    for user_id in &user_ids {
        store.delete(&like_key(post_id, user_id))?;
    }
    store.delete(&post_likes_key(post_id))?;
    Ok(())
}

// === HTTP handlers ===

/// Create a like for (post, actor). The composite KV key guarantees at
/// most one record per pair; the existence check is what turns a repeat
/// attempt into an explicit rejection instead of a silent overwrite.
pub fn create_like(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let post_id = body["post"].as_str().unwrap_or_default();
    if post_id.is_empty() {
        return Ok(ApiError::BadRequest("Post id is required".to_string()).into());
    }
    if get_post_record(&store, post_id)?.is_none() {
        return Ok(ApiError::NotFound("Post not found".to_string()).into());
    }

    if store.get_json::<Like>(&like_key(post_id, &actor.id))?.is_some() {
        return Ok(ApiError::BadRequest("You already liked this post.".to_string()).into());
    }

    let like = Like {
        id: Uuid::new_v4().to_string(),
        post_id: post_id.to_string(),
        user_id: actor.id.clone(),
        created_at: now_iso(),
    };
    store.set_json(&like_key(post_id, &actor.id), &like)?;

    let mut user_ids: Vec<String> = store.get_json(&post_likes_key(post_id))?.unwrap_or_default();
    if !user_ids.contains(&actor.id) {
        user_ids.push(actor.id.clone());
        store.set_json(&post_likes_key(post_id), &user_ids)?;
    }

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&like_json(&store, &like)?)?)
        .build())
}

/// Remove the actor's like on the post named by the `post` query
/// parameter. Missing parameter is a 400, missing like a 404.
pub fn remove_like(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let params = parse_query_params(req.uri());
    let post_id = match params.get("post") {
        Some(id) if !id.is_empty() => id.clone(),
        _ => return Ok(ApiError::BadRequest("Post id is required".to_string()).into()),
    };

    if store.get_json::<Like>(&like_key(&post_id, &actor.id))?.is_none() {
        return Ok(ApiError::NotFound("Like not found.".to_string()).into());
    }

    store.delete(&like_key(&post_id, &actor.id))?;

    let mut user_ids: Vec<String> = store.get_json(&post_likes_key(&post_id))?.unwrap_or_default();
    user_ids.retain(|id| id != &actor.id);
    store.set_json(&post_likes_key(&post_id), &user_ids)?;

    Ok(Response::builder().status(204).build())
}
