use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, sanitize_text, store, validate_uuid};
use crate::core::query_params::parse_query_params;
use crate::models::models::Comment;
use crate::policy::{can_modify, enforce, Check};
use crate::posts::get_post_record;
use crate::users;

pub fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.is_empty() || text.len() > MAX_COMMENT_LENGTH {
        return Err(ApiError::BadRequest("Invalid comment text".to_string()));
    }
    Ok(())
}

pub fn get_comment_record(store: &Store, comment_id: &str) -> anyhow::Result<Option<Comment>> {
    Ok(store.get_json::<Comment>(&comment_key(comment_id))?)
}

pub fn comment_json(store: &Store, comment: &Comment) -> anyhow::Result<serde_json::Value> {
    let author = match users::get_user(store, &comment.author_id)? {
        Some(u) => Some(users::user_json(store, &u)?),
        None => None,
    };

    Ok(serde_json::json!({
        "id": comment.id,
        "post": comment.post_id,
        "author": author,
        "text": comment.text,
        "created_at": comment.created_at,
        "updated_at": comment.updated_at,
    }))
}

pub fn all_comments(store: &Store) -> anyhow::Result<Vec<Comment>> {
    let ids: Vec<String> = store.get_json(COMMENTS_LIST_KEY)?.unwrap_or_default();

    let mut comments = Vec::new();
    for id in ids.iter() {
        if let Some(c) = store.get_json::<Comment>(&comment_key(id))? {
            comments.push(c);
        }
    }

    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(comments)
}

pub fn comments_for_post(store: &Store, post_id: &str) -> anyhow::Result<Vec<serde_json::Value>> {
    let mut out = Vec::new();
    for comment in all_comments(store)? {
        if comment.post_id == post_id {
            out.push(comment_json(store, &comment)?);
        }
    }
    Ok(out)
}

pub fn insert_comment(
    store: &Store,
    author_id: &str,
    post_id: &str,
    text: &str,
) -> anyhow::Result<Comment> {
    let id = Uuid::new_v4().to_string();
    let comment = Comment {
        id: id.clone(),
        post_id: post_id.to_string(),
        author_id: author_id.to_string(),
        text: sanitize_text(text),
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&comment_key(&id), &comment)?;

    let mut ids: Vec<String> = store.get_json(COMMENTS_LIST_KEY)?.unwrap_or_default();
    ids.insert(0, id);
    store.set_json(COMMENTS_LIST_KEY, &ids)?;

    Ok(comment)
}

pub fn update_comment_record(
    store: &Store,
    comment: &mut Comment,
    text: &str,
) -> anyhow::Result<()> {
    comment.text = sanitize_text(text);
    comment.updated_at = Some(now_iso());
    store.set_json(&comment_key(&comment.id), comment)?;
    Ok(())
}

pub fn remove_comment(store: &Store, comment_id: &str) -> anyhow::Result<()> {
    store.delete(&comment_key(comment_id))?;

    let mut ids: Vec<String> = store.get_json(COMMENTS_LIST_KEY)?.unwrap_or_default();
    ids.retain(|id| id != comment_id);
    store.set_json(COMMENTS_LIST_KEY, &ids)?;

    Ok(())
}

pub fn remove_comments_for_post(store: &Store, post_id: &str) -> anyhow::Result<()> {
    for comment in all_comments(store)? {
        if comment.post_id == post_id {
            remove_comment(store, &comment.id)?;
        }
    }
    Ok(())
}

fn path_comment_id(path: &str) -> Option<String> {
    let id = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if id.is_empty() || !validate_uuid(id) {
        return None;
    }
    Some(id.to_string())
}

// === HTTP handlers ===

/// Public listing, optionally filtered to one post with `?post={id}`.
pub fn list_comments(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let params = parse_query_params(req.uri());

    let mut out = Vec::new();
    match params.get("post") {
        Some(post_id) => {
            out = comments_for_post(&store, post_id)?;
        }
        None => {
            for comment in all_comments(&store)? {
                out.push(comment_json(&store, &comment)?);
            }
        }
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&out)?)
        .build())
}

pub fn create_comment(req: Request) -> anyhow::Result<Response> {
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

    let text = body["text"].as_str().unwrap_or_default();
    if let Err(e) = validate_text(text) {
        return Ok(e.into());
    }

    let comment = insert_comment(&store, &actor.id, post_id, text)?;

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&comment_json(&store, &comment)?)?)
        .build())
}

pub fn edit_comment(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let comment_id = match path_comment_id(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::BadRequest("Comment ID required".to_string()).into()),
    };

    let store = store();
    let mut comment = match get_comment_record(&store, &comment_id)? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    if let Err(e) = enforce(&[Check::new(
        "author_or_admin",
        can_modify(&actor, &comment.author_id),
    )]) {
        return Ok(e.into());
    }

    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let text = body["text"].as_str().unwrap_or_default();
    if let Err(e) = validate_text(text) {
        return Ok(e.into());
    }

    update_comment_record(&store, &mut comment, text)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&comment_json(&store, &comment)?)?)
        .build())
}

pub fn delete_comment(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let comment_id = match path_comment_id(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::BadRequest("Comment ID required".to_string()).into()),
    };

    let store = store();
    let comment = match get_comment_record(&store, &comment_id)? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    if let Err(e) = enforce(&[Check::new(
        "author_or_admin",
        can_modify(&actor, &comment.author_id),
    )]) {
        return Ok(e.into());
    }

    remove_comment(&store, &comment.id)?;

    Ok(Response::builder().status(204).build())
}
