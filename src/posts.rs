use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::comments;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, request_base_url, sanitize_text, store, validate_uuid};
use crate::core::multipart::{is_form_data, parse_form_data, UploadedFile};
use crate::likes;
use crate::media;
use crate::models::models::Post;
use crate::policy::{can_modify, enforce, Check};
use crate::users;

/// Write shape for post create/update. Built either from a JSON body or
/// from a multipart form with an optional image file.
pub struct PostInput {
    pub content: String,
    pub image: Option<UploadedFile>,
}

pub fn parse_post_input(req: &Request) -> Result<PostInput, ApiError> {
    let content_type = req
        .header("content-type")
        .and_then(|h| h.as_str())
        .unwrap_or_default();

    if is_form_data(content_type) {
        let form = parse_form_data(content_type, req.body())?;
        Ok(PostInput {
            content: form.fields.get("content").cloned().unwrap_or_default(),
            image: form.file,
        })
    } else {
        let value: serde_json::Value = serde_json::from_slice(req.body())
            .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;
        Ok(PostInput {
            content: value["content"].as_str().unwrap_or_default().to_string(),
            image: None,
        })
    }
}

pub fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.is_empty() || content.len() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest("Invalid content".to_string()));
    }
    Ok(())
}

pub fn get_post_record(store: &Store, post_id: &str) -> anyhow::Result<Option<Post>> {
    Ok(store.get_json::<Post>(&post_key(post_id))?)
}

fn path_post_id(path: &str) -> Option<String> {
    let id = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if id.is_empty() || !validate_uuid(id) {
        return None;
    }
    Some(id.to_string())
}

/// Read shape for a post. `likes_count` and `image_url` are recomputed on
/// every read; the raw media id stays write-only.
pub fn post_json(store: &Store, base_url: &str, post: &Post) -> anyhow::Result<serde_json::Value> {
    let author = match users::get_user(store, &post.author_id)? {
        Some(u) => Some(users::user_json(store, &u)?),
        None => None,
    };

    let comments = comments::comments_for_post(store, &post.id)?;
    let like_list = likes::likes_for_post(store, &post.id)?;
    let likes_count = like_list.len();

    let image_url = post
        .image
        .as_ref()
        .map(|media_id| media::media_url(base_url, media_id));

    Ok(serde_json::json!({
        "id": post.id,
        "author": author,
        "content": post.content,
        "image_url": image_url,
        "created_at": post.created_at,
        "updated_at": post.updated_at,
        "comments": comments,
        "likes": like_list,
        "likes_count": likes_count,
    }))
}

/// All posts, newest first by creation timestamp.
pub fn all_posts(store: &Store) -> anyhow::Result<Vec<Post>> {
    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();

    let mut posts = Vec::new();
    for id in feed.iter() {
        if let Some(p) = store.get_json::<Post>(&post_key(id))? {
            posts.push(p);
        }
    }

    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

/// Persist a new post for `author_id`, storing the attached image first
/// when one was uploaded. Input must already be validated.
pub fn insert_post(store: &Store, author_id: &str, input: &PostInput) -> anyhow::Result<Post> {
    let image = match &input.image {
        Some(file) => Some(media::store_image(store, author_id, &file.filename, &file.bytes)?.id),
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    let post = Post {
        id: id.clone(),
        author_id: author_id.to_string(),
        content: sanitize_text(&input.content),
        image,
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&post_key(&id), &post)?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.insert(0, id);
    store.set_json(FEED_KEY, &feed)?;

    Ok(post)
}

/// Apply a validated update in place. The author is never reassigned; a
/// newly uploaded image replaces (and deletes) the previous one.
pub fn update_post_record(store: &Store, post: &mut Post, input: PostInput) -> anyhow::Result<()> {
    post.content = sanitize_text(&input.content);

    if let Some(file) = &input.image {
        if let Some(old) = post.image.take() {
            media::delete_media(store, &old)?;
        }
        post.image = Some(media::store_image(store, &post.author_id, &file.filename, &file.bytes)?.id);
    }

    post.updated_at = Some(now_iso());
    store.set_json(&post_key(&post.id), post)?;

    Ok(())
}

/// Delete a post together with its comments, likes, and attached image.
pub fn remove_post(store: &Store, post: &Post) -> anyhow::Result<()> {
    comments::remove_comments_for_post(store, &post.id)?;
    likes::remove_likes_for_post(store, &post.id)?;

    if let Some(media_id) = &post.image {
        media::delete_media(store, media_id)?;
    }

    store.delete(&post_key(&post.id))?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.retain(|id| id != &post.id);
    store.set_json(FEED_KEY, &feed)?;

    Ok(())
}

// === HTTP handlers ===

pub fn create_post(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let input = match parse_post_input(&req) {
        Ok(i) => i,
        Err(e) => return Ok(e.into()),
    };
    if let Err(e) = validate_content(&input.content) {
        return Ok(e.into());
    }

    let post = insert_post(&store, &actor.id, &input)?;

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&post_json(
            &store,
            &request_base_url(&req),
            &post,
        )?)?)
        .build())
}

/// Public listing, newest first. No authentication required for reads.
pub fn list_posts(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let base_url = request_base_url(&req);

    let mut out = Vec::new();
    for post in all_posts(&store)? {
        out.push(post_json(&store, &base_url, &post)?);
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&out)?)
        .build())
}

/// The full listing filtered to the acting user's own posts.
pub fn my_posts(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let base_url = request_base_url(&req);

    let mut out = Vec::new();
    for post in all_posts(&store)? {
        if post.author_id == actor.id {
            out.push(post_json(&store, &base_url, &post)?);
        }
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&out)?)
        .build())
}

pub fn get_post(req: Request) -> anyhow::Result<Response> {
    let post_id = match path_post_id(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::BadRequest("Post ID required".to_string()).into()),
    };

    let store = store();
    match get_post_record(&store, &post_id)? {
        Some(post) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&post_json(
                &store,
                &request_base_url(&req),
                &post,
            )?)?)
            .build()),
        None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
    }
}

pub fn edit_post(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = match path_post_id(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::BadRequest("Post ID required".to_string()).into()),
    };

    let store = store();
    let mut post = match get_post_record(&store, &post_id)? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    if let Err(e) = enforce(&[Check::new(
        "author_or_admin",
        can_modify(&actor, &post.author_id),
    )]) {
        return Ok(e.into());
    }

    let input = match parse_post_input(&req) {
        Ok(i) => i,
        Err(e) => return Ok(e.into()),
    };
    if let Err(e) = validate_content(&input.content) {
        return Ok(e.into());
    }

    update_post_record(&store, &mut post, input)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&post_json(
            &store,
            &request_base_url(&req),
            &post,
        )?)?)
        .build())
}

pub fn delete_post(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post_id = match path_post_id(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::BadRequest("Post ID required".to_string()).into()),
    };

    let store = store();
    let post = match get_post_record(&store, &post_id)? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    if let Err(e) = enforce(&[Check::new(
        "author_or_admin",
        can_modify(&actor, &post.author_id),
    )]) {
        return Ok(e.into());
    }

    remove_post(&store, &post)?;

    Ok(Response::builder().status(204).build())
}
