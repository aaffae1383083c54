use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;

use crate::auth::authenticate;
use crate::config::{followings_key, USERS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::store;
use crate::users::find_user_by_username;

/// Record that `follower_id` follows `following_id`. Repeat follows are
/// idempotent: the relation is a set, not a toggle.
pub fn follow_user(store: &Store, follower_id: &str, following_id: &str) -> anyhow::Result<()> {
    let key = followings_key(follower_id);
    let mut followings: Vec<String> = store.get_json(&key)?.unwrap_or_default();

    if !followings.contains(&following_id.to_string()) {
        followings.push(following_id.to_string());
        store.set_json(&key, &followings)?;
    }

    Ok(())
}

pub fn unfollow_user(store: &Store, follower_id: &str, following_id: &str) -> anyhow::Result<()> {
    let key = followings_key(follower_id);
    let mut followings: Vec<String> = store.get_json(&key)?.unwrap_or_default();

    followings.retain(|id| id != following_id);
    store.set_json(&key, &followings)?;

    Ok(())
}

pub fn get_followings(store: &Store, user_id: &str) -> anyhow::Result<Vec<String>> {
    Ok(store
        .get_json(&followings_key(user_id))?
        .unwrap_or_default())
}

/// Followers are the inverse relation, derived by scanning every user's
/// followings set. Never stored.
pub fn get_followers(store: &Store, user_id: &str) -> anyhow::Result<Vec<String>> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut followers = Vec::new();

    for id in users {
        if let Ok(Some(followings)) = store.get_json::<Vec<String>>(&followings_key(&id)) {
            if followings.contains(&user_id.to_string()) {
                followers.push(id);
            }
        }
    }

    Ok(followers)
}

fn target_username(path: &str, prefix: &str) -> String {
    path.trim_end_matches('/')
        .trim_start_matches(prefix)
        .to_string()
}

pub fn handle_follow(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let username = target_username(req.path(), "/accounts/follow/");
    if username.is_empty() {
        return Ok(ApiError::BadRequest("Username is required".to_string()).into());
    }

    let target = match find_user_by_username(&store, &username)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    if target.id == actor.id {
        return Ok(ApiError::BadRequest("You cannot follow yourself".to_string()).into());
    }

    follow_user(&store, &actor.id, &target.id)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({"status": "followed"}))?)
        .build())
}

pub fn handle_unfollow(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let username = target_username(req.path(), "/accounts/unfollow/");
    if username.is_empty() {
        return Ok(ApiError::BadRequest("Username is required".to_string()).into());
    }

    let target = match find_user_by_username(&store, &username)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    unfollow_user(&store, &actor.id, &target.id)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({"status": "unfollowed"}))?)
        .build())
}
