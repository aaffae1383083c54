use regex::Regex;
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, now_iso, sanitize_text, store};
use crate::follow::{get_followers, get_followings};
use crate::models::models::User;

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Regex should compile")
    })
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(
            "Username must be 3-50 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if !email_regex().is_match(email) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    Ok(())
}

pub fn validate_bio(bio: &str) -> Result<(), ApiError> {
    if bio.chars().count() > MAX_BIO_LENGTH {
        return Err(ApiError::BadRequest(
            "Bio cannot exceed 500 characters.".to_string(),
        ));
    }
    Ok(())
}

pub fn get_user(store: &Store, user_id: &str) -> anyhow::Result<Option<User>> {
    Ok(store.get_json::<User>(&user_key(user_id))?)
}

pub fn find_user_by_username(store: &Store, username: &str) -> anyhow::Result<Option<User>> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in users {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            if u.username == username {
                return Ok(Some(u));
            }
        }
    }
    Ok(None)
}

/// Read shape for a user. The password hash is never included; the
/// follower set is derived by inverting the stored followings sets.
pub fn user_json(store: &Store, user: &User) -> anyhow::Result<serde_json::Value> {
    let following = get_followings(store, &user.id)?;
    let followers = get_followers(store, &user.id)?;

    Ok(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "bio": user.bio.as_deref().unwrap_or(""),
        "following": following,
        "followers": followers,
        "is_staff": user.is_staff,
        "is_active": user.is_active,
    }))
}

pub fn register(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let username = body["username"].as_str().unwrap_or("");
    let email = body["email"].as_str().unwrap_or("");
    let password = body["password"].as_str().unwrap_or("");

    if let Err(e) = validate_username(username)
        .and_then(|_| validate_email(email))
        .and_then(|_| validate_password(password))
    {
        return Ok(e.into());
    }

    let sanitized_username = sanitize_text(username);

    // Username and email are unique across all users
    let existing_users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &existing_users {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            if u.username == sanitized_username {
                return Ok(ApiError::Conflict("Username already exists".to_string()).into());
            }
            if u.email == email {
                return Ok(ApiError::Conflict("Email already registered".to_string()).into());
            }
        }
    }

    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        username: sanitized_username,
        email: email.to_string(),
        password: hash_password(password)?,
        bio: None,
        is_staff: false,
        is_active: true,
        created_at: now_iso(),
    };

    store.set_json(&user_key(&id), &user)?;

    let mut users = existing_users;
    users.push(id);
    store.set_json(USERS_LIST_KEY, &users)?;

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&user_json(&store, &user)?)?)
        .build())
}

pub fn list_users(req: Request) -> anyhow::Result<Response> {
    if authenticate(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let store = store();
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();

    let mut users = Vec::new();
    for id in ids {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            users.push(user_json(&store, &u)?);
        }
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&users)?)
        .build())
}

pub fn get_profile(req: Request) -> anyhow::Result<Response> {
    let actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&user_json(&store, &actor)?)?)
        .build())
}

/// Profile update accepts the bio only. Username, email, and role flags
/// are immutable through this path.
pub fn update_profile(req: Request) -> anyhow::Result<Response> {
    let mut actor = match authenticate(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    if let Some(bio) = body["bio"].as_str() {
        if let Err(e) = validate_bio(bio) {
            return Ok(e.into());
        }
        let sanitized_bio = sanitize_text(bio);
        actor.bio = if sanitized_bio.is_empty() {
            None
        } else {
            Some(sanitized_bio)
        };
    }

    store.set_json(&user_key(&actor.id), &actor)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&user_json(&store, &actor)?)?)
        .build())
}
