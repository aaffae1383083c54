use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config::{token_expiration_hours, token_key, user_key, USERS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, store, verify_password};
use crate::models::models::{TokenData, User};

pub fn login(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let creds: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let username = creds["username"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();

    for id in users {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            if u.username == username && verify_password(password, &u.password) {
                if !u.is_active {
                    return Ok(ApiError::Unauthorized.into());
                }

                let token = Uuid::new_v4().to_string();
                let data = TokenData {
                    user_id: u.id.clone(),
                    created_at: now_iso(),
                };
                store.set_json(&token_key(&token), &data)?;

                let resp = serde_json::json!({
                    "token": token,
                    "user_id": u.id
                });
                return Ok(Response::builder()
                    .status(200)
                    .header("Content-Type", "application/json")
                    .body(serde_json::to_vec(&resp)?)
                    .build());
            }
        }
    }

    Ok(ApiError::Unauthorized.into())
}

pub fn logout(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let auth_header = req
        .header("Authorization")
        .and_then(|h| h.as_str())
        .unwrap_or_default();

    if !auth_header.starts_with("Bearer ") {
        return Ok(ApiError::Unauthorized.into());
    }

    let token = auth_header.strip_prefix("Bearer ").unwrap();
    store.delete(&token_key(token))?;

    let resp = serde_json::json!({
        "message": "Logged out successfully"
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

fn validate_token(req: &Request) -> Option<String> {
    let store = store();
    let auth_header = req.header("Authorization")?.as_str().unwrap_or_default();
    if !auth_header.starts_with("Bearer ") {
        return None;
    }
    let token = auth_header.strip_prefix("Bearer ").unwrap();
    let data = store.get_json::<TokenData>(&token_key(token)).ok()??;

    if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        let now = chrono::Utc::now();
        let age_hours = (now - created.with_timezone(&chrono::Utc)).num_hours();
        if age_hours > token_expiration_hours() {
            return None;
        }
    }

    Some(data.user_id)
}

/// Resolve the acting user from the bearer token. Anonymous, expired,
/// unknown, or deactivated actors all come back as None.
pub fn authenticate(req: &Request) -> Option<User> {
    let user_id = validate_token(req)?;
    let store = store();
    let user = store.get_json::<User>(&user_key(&user_id)).ok()??;
    if !user.is_active {
        return None;
    }
    Some(user)
}
