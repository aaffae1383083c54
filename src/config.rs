// Validation limits
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 2000;

// KV layout
pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";
pub const COMMENTS_LIST_KEY: &str = "comments_list";

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn post_key(post_id: &str) -> String {
    format!("post:{}", post_id)
}

pub fn comment_key(comment_id: &str) -> String {
    format!("comment:{}", comment_id)
}

/// The composite key is what makes a (post, user) like unique: a second
/// create for the same pair can only land on the same key, never produce
/// a second record.
pub fn like_key(post_id: &str, user_id: &str) -> String {
    format!("like:{}:{}", post_id, user_id)
}

pub fn post_likes_key(post_id: &str) -> String {
    format!("post_likes:{}", post_id)
}

pub fn followings_key(user_id: &str) -> String {
    format!("followings:{}", user_id)
}

pub fn media_key(media_id: &str) -> String {
    format!("media:{}", media_id)
}

pub fn media_blob_key(media_id: &str) -> String {
    format!("mediablob:{}", media_id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

// Environment-derived settings

pub fn token_expiration_hours() -> i64 {
    std::env::var("RIPPLE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn admin_username() -> String {
    std::env::var("RIPPLE_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string())
}

pub fn admin_email() -> String {
    std::env::var("RIPPLE_ADMIN_EMAIL").unwrap_or_else(|_| "admin@ripple.local".to_string())
}

pub fn admin_password() -> String {
    std::env::var("RIPPLE_ADMIN_PASSWORD").unwrap_or_else(|_| "admin-password".to_string())
}

pub fn listen_addr() -> String {
    std::env::var("RIPPLE_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string())
}
