use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2 PHC hash, never serialized into API responses.
    pub password: String,
    pub bio: Option<String>,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    /// Media id of the attached image. Write-only: responses carry a
    /// derived absolute `image_url` instead.
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Like {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Media {
    pub id: String,
    pub filename: String,
    pub owner_id: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}
