use mime_guess::from_path;
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::config::{media_blob_key, media_key};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, store, validate_uuid};
use crate::models::models::Media;

/// Absolute public URL for an uploaded image, derived from the current
/// request's base URL.
pub fn media_url(base_url: &str, media_id: &str) -> String {
    format!("{}/media/{}", base_url, media_id)
}

pub fn store_image(
    store: &Store,
    owner_id: &str,
    filename: &str,
    bytes: &[u8],
) -> anyhow::Result<Media> {
    let id = Uuid::new_v4().to_string();
    let media = Media {
        id: id.clone(),
        filename: filename.to_string(),
        owner_id: owner_id.to_string(),
        created_at: now_iso(),
    };

    store.set(&media_blob_key(&id), bytes)?;
    store.set_json(&media_key(&id), &media)?;

    Ok(media)
}

pub fn delete_media(store: &Store, media_id: &str) -> anyhow::Result<()> {
    store.delete(&media_blob_key(media_id))?;
    store.delete(&media_key(media_id))?;
    Ok(())
}

pub fn serve_media(req: Request) -> anyhow::Result<Response> {
    let media_id = req
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    if media_id.is_empty() || !validate_uuid(media_id) {
        return Ok(ApiError::BadRequest("Media ID required".to_string()).into());
    }

    let store = store();
    let meta = match store.get_json::<Media>(&media_key(media_id))? {
        Some(m) => m,
        None => return Ok(ApiError::NotFound("Media not found".to_string()).into()),
    };
    let bytes = match store.get(&media_blob_key(media_id))? {
        Some(b) => b,
        None => return Ok(ApiError::NotFound("Media not found".to_string()).into()),
    };

    let mime = from_path(&meta.filename).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .body(bytes)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_is_absolute() {
        assert_eq!(
            media_url("http://localhost:3000", "abc"),
            "http://localhost:3000/media/abc"
        );
    }
}
