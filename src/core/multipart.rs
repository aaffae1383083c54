use multipart::server::Multipart;
use std::collections::HashMap;
use std::io::{Cursor, Read};

use crate::core::errors::ApiError;

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Decoded multipart/form-data body: text fields plus at most one file.
/// The last file part wins if a client sends several.
#[derive(Debug)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

pub fn is_form_data(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
}

fn boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
}

pub fn parse_form_data(content_type: &str, body: &[u8]) -> Result<FormData, ApiError> {
    let boundary = boundary(content_type)
        .ok_or_else(|| ApiError::BadRequest("Missing multipart boundary".to_string()))?;

    let mut form = FormData {
        fields: HashMap::new(),
        file: None,
    };

    let mut parts = Multipart::with_body(Cursor::new(body), boundary);
    loop {
        let entry = parts
            .read_entry()
            .map_err(|_| ApiError::BadRequest("Malformed multipart body".to_string()))?;
        let Some(mut entry) = entry else { break };

        let name = entry.headers.name.to_string();
        let filename = entry.headers.filename.clone();

        let mut data = Vec::new();
        entry
            .data
            .read_to_end(&mut data)
            .map_err(|_| ApiError::BadRequest("Malformed multipart body".to_string()))?;

        match filename {
            Some(filename) if !filename.is_empty() => {
                form.file = Some(UploadedFile {
                    filename,
                    bytes: data,
                });
            }
            _ => {
                let text = String::from_utf8(data).map_err(|_| {
                    ApiError::BadRequest(format!("Field '{}' is not valid UTF-8", name))
                })?;
                form.fields.insert(name, text);
            }
        }
    }

    Ok(form)
}
