use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use url::form_urlencoded;

use crate::helper::file_encoding_helpers::{UploadedFile, MB};

/// Hard ceiling on any single multipart part. Per-field limits are enforced
/// later by the file rules, with friendlier messages.
pub const MAX_PART_BYTES: u64 = 8 * MB;

/// Parses URL-encoded form data from bytes, handling potential UTF-8 errors gracefully.
pub fn parse_form(form_bytes: &web::Bytes) -> Result<HashMap<String, String>, HttpResponse> {
    let body = match String::from_utf8(form_bytes.to_vec()) {
        Ok(s) => s,
        Err(_) => return Err(HttpResponse::BadRequest().body("Invalid UTF-8 in request body.")),
    };
    Ok(form_urlencoded::parse(body.as_bytes()).into_owned().collect())
}

#[derive(Debug, Error)]
pub enum FormReadError {
    #[error("Upload could not be read: {0}")]
    Multipart(#[from] actix_multipart::MultipartError),
    #[error("The '{0}' part is too large.")]
    TooLarge(String),
    #[error("The 'data' part must be a JSON object.")]
    InvalidData,
}

/// A multipart submission: a JSON `data` part with the field values plus
/// any number of file parts keyed by field name.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub data: Map<String, Value>,
    pub files: HashMap<String, UploadedFile>,
}

pub async fn read_multipart(mut payload: Multipart) -> Result<MultipartForm, FormReadError> {
    let mut form = MultipartForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let field_name = field.content_disposition().get_name().unwrap_or_default().to_string();
        let file_name = field.content_disposition().get_filename().map(str::to_string);
        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if (bytes.len() + data.len()) as u64 > MAX_PART_BYTES {
                return Err(FormReadError::TooLarge(field_name));
            }
            bytes.extend_from_slice(&data);
        }

        if field_name == "data" {
            form.data = match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => map,
                _ => return Err(FormReadError::InvalidData),
            };
            continue;
        }

        // A file input left empty still sends a part with no filename.
        if let Some(file_name) = file_name.filter(|_| !bytes.is_empty()) {
            form.files.insert(
                field_name,
                UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                },
            );
        }
    }
    Ok(form)
}
