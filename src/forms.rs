//! Multipart form intake for pages that take file inputs.

use std::collections::HashMap;

use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use thiserror::Error;
use tracing::{debug, error};

use crate::error::ValidationError;
use crate::models::Upload;

pub const IMAGE_SIZE_LIMIT: usize = 5 * 1024 * 1024;
pub const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];
const FIELD_SIZE_LIMIT: usize = 512 * 1024;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("The form could not be read. Please try again.")]
    Malformed(String),
    #[error("Files must be smaller than {} MB", .0 / (1024 * 1024))]
    TooLarge(usize),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Text fields and files of one multipart submission.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl MultipartForm {
    pub async fn read(mut payload: Multipart) -> Result<Self, FormError> {
        let mut form = MultipartForm::default();
        while let Some(mut field) = payload.try_next().await.map_err(|e| {
            error!("multipart error: {e}");
            FormError::Malformed(e.to_string())
        })? {
            let disposition = field.content_disposition();
            let Some(name) = disposition.get_name().map(str::to_string) else { continue };
            let file_name = disposition.get_filename().map(str::to_string);
            let limit = if file_name.is_some() { IMAGE_SIZE_LIMIT } else { FIELD_SIZE_LIMIT };

            let mut bytes: Vec<u8> = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(|e| {
                error!("stream read error: {e}");
                FormError::Malformed(e.to_string())
            })? {
                if bytes.len() + chunk.len() > limit {
                    return Err(FormError::TooLarge(limit));
                }
                bytes.extend_from_slice(&chunk);
            }

            match file_name {
                // an empty file input still sends a part
                Some(file_name) if bytes.is_empty() || file_name.is_empty() => {
                    debug!(field = %name, "skipping empty file part");
                }
                Some(file_name) => {
                    form.files.insert(name, sniff_image(&file_name, bytes)?);
                }
                None => {
                    let text = String::from_utf8(bytes)
                        .map_err(|_| FormError::Malformed(format!("field {name} is not UTF-8")))?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(fields: &[(&str, &str)], files: Vec<(&str, Upload)>) -> Self {
        Self {
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            files: files.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

/// Accept `bytes` only when their content is one of the allowed image types.
/// The declared content type is ignored.
pub fn sniff_image(file_name: &str, bytes: Vec<u8>) -> Result<Upload, ValidationError> {
    let mime = infer::get(&bytes)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".into());
    if !ALLOWED_MIME.contains(&mime.as_str()) {
        debug!(%mime, file_name, "rejecting upload");
        return Err(ValidationError::NotAnImage);
    }
    Ok(Upload { file_name: file_name.to_string(), mime, bytes })
}
