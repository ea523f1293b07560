//! File Attachments
//!
//! Uploaded files are embedded in records as base64 data URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;

use crate::domain::{Attachment, DomainError, DomainResult};

/// Build an attachment from raw bytes, guessing the MIME type from the name
pub fn encode_attachment(file_name: &str, bytes: &[u8]) -> DomainResult<Attachment> {
    if file_name.trim().is_empty() {
        return Err(DomainError::InvalidInput("File name is required".into()));
    }
    let mime_type = mime_guess::from_path(file_name).first_or_octet_stream().to_string();
    Ok(Attachment {
        name: file_name.to_string(),
        data: format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)),
        mime_type,
        size: bytes.len() as u64,
        upload_date: Some(Utc::now()),
    })
}

/// Decode a `data:<mime>;base64,<payload>` URL back to bytes
pub fn decode_data_url(data_url: &str) -> DomainResult<Vec<u8>> {
    let (header, payload) = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| DomainError::InvalidInput("Not a data URL".into()))?;
    if !header.ends_with(";base64") {
        return Err(DomainError::InvalidInput("Only base64 data URLs are supported".into()));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| DomainError::InvalidInput(format!("Invalid base64 payload: {}", e)))
}
