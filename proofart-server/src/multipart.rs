//! Multipart form parsing helpers
//!
//! Collects the file and text fields of a multipart/form-data upload.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size};

/// Parsed multipart form fields
#[derive(Debug, Default)]
pub struct MultipartFields {
    /// Bytes of the field named "file"
    file: Option<Vec<u8>>,
    /// Text fields indexed by name
    text_fields: HashMap<String, String>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request, checking the file's
    /// Content-Type and size.
    pub async fn parse(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut fields = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                validate_content_type(field.content_type())?;

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                    .to_vec();

                validate_file_size(data.len(), max_file_size)?;
                fields.file = Some(data);
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read field '{}': {}", name, e))
                })?;
                fields.text_fields.insert(name, value);
            }
        }

        Ok(fields)
    }

    /// Take the uploaded file, if any
    pub fn take_file(&mut self) -> Option<Vec<u8>> {
        self.file.take()
    }

    /// Get a non-empty text field value
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.text_fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}
