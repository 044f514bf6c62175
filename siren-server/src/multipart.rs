//! Multipart form parsing helpers
//!
//! Provides reusable abstractions for parsing multipart/form-data uploads,
//! reducing code duplication across handlers. The batch upload endpoint
//! accepts any number of file fields; the single-recording endpoint requires
//! exactly one.

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size, validate_not_empty};

/// Represents one file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type from the multipart field (if provided)
    pub content_type: Option<String>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

impl FileField {
    /// Filename to record for this upload, falling back to a placeholder.
    pub fn file_name_or_default(&self) -> &str {
        self.file_name.as_deref().unwrap_or("unnamed.wav")
    }
}

/// Parsed multipart form fields
///
/// Provides structured access to the file fields of a multipart/form-data
/// request. Handles validation and type conversion.
#[derive(Debug)]
pub struct MultipartFields {
    /// File fields in submission order
    files: Vec<FileField>,
}

impl MultipartFields {
    /// Parse all file fields from a multipart request
    ///
    /// Any field carrying a filename, or named like a file field, is treated
    /// as a file upload; anything else is skipped. Each file is validated
    /// for Content-Type, emptiness and size.
    pub async fn parse(
        multipart: &mut Multipart,
        max_file_size: usize,
    ) -> Result<Self, ApiError> {
        let mut files = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().map(|s| s.to_string());

            if file_name.is_none() && name != "file" && name != "files" {
                continue;
            }

            let content_type = field.content_type().map(|s| s.to_string());
            validate_content_type(content_type.as_deref())?;

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                .to_vec();

            validate_not_empty(data.len())?;
            validate_file_size(data.len(), max_file_size)?;

            files.push(FileField {
                data,
                content_type,
                file_name,
            });
        }

        Ok(Self { files })
    }

    /// All uploaded files, requiring at least one.
    pub fn require_files(&self) -> Result<&[FileField], ApiError> {
        if self.files.is_empty() {
            Err(ApiError::bad_request(
                "No files provided. Use 'files' fields in multipart form.",
            ))
        } else {
            Ok(&self.files)
        }
    }

    /// Exactly one uploaded file, for the single-recording endpoint.
    pub fn require_one_file(&self) -> Result<&FileField, ApiError> {
        match self.files.as_slice() {
            [single] => Ok(single),
            [] => Err(ApiError::bad_request(
                "No file provided. Use 'file' field in multipart form.",
            )),
            _ => Err(ApiError::bad_request(
                "Multiple files provided; this endpoint accepts exactly one.",
            )),
        }
    }
}
