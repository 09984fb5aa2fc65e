//! Client-side checks and naming for image uploads.

use std::fmt;

use crate::config::{BackofficeConfig, DEFAULT_MAX_UPLOAD_BYTES};
use crate::error::{Error, Result};
use crate::path;

/// MIME types accepted by default.
pub const IMAGE_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

/// A file picked by the user, held in memory until uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Declared content type, or one guessed from the file name.
    pub fn resolved_content_type(&self) -> String {
        match self.content_type.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() => declared.to_ascii_lowercase(),
            _ => mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Which files may be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub allowed_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_types: IMAGE_CONTENT_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl UploadPolicy {
    pub fn from_config(config: &BackofficeConfig) -> Self {
        Self {
            max_bytes: config.max_upload_bytes,
            ..Self::default()
        }
    }

    /// Checks type, then size. Returns the content type to upload with.
    pub fn check(&self, file: &UploadFile) -> Result<String> {
        let content_type = self.resolve_type(file)?;
        if file.size() > self.max_bytes {
            return Err(Error::Validation(format!(
                "A imagem deve ter no máximo {}.",
                human_size(self.max_bytes)
            )));
        }
        Ok(content_type)
    }

    fn resolve_type(&self, file: &UploadFile) -> Result<String> {
        let content_type = file.resolved_content_type();
        if self.allowed_types.iter().any(|t| *t == content_type) {
            Ok(content_type)
        } else {
            Err(Error::Validation(
                "Apenas imagens JPG e PNG são permitidas.".into(),
            ))
        }
    }
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Object name for an upload: `{prefix_}{unix_millis}_{file_name}`.
///
/// The timestamp keeps repeated uploads of the same file apart. Any folder
/// part of `file_name` is dropped.
pub fn object_name(prefix: Option<&str>, unix_millis: i64, file_name: &str) -> String {
    let base = path::file_name(file_name);
    let base = if base.is_empty() { "upload" } else { base };
    match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}_{unix_millis}_{base}"),
        None => format!("{unix_millis}_{base}"),
    }
}
