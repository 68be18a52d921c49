//! Captured photo held in memory for one pipeline run

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// MIME type assumed when neither the upload nor the bytes say otherwise
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhotoError {
    #[error("No image provided")]
    Empty,

    #[error("Not an image file: {0}")]
    NotAnImage(String),
}

/// Raw image bytes plus MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct Photo {
    bytes: Vec<u8>,
    mime_type: String,
}

impl Photo {
    /// Build a photo from uploaded bytes
    ///
    /// A declared `image/*` type is trusted. Missing or generic declarations
    /// (`application/octet-stream`) fall back to sniffing the magic number,
    /// then to [`DEFAULT_MIME_TYPE`]. Anything recognisably not an image is
    /// rejected.
    pub fn new(bytes: Vec<u8>, declared_mime: Option<&str>) -> Result<Self, PhotoError> {
        if bytes.is_empty() {
            return Err(PhotoError::Empty);
        }

        let declared = declared_mime
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty() && m != "application/octet-stream");

        let mime_type = match declared {
            Some(mime) if mime.starts_with("image/") => mime,
            Some(mime) => return Err(PhotoError::NotAnImage(mime)),
            None => match infer::get(&bytes) {
                Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
                    kind.mime_type().to_string()
                }
                Some(kind) => return Err(PhotoError::NotAnImage(kind.mime_type().to_string())),
                None => DEFAULT_MIME_TYPE.to_string(),
            },
        };

        Ok(Self { bytes, mime_type })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Inline `data:` URL for vision requests
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// File extension used when the photo is stored
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/heic" | "image/heif" => "heic",
            "image/avif" => "avif",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            _ => "jpg",
        }
    }
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
