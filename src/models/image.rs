use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TryOnError};

/// An uploaded image ready for transport: standard base64 plus its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: String,
    media_type: String,
}

impl EncodedImage {
    /// Both fields must be non-empty and the media type one of
    /// [`SUPPORTED_MEDIA_TYPES`].
    pub fn new(data: impl Into<String>, media_type: impl Into<String>) -> Result<Self> {
        let data = data.into();
        let media_type = media_type.into().trim().to_ascii_lowercase();
        if data.is_empty() {
            return Err(TryOnError::Encoding("image payload is empty".into()));
        }
        if !is_supported_media_type(&media_type) {
            return Err(TryOnError::Encoding(format!(
                "unrecognized image media type: {:?}",
                media_type
            )));
        }
        Ok(Self { data, media_type })
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn to_data_uri(&self) -> String {
        data_uri(&self.media_type, &self.data)
    }

    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let (media_type, data) = split_data_uri(uri)?;
        Self::new(data, media_type)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| TryOnError::Encoding(format!("invalid base64 payload: {}", e)))
    }
}

/// The image the model sent back, kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub media_type: String,
    pub data: String,
}

impl GeneratedImage {
    pub fn to_data_uri(&self) -> String {
        data_uri(&self.media_type, &self.data)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| {
                log::error!("Generated image payload is not valid base64: {}", e);
                TryOnError::MalformedResponse
            })
    }

    /// File extension matching the media type, `png` when unknown.
    pub fn extension(&self) -> &'static str {
        image::ImageFormat::from_mime_type(&self.media_type)
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("png")
    }
}

/// Result of one generation round trip. Exactly one side is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Succeeded(GeneratedImage),
    Failed(TryOnError),
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Succeeded(_))
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        match self {
            GenerationOutcome::Succeeded(image) => Some(image),
            GenerationOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&TryOnError> {
        match self {
            GenerationOutcome::Succeeded(_) => None,
            GenerationOutcome::Failed(err) => Some(err),
        }
    }

    pub fn message(&self) -> Option<String> {
        self.error().map(TryOnError::user_message)
    }
}

/// Image types the model accepts as input.
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/heic",
    "image/heif",
    "image/gif",
];

pub fn is_supported_media_type(media_type: &str) -> bool {
    SUPPORTED_MEDIA_TYPES.contains(&media_type)
}

fn data_uri(media_type: &str, data: &str) -> String {
    format!("data:{};base64,{}", media_type, data)
}

fn split_data_uri(uri: &str) -> Result<(&str, &str)> {
    let malformed = || TryOnError::Encoding("failed to parse file data".into());
    let rest = uri.strip_prefix("data:").ok_or_else(malformed)?;
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    let media_type = header.strip_suffix(";base64").ok_or_else(malformed)?;
    Ok((media_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_non_image() {
        assert!(EncodedImage::new("", "image/png").is_err());
        assert!(EncodedImage::new("AAAA", "text/plain").is_err());
        assert!(EncodedImage::new("AAAA", "image/").is_err());
        assert!(EncodedImage::new("AAAA", "image/banana").is_err());
        assert!(EncodedImage::new("AAAA", "image/svg+xml").is_err());
        assert!(EncodedImage::new("AAAA", "IMAGE/PNG").is_ok());
        assert!(EncodedImage::new("AAAA", "image/heif").is_ok());
    }

    #[test]
    fn test_data_uri_parse() {
        let image = EncodedImage::from_data_uri("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(image.media_type(), "image/jpeg");
        assert_eq!(image.data(), "/9j/4AAQ");
        assert_eq!(image.to_data_uri(), "data:image/jpeg;base64,/9j/4AAQ");

        assert!(EncodedImage::from_data_uri("image/png;base64,AAAA").is_err());
        assert!(EncodedImage::from_data_uri("data:image/png,AAAA").is_err());
        assert!(EncodedImage::from_data_uri("data:image/png;base64,").is_err());
    }

    #[test]
    fn test_generated_image_display_string() {
        let image = GeneratedImage {
            media_type: "image/png".into(),
            data: "iVBORw0KGgo=".into(),
        };
        assert_eq!(image.to_data_uri(), "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.extension(), "png");
        assert_eq!(image.decode().unwrap(), b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_outcome_accessors() {
        let failed = GenerationOutcome::Failed(TryOnError::EmptyResponse);
        assert!(!failed.is_success());
        assert!(failed.image().is_none());
        assert!(failed.message().unwrap().contains("no candidates"));
    }
}
