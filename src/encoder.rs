use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

use crate::{
    config::DEFAULT_MAX_UPLOAD_BYTES,
    error::{Result, TryOnError},
    models::{is_supported_media_type, EncodedImage},
};

/// Turns uploaded files into [`EncodedImage`]s.
#[derive(Debug, Clone)]
pub struct ImageEncoder {
    max_bytes: usize,
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ImageEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// `hint` is either a declared content type (`image/png`) or a file name;
    /// it is only consulted when the magic bytes are not recognised.
    pub fn encode_bytes(&self, bytes: &[u8], hint: Option<&str>) -> Result<EncodedImage> {
        if bytes.is_empty() {
            return Err(TryOnError::Encoding("file is empty".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(TryOnError::Encoding(format!(
                "file exceeds the {} byte upload limit",
                self.max_bytes
            )));
        }

        let media_type = detect_media_type(bytes, hint).ok_or_else(|| {
            TryOnError::Encoding(format!(
                "could not determine an image media type (hint: {})",
                hint.unwrap_or("none")
            ))
        })?;

        log::debug!(
            "Encoded {} bytes as {} (hint: {:?})",
            bytes.len(),
            media_type,
            hint
        );
        EncodedImage::new(STANDARD.encode(bytes), media_type)
    }

    pub async fn encode_file(&self, path: impl AsRef<Path>) -> Result<EncodedImage> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TryOnError::Encoding(format!("failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path.file_name().and_then(|name| name.to_str());
        self.encode_bytes(&bytes, file_name)
    }
}

pub fn detect_media_type(bytes: &[u8], hint: Option<&str>) -> Option<String> {
    let sniffed = image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
        .filter(|mime| is_supported_media_type(mime));

    match sniffed {
        Some(mime) => Some(mime.to_string()),
        None => hint.and_then(media_type_from_hint),
    }
}

fn media_type_from_hint(hint: &str) -> Option<String> {
    let hint = hint.trim();
    if let Some(declared) = hint
        .split(';')
        .next()
        .map(|essence| essence.trim().to_ascii_lowercase())
        .filter(|essence| is_supported_media_type(essence))
    {
        return Some(declared);
    }

    let extension = Path::new(hint).extension()?.to_str()?;
    ImageFormat::from_extension(extension)
        .map(|format| format.to_mime_type())
        .filter(|mime| is_supported_media_type(mime))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_HEAD: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01";
    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_sniffs_png_and_jpeg() {
        let encoder = ImageEncoder::new();
        assert_eq!(
            encoder.encode_bytes(PNG_HEAD, None).unwrap().media_type(),
            "image/png"
        );
        assert_eq!(
            encoder
                .encode_bytes(JPEG_HEAD, Some("wrong.png"))
                .unwrap()
                .media_type(),
            "image/jpeg"
        );
    }

    #[test]
    fn test_falls_back_to_hint() {
        let encoder = ImageEncoder::new();
        let bytes = b"not a known signature";
        assert_eq!(
            encoder
                .encode_bytes(bytes, Some("image/heic; charset=binary"))
                .unwrap()
                .media_type(),
            "image/heic"
        );
        assert_eq!(
            encoder
                .encode_bytes(bytes, Some("shirt.webp"))
                .unwrap()
                .media_type(),
            "image/webp"
        );
        assert!(matches!(
            encoder.encode_bytes(bytes, Some("notes.txt")),
            Err(TryOnError::Encoding(_))
        ));
        assert!(matches!(
            encoder.encode_bytes(b"hello world, not an image", Some("image/banana")),
            Err(TryOnError::Encoding(_))
        ));
        assert!(encoder.encode_bytes(bytes, Some("logo.svg")).is_err());
        assert!(encoder.encode_bytes(bytes, None).is_err());
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let encoder = ImageEncoder::new().with_max_bytes(8);
        assert!(encoder.encode_bytes(&[], Some("image/png")).is_err());
        assert!(encoder.encode_bytes(PNG_HEAD, None).is_err());
    }

    #[test]
    fn test_round_trip_through_data_uri() {
        let mut bytes = PNG_HEAD.to_vec();
        bytes.extend((0u8..=255).collect::<Vec<_>>());

        let encoded = ImageEncoder::new().encode_bytes(&bytes, None).unwrap();
        let uri = encoded.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));

        let restored = EncodedImage::from_data_uri(&uri).unwrap();
        assert_eq!(restored, encoded);
        assert_eq!(restored.decode().unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_encode_file() {
        let mut file = tempfile::Builder::new().suffix(".gif").tempfile().unwrap();
        file.write_all(b"GIF89a\x01\x00\x01\x00").unwrap();

        let encoded = ImageEncoder::new().encode_file(file.path()).await.unwrap();
        assert_eq!(encoded.media_type(), "image/gif");
        assert_eq!(encoded.decode().unwrap(), b"GIF89a\x01\x00\x01\x00");
    }

    #[tokio::test]
    async fn test_encode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageEncoder::new()
            .encode_file(dir.path().join("missing.png"))
            .await;
        assert!(matches!(result, Err(TryOnError::Encoding(_))));
    }
}
