//! Decode-path selection by declared content type

use std::fmt;
use std::path::Path;

use crate::error::ItemError;

/// Image formats the pipeline knows how to place on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// Embedded as-is by the document encoder.
    Jpeg,
    /// Embedded as-is by the document encoder.
    Png,
    /// Decoded to raw pixels first, then embedded as a raster.
    Webp,
}

impl ImageKind {
    pub fn from_mime_type(content_type: &str) -> Option<Self> {
        match normalize_mime_type(content_type).to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn from_extension(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        match extension.as_str() {
            "jpg" | "jpeg" | "jpe" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Normalize MIME type by stripping parameters (e.g. "image/png; q=1" -> "image/png").
pub fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

/// Picks the decode path for one item.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDispatcher;

impl FormatDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the item's kind from its declared content type.
    ///
    /// A missing or generic (`application/octet-stream`) type falls back to the
    /// file name extension; a specific but unsupported type does not.
    pub fn resolve(
        &self,
        content_type: Option<&str>,
        file_name: &str,
    ) -> Result<ImageKind, ItemError> {
        let declared = content_type
            .map(normalize_mime_type)
            .filter(|ct| !ct.is_empty());

        match declared {
            Some(ct) if !ct.eq_ignore_ascii_case("application/octet-stream") => {
                ImageKind::from_mime_type(ct).ok_or_else(|| ItemError::Unsupported(ct.to_string()))
            }
            other => ImageKind::from_extension(file_name).ok_or_else(|| {
                ItemError::Unsupported(
                    other
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("unknown ({})", file_name)),
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mime_type() {
        assert_eq!(normalize_mime_type("image/png; charset=binary"), "image/png");
        assert_eq!(normalize_mime_type("  image/webp "), "image/webp");
    }

    #[test]
    fn test_jpeg_aliases() {
        for ct in ["image/jpeg", "image/jpg", "IMAGE/JPEG", "image/pjpeg"] {
            assert_eq!(ImageKind::from_mime_type(ct), Some(ImageKind::Jpeg), "{}", ct);
        }
    }

    #[test]
    fn test_resolve_by_declared_type() {
        let dispatcher = FormatDispatcher::new();
        assert_eq!(
            dispatcher.resolve(Some("image/png"), "photo.jpg").unwrap(),
            ImageKind::Png
        );
        assert_eq!(
            dispatcher.resolve(Some("image/webp"), "x").unwrap(),
            ImageKind::Webp
        );
    }

    #[test]
    fn test_unsupported_declared_type_is_not_rescued_by_extension() {
        let err = FormatDispatcher::new()
            .resolve(Some("image/gif"), "anim.png")
            .unwrap_err();
        assert!(matches!(err, ItemError::Unsupported(ref ct) if ct == "image/gif"));
    }

    #[test]
    fn test_generic_type_falls_back_to_extension() {
        let dispatcher = FormatDispatcher::new();
        assert_eq!(
            dispatcher
                .resolve(Some("application/octet-stream"), "scan.JPEG")
                .unwrap(),
            ImageKind::Jpeg
        );
        assert_eq!(
            dispatcher.resolve(None, "sticker.webp").unwrap(),
            ImageKind::Webp
        );
        assert!(dispatcher.resolve(None, "notes.txt").is_err());
        assert!(dispatcher.resolve(Some(""), "noext").is_err());
    }
}
