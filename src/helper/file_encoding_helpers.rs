use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::collections::HashMap;
use thiserror::Error;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * 1024;

pub const LOGO_MAX_BYTES: u64 = 500 * KB;
pub const BLOG_IMAGE_MAX_BYTES: u64 = MB;
pub const TEMPLATE_MAX_BYTES: u64 = 4 * MB;
pub const BANNER_MAX_BYTES: u64 = 5 * MB;
pub const CONTENT_IMAGE_MAX_BYTES: u64 = MB;
pub const MANUSCRIPT_MAX_BYTES: u64 = 4 * MB;

pub const HERO_MAX_WIDTH: u32 = 1920;
pub const HERO_MAX_HEIGHT: u32 = 1080;
pub const HERO_JPEG_QUALITY: u8 = 70;

const DOCUMENT_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// A file exactly as the browser sent it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptedKind {
    /// Any `image/*` type.
    Image,
    /// PDF, DOC or DOCX.
    Document,
}

impl AcceptedKind {
    pub fn allows(self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        match self {
            AcceptedKind::Image => content_type.starts_with("image/"),
            AcceptedKind::Document => DOCUMENT_MIME_TYPES.contains(&content_type.as_str()),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            AcceptedKind::Image => "an image",
            AcceptedKind::Document => "a PDF, DOC or DOCX file",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStrategy {
    /// Base64 data URI of the original bytes.
    DataUri,
    /// Fit within the box, re-encode as JPEG, then data URI.
    Downscale {
        max_width: u32,
        max_height: u32,
        quality: u8,
    },
}

/// What one file input of a form accepts and how it ends up in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRule {
    pub field: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub accept: AcceptedKind,
    pub max_bytes: u64,
    pub strategy: EncodeStrategy,
}

impl FileRule {
    pub fn image(field: &'static str, label: &'static str, max_bytes: u64) -> Self {
        Self {
            field,
            label,
            required: false,
            accept: AcceptedKind::Image,
            max_bytes,
            strategy: EncodeStrategy::DataUri,
        }
    }

    pub fn document(field: &'static str, label: &'static str, max_bytes: u64) -> Self {
        Self {
            field,
            label,
            required: false,
            accept: AcceptedKind::Document,
            max_bytes,
            strategy: EncodeStrategy::DataUri,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Hero-image treatment: fit within 1920x1080 and recompress at quality 0.7.
    pub fn downscaled(mut self) -> Self {
        self.strategy = EncodeStrategy::Downscale {
            max_width: HERO_MAX_WIDTH,
            max_height: HERO_MAX_HEIGHT,
            quality: HERO_JPEG_QUALITY,
        };
        self
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{label} is required.")]
    Missing { field: &'static str, label: &'static str },
    #[error("{label} must be {expected}, got '{content_type}'.")]
    UnsupportedType {
        field: &'static str,
        label: &'static str,
        expected: &'static str,
        content_type: String,
    },
    #[error("{label} must be {limit} or smaller.")]
    TooLarge {
        field: &'static str,
        label: &'static str,
        limit: String,
        size: u64,
    },
    #[error("{label} could not be processed: {source}")]
    Image {
        field: &'static str,
        label: &'static str,
        #[source]
        source: image::ImageError,
    },
}

impl EncodeError {
    pub fn field(&self) -> &'static str {
        match self {
            EncodeError::Missing { field, .. }
            | EncodeError::UnsupportedType { field, .. }
            | EncodeError::TooLarge { field, .. }
            | EncodeError::Image { field, .. } => field,
        }
    }
}

/// Encoded strings keyed by form field. Never holds raw bytes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EncodedFiles(HashMap<&'static str, String>);

impl EncodedFiles {
    pub fn insert(&mut self, field: &'static str, encoded: String) {
        self.0.insert(field, encoded);
    }

    pub fn take(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn human_size(bytes: u64) -> String {
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{}KB", bytes / KB)
    }
}

pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

/// Largest size that fits within `max_width` x `max_height` keeping the
/// aspect ratio. Images already inside the box are left as they are.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }
    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (new_width, new_height)
}

/// Decodes, fits within the box and re-encodes as JPEG.
pub fn downscale_and_recompress(
    bytes: &[u8],
    max_width: u32,
    max_height: u32,
    quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = fit_within(decoded.width(), decoded.height(), max_width, max_height);
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

/// Checks one file against its rule and turns it into an embeddable string.
/// `Ok(None)` means an optional file was not provided.
pub fn encode_file(rule: &FileRule, file: Option<&UploadedFile>) -> Result<Option<String>, EncodeError> {
    let file = match file.filter(|f| !f.bytes.is_empty()) {
        Some(file) => file,
        None if rule.required => {
            return Err(EncodeError::Missing {
                field: rule.field,
                label: rule.label,
            })
        }
        None => return Ok(None),
    };

    if !rule.accept.allows(&file.content_type) {
        return Err(EncodeError::UnsupportedType {
            field: rule.field,
            label: rule.label,
            expected: rule.accept.describe(),
            content_type: file.content_type.clone(),
        });
    }

    let size = file.bytes.len() as u64;
    if size > rule.max_bytes {
        return Err(EncodeError::TooLarge {
            field: rule.field,
            label: rule.label,
            limit: human_size(rule.max_bytes),
            size,
        });
    }

    let encoded = match rule.strategy {
        EncodeStrategy::DataUri => data_uri(&file.content_type, &file.bytes),
        EncodeStrategy::Downscale {
            max_width,
            max_height,
            quality,
        } => {
            let jpeg = downscale_and_recompress(&file.bytes, max_width, max_height, quality)
                .map_err(|source| EncodeError::Image {
                    field: rule.field,
                    label: rule.label,
                    source,
                })?;
            data_uri("image/jpeg", &jpeg)
        }
    };
    Ok(Some(encoded))
}

/// Encodes every file of a form. Stops at the first failure, so either every
/// rule is satisfied or nothing is returned.
pub fn encode_all(rules: &[FileRule], files: &HashMap<String, UploadedFile>) -> Result<EncodedFiles, EncodeError> {
    let mut encoded = EncodedFiles::default();
    for rule in rules {
        if let Some(value) = encode_file(rule, files.get(rule.field))? {
            encoded.insert(rule.field, value);
        }
    }
    Ok(encoded)
}

/// Reverses [`data_uri`]; used to inspect stored payloads.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (content_type, payload) = rest.split_once(";base64,")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((content_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb([180u8, 40, 40]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(buffer)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, 90))
            .unwrap();
        out
    }

    fn upload(content_type: &str, bytes: Vec<u8>) -> UploadedFile {
        UploadedFile {
            file_name: "upload.bin".to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    #[test]
    fn fit_within_caps_the_limiting_dimension() {
        assert_eq!(fit_within(3840, 1080, 1920, 1080), (1920, 540));
        assert_eq!(fit_within(1000, 3000, 1920, 1080), (360, 1080));
        assert_eq!(fit_within(2400, 1600, 1920, 1080), (1620, 1080));
        assert_eq!(fit_within(800, 600, 1920, 1080), (800, 600));
    }

    #[test]
    fn fit_within_preserves_aspect_ratio() {
        let (w, h) = fit_within(5000, 1234, 1920, 1080);
        let before = 5000.0 / 1234.0;
        let after = w as f64 / h as f64;
        assert_eq!(w, 1920);
        assert!((before - after).abs() < 0.01);
    }

    #[test]
    fn wide_hero_image_is_downscaled_to_the_cap() {
        let rule = FileRule::image("image", "Banner image", BANNER_MAX_BYTES).required(true).downscaled();
        let encoded = encode_file(&rule, Some(&upload("image/jpeg", jpeg(3000, 1000))))
            .unwrap()
            .unwrap();

        let (content_type, bytes) = decode_data_uri(&encoded).unwrap();
        assert_eq!(content_type, "image/jpeg");
        let stored = image::load_from_memory(&bytes).unwrap();
        assert_eq!((stored.width(), stored.height()), (1920, 640));
    }

    #[test]
    fn small_image_keeps_its_size() {
        let rule = FileRule::image("image", "Banner image", BANNER_MAX_BYTES).downscaled();
        let encoded = encode_file(&rule, Some(&upload("image/jpeg", jpeg(800, 600))))
            .unwrap()
            .unwrap();
        let (_, bytes) = decode_data_uri(&encoded).unwrap();
        let stored = image::load_from_memory(&bytes).unwrap();
        assert_eq!((stored.width(), stored.height()), (800, 600));
    }

    #[test]
    fn missing_required_file_is_rejected() {
        let rule = FileRule::image("image", "Blog image", BLOG_IMAGE_MAX_BYTES).required(true);
        let err = encode_file(&rule, None).unwrap_err();
        assert_eq!(err.to_string(), "Blog image is required.");
        assert_eq!(err.field(), "image");
    }

    #[test]
    fn optional_file_may_be_absent() {
        let rule = FileRule::image("logo", "Logo", LOGO_MAX_BYTES);
        assert_eq!(encode_file(&rule, None).unwrap(), None);
    }

    #[test]
    fn type_and_size_are_checked_before_encoding() {
        let rule = FileRule::document("paper_template", "Paper template", TEMPLATE_MAX_BYTES);
        let err = encode_file(&rule, Some(&upload("image/png", vec![1, 2, 3]))).unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedType { .. }));

        let logo = FileRule::image("logo", "Logo", LOGO_MAX_BYTES);
        let err = encode_file(&logo, Some(&upload("image/png", vec![0; 600 * 1024]))).unwrap_err();
        assert_eq!(err.to_string(), "Logo must be 500KB or smaller.");
    }

    #[test]
    fn documents_become_data_uris_verbatim() {
        let rule = FileRule::document("manuscript", "Manuscript", MANUSCRIPT_MAX_BYTES);
        let encoded = encode_file(&rule, Some(&upload("application/pdf", b"%PDF-1.7".to_vec())))
            .unwrap()
            .unwrap();
        assert_eq!(encoded, "data:application/pdf;base64,JVBERi0xLjc=");
    }

    #[test]
    fn undecodable_image_surfaces_an_error() {
        let rule = FileRule::image("image", "Banner image", BANNER_MAX_BYTES).downscaled();
        let err = encode_file(&rule, Some(&upload("image/jpeg", b"not an image".to_vec()))).unwrap_err();
        assert!(matches!(err, EncodeError::Image { field: "image", .. }));
    }

    #[test]
    fn encode_all_is_all_or_nothing() {
        let rules = vec![
            FileRule::image("logo", "Logo", LOGO_MAX_BYTES),
            FileRule::document("paper_template", "Paper template", TEMPLATE_MAX_BYTES).required(true),
        ];
        let mut files = HashMap::new();
        files.insert("logo".to_string(), upload("image/png", vec![1, 2, 3]));
        assert!(encode_all(&rules, &files).is_err());

        files.insert("paper_template".to_string(), upload("application/pdf", b"%PDF".to_vec()));
        let encoded = encode_all(&rules, &files).unwrap();
        assert!(encoded.get("logo").unwrap().starts_with("data:image/png;base64,"));
        assert!(encoded.get("paper_template").is_some());
    }
}
