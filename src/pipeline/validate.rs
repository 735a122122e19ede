//! Content validation: untrusted upload → [`ValidatedImage`].
//!
//! The declared content type comes from the client and is advisory only. An
//! upload is accepted when all three checks pass, in this order:
//!
//! 1. the declared type starts with `image/` (cheap, rejects obvious mistakes),
//! 2. the byte length is within the configured limit,
//! 3. the leading bytes match a supported image signature, and the header
//!    behind that signature decodes (two-byte signatures like `BM` alone
//!    match plain text).
//!
//! The sniffed MIME type, never the declared one, is what travels on to the
//! providers.

use crate::error::ValidationError;
use bytes::Bytes;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Formats the pipeline forwards to providers.
const SUPPORTED_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
];

/// A file exactly as the client sent it.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Bytes,
    pub declared_type: String,
    /// Original file name, used in logs and error context only.
    pub file_name: Option<String>,
}

impl UploadedImage {
    pub fn new(declared_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            declared_type: declared_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An upload whose size and signature have been checked.
///
/// Only [`validate`] constructs this type.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    data: Bytes,
    mime: &'static str,
    declared_type: String,
    file_name: Option<String>,
}

impl ValidatedImage {
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// MIME type derived from the byte signature.
    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Validate one upload against `max_bytes`.
pub fn validate(
    declared_type: &str,
    data: Bytes,
    max_bytes: usize,
) -> Result<ValidatedImage, ValidationError> {
    if !declared_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
    {
        return Err(ValidationError::WrongDeclaredType {
            declared: declared_type.to_string(),
        });
    }

    if data.len() > max_bytes {
        return Err(ValidationError::TooLarge {
            size: data.len(),
            max: max_bytes,
        });
    }

    let not_an_image = || ValidationError::NotAnImage {
        declared: declared_type.to_string(),
    };
    let format = sniff_format(&data).ok_or_else(not_an_image)?;
    if let Err(e) = ImageReader::with_format(Cursor::new(&data[..]), format).into_dimensions() {
        debug!("{:?} signature but unreadable header: {}", format, e);
        return Err(not_an_image());
    }
    let mime = format.to_mime_type();

    if !declared_type.trim().eq_ignore_ascii_case(mime) {
        debug!(
            "Declared type '{}' disagrees with sniffed '{}'; using sniffed",
            declared_type, mime
        );
    }

    Ok(ValidatedImage {
        data,
        mime,
        declared_type: declared_type.to_string(),
        file_name: None,
    })
}

/// Validate an [`UploadedImage`], keeping its file name.
pub fn validate_upload(
    upload: UploadedImage,
    max_bytes: usize,
) -> Result<ValidatedImage, ValidationError> {
    let UploadedImage {
        data,
        declared_type,
        file_name,
    } = upload;
    let mut validated = validate(&declared_type, data, max_bytes)?;
    validated.file_name = file_name;
    Ok(validated)
}

/// MIME type of a supported image signature at the start of `data`.
///
/// Signature only: [`validate`] additionally requires the header to decode.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    sniff_format(data).map(|f| f.to_mime_type())
}

fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    let format = image::guess_format(data).ok()?;
    SUPPORTED_FORMATS.contains(&format).then_some(format)
}
