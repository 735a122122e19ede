//! Payload encoding: description + validated images → [`VisionRequest`].
//!
//! The request is provider-neutral: an ordered list of [`MultimodalPart`]s,
//! always one text part first and then one image part per screenshot in
//! upload order. Image parts share the uploaded `Bytes` buffers; base64 is
//! produced only when an adapter serialises its wire body.

use crate::config::ProviderKind;
use crate::error::ValidationError;
use crate::pipeline::validate::ValidatedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use tracing::debug;

/// One element of a multimodal prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultimodalPart {
    Text(String),
    Image { data: Bytes, mime: String },
}

impl MultimodalPart {
    /// Base64 of the image bytes, `None` for text parts.
    pub fn to_base64(&self) -> Option<String> {
        match self {
            MultimodalPart::Text(_) => None,
            MultimodalPart::Image { data, .. } => Some(STANDARD.encode(data)),
        }
    }

    /// `data:<mime>;base64,<data>` URI for image parts.
    pub fn data_uri(&self, mime: &str) -> Option<String> {
        self.to_base64()
            .map(|b64| format!("data:{mime};base64,{b64}"))
    }
}

/// A provider-neutral multimodal request.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub provider: ProviderKind,
    pub parts: Vec<MultimodalPart>,
}

impl VisionRequest {
    /// The description carried by the leading text part.
    pub fn text(&self) -> &str {
        match self.parts.first() {
            Some(MultimodalPart::Text(t)) => t,
            _ => "",
        }
    }

    /// Image parts as `(bytes, mime)` in upload order.
    pub fn images(&self) -> impl Iterator<Item = (&Bytes, &str)> {
        self.parts.iter().filter_map(|p| match p {
            MultimodalPart::Image { data, mime } => Some((data, mime.as_str())),
            MultimodalPart::Text(_) => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.images().count()
    }
}

/// Reject `count` images when it exceeds `max`.
///
/// Runs before any upload is validated so oversized batches cost nothing.
pub fn check_image_count(count: usize, max: usize) -> Result<(), ValidationError> {
    if count > max {
        return Err(ValidationError::TooManyImages { count, max });
    }
    Ok(())
}

/// Build the request for `provider` from a description and validated images.
pub fn encode(
    description: &str,
    images: Vec<ValidatedImage>,
    provider: ProviderKind,
    max_images: usize,
) -> Result<VisionRequest, ValidationError> {
    check_image_count(images.len(), max_images)?;

    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(MultimodalPart::Text(description.to_string()));
    parts.extend(images.into_iter().map(|img| MultimodalPart::Image {
        data: img.data().clone(),
        mime: img.mime().to_string(),
    }));

    debug!(
        "Encoded request for {}: {} parts, {} image bytes",
        provider,
        parts.len(),
        parts
            .iter()
            .map(|p| match p {
                MultimodalPart::Image { data, .. } => data.len(),
                MultimodalPart::Text(_) => 0,
            })
            .sum::<usize>()
    );

    Ok(VisionRequest { provider, parts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validate::validate;

    const PNG_SIG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";
    const JPEG_SIG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    fn images() -> Vec<ValidatedImage> {
        vec![
            validate("image/png", Bytes::from_static(PNG_SIG), 1024).unwrap(),
            validate("image/jpeg", Bytes::from_static(JPEG_SIG), 1024).unwrap(),
        ]
    }

    #[test]
    fn text_first_then_images_in_order() {
        let req = encode("login screen", images(), ProviderKind::Gemini, 10).unwrap();
        assert_eq!(req.parts.len(), 3);
        assert_eq!(req.parts[0], MultimodalPart::Text("login screen".into()));
        let mimes: Vec<&str> = req.images().map(|(_, m)| m).collect();
        assert_eq!(mimes, vec!["image/png", "image/jpeg"]);
        assert_eq!(req.text(), "login screen");
        assert_eq!(req.provider, ProviderKind::Gemini);
    }

    #[test]
    fn image_parts_share_upload_buffers() {
        let imgs = images();
        let original = imgs[0].data().as_ptr();
        let req = encode("x", imgs, ProviderKind::OpenAi, 10).unwrap();
        let (data, _) = req.images().next().unwrap();
        assert_eq!(data.as_ptr(), original);
    }

    #[test]
    fn too_many_images() {
        let err = encode("x", images(), ProviderKind::Gemini, 1).unwrap_err();
        assert_eq!(err, ValidationError::TooManyImages { count: 2, max: 1 });
        assert!(check_image_count(10, 10).is_ok());
        assert!(check_image_count(11, 10).is_err());
    }

    #[test]
    fn empty_description_still_leads() {
        let req = encode("", images(), ProviderKind::Gemini, 10).unwrap();
        assert_eq!(req.parts[0], MultimodalPart::Text(String::new()));
        assert_eq!(req.image_count(), 2);
    }

    #[test]
    fn data_uri_uses_given_label() {
        let part = MultimodalPart::Image {
            data: Bytes::from_static(b"abc"),
            mime: "image/jpeg".into(),
        };
        assert_eq!(part.to_base64().as_deref(), Some("YWJj"));
        assert_eq!(
            part.data_uri("image/png").as_deref(),
            Some("data:image/png;base64,YWJj")
        );
        assert_eq!(MultimodalPart::Text("t".into()).data_uri("image/png"), None);
    }
}
