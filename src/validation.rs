//! Inbound image checks run before any upstream call.

use crate::error::ServiceError;
use base64::Engine;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;
use std::borrow::Cow;

/// Largest accepted decoded image, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const DATA_URI_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// Standard alphabet; trailing `=` padding may be present or omitted.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The fields of an image analysis body the validator cares about. Everything else
/// in the body is ignored and passed through untouched.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImagePayload {
    pub image_base64: Option<String>,
}

impl ImagePayload {
    /// Pulls `image_base64` out of a parsed JSON body. A body that is not an object
    /// carries no image; a non-string `image_base64` is malformed.
    pub fn from_json(body: &Value) -> Result<Self, ServiceError> {
        let image_base64 = match body.get("image_base64") {
            None | Some(Value::Null) => None,
            Some(Value::String(image)) => Some(image.clone()),
            Some(_) => return Err(ServiceError::ValidationFailed),
        };
        Ok(Self { image_base64 })
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage {
    pub subtype: Option<String>,
    pub byte_len: usize,
}

/// A base64 image with any `data:image/<subtype>;base64,` prefix split off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage<'a> {
    pub subtype: Option<&'a str>,
    pub payload: &'a str,
}

impl<'a> EmbeddedImage<'a> {
    /// Splits a leading data URI prefix off `input`. The subtype must be one or more
    /// word characters; anything else leaves the input untouched.
    pub fn parse(input: &'a str) -> Self {
        if let Some(rest) = input.strip_prefix(DATA_URI_PREFIX) {
            let subtype_len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            let (subtype, tail) = rest.split_at(subtype_len);
            if !subtype.is_empty() {
                if let Some(payload) = tail.strip_prefix(BASE64_MARKER) {
                    return Self {
                        subtype: Some(subtype),
                        payload,
                    };
                }
            }
        }

        Self {
            subtype: None,
            payload: input,
        }
    }

    /// The payload with ASCII whitespace dropped and the URL-safe alphabet mapped
    /// onto the standard one. Line-wrapped encoder output decodes as-is.
    pub fn normalized_payload(&self) -> Cow<'a, str> {
        let needs_cleanup = self
            .payload
            .bytes()
            .any(|b| b.is_ascii_whitespace() || b == b'-' || b == b'_');
        if !needs_cleanup {
            return Cow::Borrowed(self.payload);
        }

        Cow::Owned(
            self.payload
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .map(|c| match c {
                    '-' => '+',
                    '_' => '/',
                    other => other,
                })
                .collect(),
        )
    }

    /// Re-wraps the normalized payload as a data URI, keeping the original subtype
    /// and falling back to `jpeg` when none was supplied.
    pub fn to_data_uri(&self) -> String {
        format!(
            "{}{}{}{}",
            DATA_URI_PREFIX,
            self.subtype.unwrap_or("jpeg"),
            BASE64_MARKER,
            self.normalized_payload()
        )
    }
}

/// Checks that `image_base64` is present, decodes to a non-empty buffer and fits
/// within [`MAX_IMAGE_BYTES`]. Pure: the same input always yields the same result.
pub fn validate_image(image_base64: Option<&str>) -> Result<ValidatedImage, ServiceError> {
    let raw = match image_base64 {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ServiceError::MissingImage),
    };

    let image = EmbeddedImage::parse(raw);
    let decoded = LENIENT_BASE64
        .decode(image.normalized_payload().as_bytes())
        .map_err(|_| ServiceError::InvalidEncoding)?;

    if decoded.is_empty() {
        return Err(ServiceError::InvalidImageData);
    }

    if decoded.len() > MAX_IMAGE_BYTES {
        return Err(ServiceError::ImageTooLarge);
    }

    Ok(ValidatedImage {
        subtype: image.subtype.map(str::to_string),
        byte_len: decoded.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn encoded(len: usize) -> String {
        STANDARD.encode(vec![0u8; len])
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    fn test_missing_image(#[case] input: Option<&str>) {
        assert_eq!(validate_image(input), Err(ServiceError::MissingImage));
    }

    #[rstest]
    #[case("not base64!!")]
    #[case("data:image/png;base64,@@@@")]
    #[case("AAAAA")]
    fn test_invalid_encoding(#[case] input: &str) {
        assert_eq!(validate_image(Some(input)), Err(ServiceError::InvalidEncoding));
    }

    #[test]
    fn test_prefix_only_is_invalid_image_data() {
        assert_eq!(
            validate_image(Some("data:image/png;base64,")),
            Err(ServiceError::InvalidImageData)
        );
    }

    #[test]
    fn test_size_boundary() {
        let at_limit = encoded(MAX_IMAGE_BYTES);
        let over_limit = encoded(MAX_IMAGE_BYTES + 1);

        assert_eq!(
            validate_image(Some(&at_limit)).map(|v| v.byte_len),
            Ok(MAX_IMAGE_BYTES)
        );
        assert_eq!(
            validate_image(Some(&over_limit)),
            Err(ServiceError::ImageTooLarge)
        );
    }

    #[test]
    fn test_prefix_is_stripped_before_decoding() {
        let validated = validate_image(Some("data:image/png;base64,AAAA")).unwrap();
        assert_eq!(validated.subtype.as_deref(), Some("png"));
        assert_eq!(validated.byte_len, 3);
    }

    #[test]
    fn test_unpadded_input_is_accepted() {
        assert_eq!(validate_image(Some("AAA")).map(|v| v.byte_len), Ok(2));
    }

    #[rstest]
    #[case("AAAA\nAAAA", 6)]
    #[case("AAAA\r\nAA==", 4)]
    #[case(" AAAA\t", 3)]
    #[case("-_-_", 3)]
    #[case("data:image/png;base64,AAAA\nAA-_", 6)]
    fn test_wrapped_and_url_safe_input_is_accepted(#[case] input: &str, #[case] byte_len: usize) {
        assert_eq!(validate_image(Some(input)).map(|v| v.byte_len), Ok(byte_len));
    }

    #[test]
    fn test_image_payload_from_json() {
        use serde_json::json;

        assert_eq!(
            ImagePayload::from_json(&json!({ "image_base64": "AAAA", "query": 1 })),
            Ok(ImagePayload {
                image_base64: Some("AAAA".to_string())
            })
        );
        assert_eq!(
            ImagePayload::from_json(&json!({ "image_base64": null })),
            Ok(ImagePayload::default())
        );
        assert_eq!(ImagePayload::from_json(&json!([1, 2])), Ok(ImagePayload::default()));
        assert_eq!(
            ImagePayload::from_json(&json!({ "image_base64": 5 })),
            Err(ServiceError::ValidationFailed)
        );
    }

    #[test]
    fn test_validation_is_idempotent() {
        let input = Some("data:image/gif;base64,R0lGODlh");
        assert_eq!(validate_image(input), validate_image(input));
    }

    #[rstest]
    #[case("data:image/png;base64,AAAA", Some("png"), "AAAA")]
    #[case("data:image/jpeg;base64,", Some("jpeg"), "")]
    #[case("data:image/svg+xml;base64,AAAA", None, "data:image/svg+xml;base64,AAAA")]
    #[case("data:image/;base64,AAAA", None, "data:image/;base64,AAAA")]
    #[case("data:image/png,AAAA", None, "data:image/png,AAAA")]
    #[case("AAAA", None, "AAAA")]
    fn test_embedded_image_parse(
        #[case] input: &str,
        #[case] subtype: Option<&str>,
        #[case] payload: &str,
    ) {
        assert_eq!(EmbeddedImage::parse(input), EmbeddedImage { subtype, payload });
    }

    #[test]
    fn test_data_uri_keeps_subtype() {
        assert_eq!(
            EmbeddedImage::parse("data:image/png;base64,AAAA").to_data_uri(),
            "data:image/png;base64,AAAA"
        );
        assert_eq!(
            EmbeddedImage::parse("AAAA").to_data_uri(),
            "data:image/jpeg;base64,AAAA"
        );
        assert_eq!(
            EmbeddedImage::parse("data:image/png;base64,AA\nA-").to_data_uri(),
            "data:image/png;base64,AAA+"
        );
    }
}
