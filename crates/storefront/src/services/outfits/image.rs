//! Try-on source image handling: data-URI stripping, decoding and size limits.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

/// Largest accepted decoded image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const DEFAULT_MIME_TYPE: &str = "image/png";

/// Standard alphabet, padding optional.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Rejected source images.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("Provided image is empty or invalid")]
    Empty,

    #[error("Image exceeds the 5MB upload limit")]
    TooLarge { bytes: usize },
}

/// A user-supplied image, as base64 with its declared mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageUpload<'a> {
    mime_type: &'a str,
    base64: &'a str,
}

impl<'a> ImageUpload<'a> {
    /// Split an optional `data:<mime>;base64,` prefix off `input`.
    ///
    /// Input without a well-formed prefix is taken as raw base64 of a PNG.
    #[must_use]
    pub fn parse(input: &'a str) -> Self {
        strip_data_uri(input).unwrap_or(Self {
            mime_type: DEFAULT_MIME_TYPE,
            base64: input,
        })
    }

    /// Declared mime type.
    #[must_use]
    pub const fn mime_type(&self) -> &'a str {
        self.mime_type
    }

    /// Base64 payload without any data-URI prefix.
    #[must_use]
    pub const fn base64(&self) -> &'a str {
        self.base64
    }

    /// Decode the payload and enforce [`MAX_IMAGE_BYTES`].
    ///
    /// # Errors
    ///
    /// Returns `ImageError::Empty` if the payload is not valid base64 or decodes
    /// to nothing, and `ImageError::TooLarge` above the limit.
    pub fn decode(&self) -> Result<Vec<u8>, ImageError> {
        let bytes = LENIENT_STANDARD
            .decode(self.base64.trim())
            .map_err(|_| ImageError::Empty)?;

        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge { bytes: bytes.len() });
        }
        Ok(bytes)
    }
}

fn strip_data_uri(input: &str) -> Option<ImageUpload<'_>> {
    let rest = input.strip_prefix("data:")?;
    let (mime_type, base64) = rest.split_once(";base64,")?;

    let subtype = mime_type.strip_prefix("image/")?;
    if subtype.is_empty() || mime_type.contains(';') || base64.is_empty() {
        return None;
    }

    Some(ImageUpload { mime_type, base64 })
}
