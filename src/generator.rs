//! Text to image in one call.
//!
//! [`generate`] composes [`bitraster::encode`](crate::bitraster::encode)
//! and [`render::render`](crate::render::render) under a set of
//! [`EncodeOptions`].

use crate::bitraster::{self, BitMatrix};
use crate::error::{check_dimensions, Error, Result};
use crate::render::{self, RasterImage};

use serde::{Deserialize, Serialize};

/// Error correction level tag.
///
/// Accepted for compatibility with QR-style option sets; the bit raster
/// carries no redundancy, so the level has no effect on the output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrectionLevel {
    Low,
    Medium,
    Quartile,
    #[default]
    High,
}

/// Requested output encoding. Also inert: every image is a PNG-encodable
/// grayscale raster.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
}

/// What to do when the payload does not fit the grid.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Fail with [`Error::PayloadTooLarge`].
    #[default]
    Reject,
    /// Drop whatever does not fit.
    Truncate,
}

/// Options for [`generate`]. Only `width`, `height` and `overflow` change
/// the output.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub width: u32,
    pub height: u32,
    pub error_correction: ErrorCorrectionLevel,
    pub output_format: OutputFormat,
    pub overflow: OverflowPolicy,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            error_correction: ErrorCorrectionLevel::High,
            output_format: OutputFormat::Png,
            overflow: OverflowPolicy::Reject,
        }
    }
}

impl EncodeOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        check_dimensions(self.width, self.height)
    }

    pub fn capacity_bits(&self) -> usize {
        bitraster::capacity_bits(self.width, self.height)
    }
}

/// Lays `text` into a matrix according to `options`.
pub fn encode_matrix(text: &str, options: &EncodeOptions) -> Result<BitMatrix> {
    options.validate()?;
    match options.overflow {
        OverflowPolicy::Reject => bitraster::encode_checked(text, options.width, options.height),
        OverflowPolicy::Truncate => bitraster::encode(text, options.width, options.height),
    }
}

/// Encodes `text` and renders it to an image.
///
/// `text` is not validated: the empty string yields an all-white image.
/// Rejecting blank input is up to the caller.
pub fn generate(text: &str, options: &EncodeOptions) -> Result<RasterImage> {
    let matrix = encode_matrix(text, options)?;
    log::debug!(
        "encoded {} bytes into {}x{} raster ({} cells set)",
        text.len(),
        options.width,
        options.height,
        matrix.count_ones()
    );
    render::render(&matrix, options.width, options.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_empty_is_white() {
        let img = generate("", &EncodeOptions::new(16, 4)).unwrap();
        assert_eq!((img.width(), img.height()), (16, 4));
        assert_eq!(img.black_pixels(), 0);
    }

    #[test]
    fn test_generate_matches_bit_count() {
        // 'H' has 2 set bits, 'i' has 4.
        let img = generate("Hi", &EncodeOptions::new(8, 2)).unwrap();
        assert_eq!(img.black_pixels(), 6);
    }

    #[test]
    fn test_zero_dimensions_rejected_before_encoding() {
        let err = generate("x", &EncodeOptions::new(0, 10)).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { width: 0, height: 10 }));
    }

    #[test]
    fn test_overflow_policies() {
        let reject = EncodeOptions::new(4, 2);
        assert!(matches!(
            generate("abc", &reject),
            Err(Error::PayloadTooLarge { bits: 24, capacity: 8 })
        ));

        let truncate = reject.with_overflow(OverflowPolicy::Truncate);
        let img = generate("abc", &truncate).unwrap();
        let only_a = generate("a", &reject).unwrap();
        assert_eq!(img, only_a);
    }

    #[test]
    fn test_inert_tags_do_not_change_output() {
        let mut low = EncodeOptions::new(8, 2);
        low.error_correction = ErrorCorrectionLevel::Low;
        let high = EncodeOptions::new(8, 2);
        assert_eq!(generate("Hi", &low).unwrap(), generate("Hi", &high).unwrap());
    }

    #[test]
    fn test_options_from_json() {
        let options = EncodeOptions::from_json_str(
            r#"{"width": 32, "height": 8, "error_correction": "quartile", "overflow": "truncate"}"#,
        )
        .unwrap();
        assert_eq!(options.width, 32);
        assert_eq!(options.height, 8);
        assert_eq!(options.error_correction, ErrorCorrectionLevel::Quartile);
        assert_eq!(options.output_format, OutputFormat::Png);
        assert_eq!(options.overflow, OverflowPolicy::Truncate);

        assert!(matches!(
            EncodeOptions::from_json_str(r#"{"width": 0}"#),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            EncodeOptions::from_json_str("not json"),
            Err(Error::Config(_))
        ));
    }
}
