//! Raster → encoded byte stream.
//!
//! The browser equivalent is `canvas.toBlob(type, quality)`: PNG by
//! default, JPEG with a `0.0..=1.0` quality, WebP. The bytes produced
//! here can be wrapped in a `Blob` or written to disk unchanged.

use std::fmt;
use std::str::FromStr;

use image::{ExtendedColorType, ImageEncoder, RgbaImage};

/// JPEG quality used when none is given (the browser default, 0.92).
pub const DEFAULT_JPEG_QUALITY: f32 = 0.92;

/// Default file name for a downloaded cut-out.
pub const DEFAULT_FILENAME: &str = "segmented-image.png";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Lossless, keeps transparency.
    #[default]
    Png,
    /// Lossy, no transparency (alpha is dropped).
    Jpeg,
    /// Lossless WebP, keeps transparency.
    WebP,
}

impl ImageFormat {
    /// MIME type, e.g. `image/png`.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Conventional file extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Look up a format by MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Guess a format from a file name's extension.
    #[must_use]
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for ImageFormat {
    type Err = EncodeError;

    /// Accepts an extension (`png`, `jpg`, `jpeg`, `webp`) or a MIME type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            other => Self::from_mime(other).ok_or_else(|| EncodeError::UnknownFormat(s.to_string())),
        }
    }
}

/// An encoded image and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Encoded file contents.
    pub bytes: Vec<u8>,
    /// Format of `bytes`.
    pub format: ImageFormat,
}

impl EncodedImage {
    /// MIME type of the bytes.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Errors from [`encode`].
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The image has no pixels.
    #[error("cannot encode an empty {width}x{height} image")]
    EmptyImage {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// Quality outside `0.0..=1.0` (or NaN).
    #[error("quality must be within 0..=1, got {0}")]
    Quality(f32),

    /// Unrecognized format name.
    #[error("unknown image format: {0:?}")]
    UnknownFormat(String),

    /// The encoder failed.
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Encode `image` in `format`.
///
/// `quality` (`0.0..=1.0`) applies to JPEG only and defaults to
/// [`DEFAULT_JPEG_QUALITY`]; it is ignored for the lossless formats.
///
/// # Errors
///
/// Returns [`EncodeError::EmptyImage`] for a zero-sized image,
/// [`EncodeError::Quality`] for an out-of-range quality, and
/// [`EncodeError::Image`] if the encoder fails.
pub fn encode(
    image: &RgbaImage,
    format: ImageFormat,
    quality: Option<f32>,
) -> Result<EncodedImage, EncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyImage { width, height });
    }
    if let Some(q) = quality
        && !(0.0..=1.0).contains(&q)
    {
        return Err(EncodeError::Quality(q));
    }

    let mut bytes = Vec::new();
    match format {
        ImageFormat::Png => {
            let encoder = image::codecs::png::PngEncoder::new(&mut bytes);
            encoder.write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)?;
        }
        ImageFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).into_rgb8();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut bytes,
                jpeg_quality(quality.unwrap_or(DEFAULT_JPEG_QUALITY)),
            );
            encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)?;
        }
        ImageFormat::WebP => {
            let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut bytes);
            encoder.write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)?;
        }
    }
    Ok(EncodedImage { bytes, format })
}

/// Encode as PNG.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, EncodeError> {
    encode(image, ImageFormat::Png, None).map(|encoded| encoded.bytes)
}

/// Map `0.0..=1.0` onto the JPEG encoder's `1..=100` scale.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use image::Rgba;

    use super::*;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 0])
            }
        })
    }

    #[test]
    fn png_preserves_pixels() {
        let img = checker(7, 5);
        let encoded = encode(&img, ImageFormat::Png, None).unwrap();
        assert_eq!(encoded.mime_type(), "image/png");
        assert_eq!(&encoded.bytes[1..4], b"PNG");
        let decoded = image::load_from_memory(&encoded.bytes).unwrap().into_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn jpeg_drops_alpha_and_keeps_size() {
        let img = checker(16, 8);
        let encoded = encode(&img, ImageFormat::Jpeg, Some(0.5)).unwrap();
        assert_eq!(encoded.mime_type(), "image/jpeg");
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn webp_is_lossless() {
        let img = RgbaImage::from_fn(6, 6, |x, y| Rgba([x as u8 * 40, y as u8 * 40, 90, 128 + x as u8]));
        let encoded = encode(&img, ImageFormat::WebP, Some(0.1)).unwrap();
        assert_eq!(&encoded.bytes[..4], b"RIFF");
        let decoded = image::load_from_memory(&encoded.bytes).unwrap().into_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn empty_image_is_rejected() {
        let result = encode(&RgbaImage::new(0, 3), ImageFormat::Png, None);
        assert!(matches!(result, Err(EncodeError::EmptyImage { width: 0, height: 3 })));
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let result = encode(&checker(2, 2), ImageFormat::Jpeg, Some(1.5));
        assert!(matches!(result, Err(EncodeError::Quality(_))));
    }

    #[test]
    fn jpeg_quality_maps_to_percent() {
        assert_eq!(jpeg_quality(0.92), 92);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(1.0), 100);
    }

    #[test]
    fn formats_parse_from_names_and_mime_types() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("image/webp".parse::<ImageFormat>().unwrap(), ImageFormat::WebP);
        assert!("gif".parse::<ImageFormat>().is_err());
        assert_eq!(ImageFormat::from_filename("cut.out.jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_filename("noext"), None);
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }
}
