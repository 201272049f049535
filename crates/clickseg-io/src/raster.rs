//! Raster → `Blob` and Blob URL conversion.
//!
//! Encodes images with `clickseg-export` and wraps the bytes in a
//! `Blob` carrying the matching MIME type. Object URLs handed out here
//! must be released with [`revoke_blob_url`].

use clickseg_core::compositor::mask_to_image;
use clickseg_core::{Mask, RgbaImage};
use clickseg_export::{EncodeError, EncodedImage, ImageFormat};
use wasm_bindgen::JsValue;
use web_sys::BlobPropertyBag;

/// Errors that can occur during raster-to-Blob conversion.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// Encoding the image failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for RasterError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// Wrap already-encoded bytes in a `Blob` of their MIME type.
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if `Blob` construction fails.
pub fn encoded_to_blob(encoded: &EncodedImage) -> Result<web_sys::Blob, RasterError> {
    let bytes = js_sys::Uint8Array::from(encoded.bytes.as_slice());
    let parts = js_sys::Array::new();
    parts.push(&bytes);

    let opts = BlobPropertyBag::new();
    opts.set_type(encoded.mime_type());
    Ok(web_sys::Blob::new_with_u8_array_sequence_and_options(
        &parts, &opts,
    )?)
}

/// Encode `image` and return it as a `Blob`.
///
/// This is the `canvas.toBlob(type, quality)` equivalent: `quality`
/// (`0.0..=1.0`) only affects JPEG.
///
/// # Errors
///
/// Returns [`RasterError::Encode`] if encoding fails and
/// [`RasterError::JsError`] if `Blob` construction fails.
pub fn image_to_blob(
    image: &RgbaImage,
    format: ImageFormat,
    quality: Option<f32>,
) -> Result<web_sys::Blob, RasterError> {
    let encoded = clickseg_export::encode(image, format, quality)?;
    encoded_to_blob(&encoded)
}

/// Encode `image` as a Blob URL for use as an `<img src>`.
///
/// # Errors
///
/// See [`image_to_blob`]; URL creation failures are
/// [`RasterError::JsError`].
pub fn image_to_blob_url(
    image: &RgbaImage,
    format: ImageFormat,
    quality: Option<f32>,
) -> Result<String, RasterError> {
    let blob = image_to_blob(image, format, quality)?;
    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// PNG Blob URL of a mask at its own resolution.
///
/// # Errors
///
/// See [`image_to_blob_url`].
pub fn mask_to_blob_url(mask: &Mask) -> Result<String, RasterError> {
    image_to_blob_url(&mask_to_image(mask), ImageFormat::Png, None)
}

/// Revoke a Blob URL previously created by this module.
///
/// Best-effort: the URL may already be revoked.
pub fn revoke_blob_url(url: &str) {
    let _ = web_sys::Url::revoke_object_url(url);
}
