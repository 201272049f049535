//! File download via Blob URLs.
//!
//! Browsers have no direct "save file" call from wasm. Downloads are
//! triggered by creating a `Blob`, generating an object URL, and
//! programmatically clicking a temporary `<a download>` element.

use clickseg_core::compositor::mask_to_image;
use clickseg_core::{Mask, RgbaImage};
use clickseg_export::{DEFAULT_FILENAME, EncodedImage, ImageFormat};
use wasm_bindgen::{JsCast, JsValue};

use crate::raster::{RasterError, encoded_to_blob};

/// Errors that can occur when triggering a file download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Encoding or wrapping the image failed.
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for DownloadError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

impl From<clickseg_export::EncodeError> for DownloadError {
    fn from(err: clickseg_export::EncodeError) -> Self {
        Self::Raster(err.into())
    }
}

/// Save `image` as a file named `filename` (default
/// `segmented-image.png`).
///
/// The format follows the file name's extension and falls back to PNG.
///
/// # Errors
///
/// Returns [`DownloadError::Raster`] if encoding fails and
/// [`DownloadError::JsError`] if a browser API call fails.
pub fn download_image(
    image: &RgbaImage,
    filename: Option<&str>,
    quality: Option<f32>,
) -> Result<(), DownloadError> {
    let filename = filename.unwrap_or(DEFAULT_FILENAME);
    let format = ImageFormat::from_filename(filename).unwrap_or_default();
    let encoded = clickseg_export::encode(image, format, quality)?;
    trigger_download(&encoded, filename)
}

/// Save a mask as a PNG at its own resolution.
///
/// # Errors
///
/// See [`download_image`].
pub fn download_mask(mask: &Mask, filename: &str) -> Result<(), DownloadError> {
    download_image(&mask_to_image(mask), Some(filename), None)
}

/// Trigger a download of already-encoded bytes.
///
/// The object URL is revoked after the click.
///
/// # Errors
///
/// Returns [`DownloadError::JsError`] if any browser API call fails
/// (`Blob` creation, `URL.createObjectURL`, element creation).
pub fn trigger_download(encoded: &EncodedImage, filename: &str) -> Result<(), DownloadError> {
    let window =
        web_sys::window().ok_or_else(|| DownloadError::JsError("no global window".into()))?;
    let document = window
        .document()
        .ok_or_else(|| DownloadError::JsError("no document".into()))?;

    let blob = encoded_to_blob(encoded)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor: web_sys::HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|e| DownloadError::JsError(format!("failed to cast element: {e:?}")))?;
    anchor.set_href(&url);
    anchor.set_download(filename);

    let body = document
        .body()
        .ok_or_else(|| DownloadError::JsError("no document body".into()))?;
    body.append_child(&anchor)?;
    anchor.click();
    tracing::debug!(filename, bytes = encoded.bytes.len(), mime = encoded.mime_type(), "download triggered");

    // The download has started; cleanup failures are not download failures.
    let _ = body.remove_child(&anchor);
    let _ = web_sys::Url::revoke_object_url(&url);

    Ok(())
}
