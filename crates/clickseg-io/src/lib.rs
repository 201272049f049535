//! clickseg-io: Browser I/O for segmentation results.
//!
//! Wraps encoded cut-outs and masks in `Blob`s, hands out object URLs
//! for `<img src>`, and triggers "save as" downloads. Everything here
//! needs a browser environment (`wasm32-unknown-unknown` target); the
//! encoding itself lives in `clickseg-export`.

pub mod download;
pub mod raster;

pub use download::{DownloadError, download_image, download_mask, trigger_download};
pub use raster::{
    RasterError, encoded_to_blob, image_to_blob, image_to_blob_url, mask_to_blob_url, revoke_blob_url,
};
