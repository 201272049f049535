//! Image sources accepted by [`Segmenter::load_image`](crate::Segmenter::load_image).

use image::DynamicImage;

use crate::types::{Dimensions, RgbaImage, SegmenterError};

/// Where a new image epoch's bitmap comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded bytes in any format the `image` crate was built with
    /// (PNG, JPEG, BMP, WebP).
    Bytes(Vec<u8>),
    /// An already decoded RGBA raster.
    Rgba(RgbaImage),
    /// An already decoded image of any pixel layout.
    Dynamic(DynamicImage),
}

impl ImageSource {
    /// Decode into the RGBA raster that becomes the epoch's image.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::EmptyImage`] for empty bytes or a
    /// zero-sized image, and [`SegmenterError::ImageDecode`] if the
    /// format is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<RgbaImage, SegmenterError> {
        let rgba = match self {
            Self::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(SegmenterError::EmptyImage);
                }
                image::load_from_memory(&bytes)?.into_rgba8()
            }
            Self::Rgba(rgba) => rgba,
            Self::Dynamic(dynamic) => dynamic.into_rgba8(),
        };
        if Dimensions::of(&rgba).is_empty() {
            return Err(SegmenterError::EmptyImage);
        }
        Ok(rgba)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<RgbaImage> for ImageSource {
    fn from(rgba: RgbaImage) -> Self {
        Self::Rgba(rgba)
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(dynamic: DynamicImage) -> Self {
        Self::Dynamic(dynamic)
    }
}
