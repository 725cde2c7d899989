//! Micrograph file I/O.
//!
//! Decoding goes through the image crate and stops at a [`RawRaster`], so the
//! bit-depth and color handling lives in one place (`normalize`). Outputs are
//! always 8-bit grayscale; the format is picked from the file extension.
//!
//! # Supported Inputs
//!
//! - 8/16-bit grayscale (PNG, TIFF, BMP, JPEG)
//! - 8/16-bit RGB
//!
//! Rasters with an alpha channel or floating-point samples are rejected with
//! a [`DecodeError`] rather than silently flattened.

use image::DynamicImage;
use ndarray::Array2;
use std::path::Path;

use super::image::{array2_to_gray_image, IntensityImage};
use super::normalize::{normalize, DecodeError, RasterSamples, RawRaster};

/// Decode an image file into a [`RawRaster`] without altering its samples.
pub fn decode_raster<P: AsRef<Path>>(path: P) -> Result<RawRaster, DecodeError> {
    let image = image::open(path.as_ref())?;
    dynamic_to_raster(image)
}

/// Decode and normalize in one step.
pub fn load_intensity_image<P: AsRef<Path>>(path: P) -> Result<IntensityImage, DecodeError> {
    normalize(&decode_raster(path)?)
}

/// Map an image crate buffer onto a [`RawRaster`].
pub fn dynamic_to_raster(image: DynamicImage) -> Result<RawRaster, DecodeError> {
    let width = image.width() as usize;
    let height = image.height() as usize;

    let raster = match image {
        DynamicImage::ImageLuma8(buf) => {
            RawRaster::new(width, height, 1, RasterSamples::U8(buf.into_raw()))
        }
        DynamicImage::ImageLuma16(buf) => {
            RawRaster::new(width, height, 1, RasterSamples::U16(buf.into_raw()))
        }
        DynamicImage::ImageRgb8(buf) => {
            RawRaster::new(width, height, 3, RasterSamples::U8(buf.into_raw()))
        }
        DynamicImage::ImageRgb16(buf) => {
            RawRaster::new(width, height, 3, RasterSamples::U16(buf.into_raw()))
        }
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            return Err(DecodeError::UnsupportedChannels(2))
        }
        DynamicImage::ImageRgba8(_) | DynamicImage::ImageRgba16(_) => {
            return Err(DecodeError::UnsupportedChannels(4))
        }
        other => {
            return Err(DecodeError::UnsupportedLayout(format!(
                "{:?}",
                other.color()
            )))
        }
    };

    Ok(raster)
}

/// Save an 8-bit grayscale array to a standard image format.
///
/// File format is determined from the extension.
pub fn save_u8_image<P: AsRef<Path>>(image: &Array2<u8>, path: P) -> image::ImageResult<()> {
    array2_to_gray_image(image).save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_luma16_kept_at_full_depth() {
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(2, 1, vec![100u16, 4000]).unwrap();
        let raster = dynamic_to_raster(DynamicImage::ImageLuma16(buf)).unwrap();
        assert_eq!(raster.channels, 1);
        assert_eq!(raster.samples, RasterSamples::U16(vec![100, 4000]));
    }

    #[test]
    fn test_rgb8_maps_to_three_channels() {
        let mut buf = RgbImage::new(1, 1);
        buf.put_pixel(0, 0, Rgb([1, 2, 3]));
        let raster = dynamic_to_raster(DynamicImage::ImageRgb8(buf)).unwrap();
        assert_eq!(raster.channels, 3);
        assert_eq!(raster.samples, RasterSamples::U8(vec![1, 2, 3]));
    }

    #[test]
    fn test_rgba_rejected() {
        let mut buf = RgbaImage::new(1, 1);
        buf.put_pixel(0, 0, Rgba([1, 2, 3, 255]));
        assert!(matches!(
            dynamic_to_raster(DynamicImage::ImageRgba8(buf)),
            Err(DecodeError::UnsupportedChannels(4))
        ));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");

        let arr = Array2::from_shape_vec((2, 2), vec![0u8, 255, 255, 0]).unwrap();
        save_u8_image(&arr, &path).unwrap();

        let loaded = load_intensity_image(&path).unwrap();
        assert_eq!(loaded.pixels(), &arr);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = decode_raster(dir.path().join("missing.png"));
        assert!(result.is_err());
    }

    #[test]
    fn test_gray_image_helper_matches_array() {
        let img: GrayImage = ImageBuffer::from_raw(2, 1, vec![7u8, 9]).unwrap();
        let raster = dynamic_to_raster(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(raster.samples, RasterSamples::U8(vec![7, 9]));
    }
}
