//! Reduction of decoded rasters to canonical 8-bit intensity images.
//!
//! Source micrographs arrive as 8- or 16-bit grayscale or RGB files. Every
//! threshold method works on the same 8-bit single-channel grid, so this is
//! the one place where color and bit depth are dealt with.

use ndarray::Array2;
use thiserror::Error;

use super::image::IntensityImage;

/// ITU-R BT.601 luma weights (R, G, B).
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Errors raised while interpreting a decoded raster.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Only single-channel and three-channel rasters are supported.
    #[error("unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(u8),

    /// Sample buffer does not match the declared geometry.
    #[error("sample buffer holds {actual} values, expected {expected} ({width}x{height}x{channels})")]
    BufferLength {
        expected: usize,
        actual: usize,
        width: usize,
        height: usize,
        channels: u8,
    },

    /// Pixel layout the decoder cannot map onto a raster.
    #[error("unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    /// Underlying image decoder failure.
    #[error("image decoder failed: {0}")]
    Image(#[from] image::ImageError),

    /// File could not be read.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Interleaved integer samples of a decoded raster.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterSamples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl RasterSamples {
    pub fn len(&self) -> usize {
        match self {
            RasterSamples::U8(v) => v.len(),
            RasterSamples::U16(v) => v.len(),
            RasterSamples::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bits per sample of the storage type.
    pub fn bit_depth(&self) -> u8 {
        match self {
            RasterSamples::U8(_) => 8,
            RasterSamples::U16(_) => 16,
            RasterSamples::U32(_) => 32,
        }
    }

    fn to_u32(&self) -> Vec<u32> {
        match self {
            RasterSamples::U8(v) => v.iter().map(|&x| x as u32).collect(),
            RasterSamples::U16(v) => v.iter().map(|&x| x as u32).collect(),
            RasterSamples::U32(v) => v.clone(),
        }
    }
}

/// A decoded raster prior to normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRaster {
    pub width: usize,
    pub height: usize,
    pub channels: u8,
    pub samples: RasterSamples,
}

impl RawRaster {
    pub fn new(width: usize, height: usize, channels: u8, samples: RasterSamples) -> Self {
        Self {
            width,
            height,
            channels,
            samples,
        }
    }

    /// Single-channel 8-bit raster.
    pub fn gray8(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::new(width, height, 1, RasterSamples::U8(data))
    }

    /// Single-channel 16-bit raster.
    pub fn gray16(width: usize, height: usize, data: Vec<u16>) -> Self {
        Self::new(width, height, 1, RasterSamples::U16(data))
    }
}

/// Convert a decoded raster into an `IntensityImage`.
///
/// - 3 channels are reduced to luma (BT.601 weights, rounded).
/// - Depths above 8 bits are rescaled by the observed maximum,
///   `round(v * 255 / max)`; a maximum of 0 is treated as 1.
/// - 8-bit single-channel input passes through unchanged.
///
/// # Errors
/// [`DecodeError::UnsupportedChannels`] for anything but 1 or 3 channels and
/// [`DecodeError::BufferLength`] when the samples do not fill the geometry.
pub fn normalize(raster: &RawRaster) -> Result<IntensityImage, DecodeError> {
    let (width, height, channels) = (raster.width, raster.height, raster.channels);
    let samples = &raster.samples;

    if channels != 1 && channels != 3 {
        return Err(DecodeError::UnsupportedChannels(channels));
    }

    let expected = width * height * channels as usize;
    if samples.len() != expected {
        return Err(DecodeError::BufferLength {
            expected,
            actual: samples.len(),
            width,
            height,
            channels,
        });
    }

    if let (1, RasterSamples::U8(data)) = (channels, samples) {
        return Ok(IntensityImage::new(Array2::from_shape_vec(
            (height, width),
            data.clone(),
        )
        .map_err(|e| DecodeError::UnsupportedLayout(e.to_string()))?));
    }

    let values = samples.to_u32();
    let gray: Vec<u32> = if channels == 3 {
        values
            .chunks_exact(3)
            .map(|px| {
                let luma = LUMA_WEIGHTS[0] * px[0] as f64
                    + LUMA_WEIGHTS[1] * px[1] as f64
                    + LUMA_WEIGHTS[2] * px[2] as f64;
                luma.round() as u32
            })
            .collect()
    } else {
        values
    };

    let pixels: Vec<u8> = if samples.bit_depth() > 8 {
        let max_value = gray.iter().copied().max().unwrap_or(0).max(1) as f64;
        gray.iter()
            .map(|&v| ((v as f64 * 255.0) / max_value).round().min(255.0) as u8)
            .collect()
    } else {
        gray.iter().map(|&v| v.min(255) as u8).collect()
    };

    Array2::from_shape_vec((height, width), pixels)
        .map(IntensityImage::new)
        .map_err(|e| DecodeError::UnsupportedLayout(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray8_passes_through() {
        let data = vec![0u8, 17, 128, 255];
        let image = normalize(&RawRaster::gray8(2, 2, data.clone())).unwrap();
        assert_eq!(image.pixels().as_slice().unwrap(), data.as_slice());
    }

    #[test]
    fn test_gray16_rescaled_by_observed_max() {
        let raster = RawRaster::gray16(4, 1, vec![0, 250, 500, 1000]);
        let image = normalize(&raster).unwrap();
        // 250/1000 * 255 = 63.75 -> 64; 500/1000 * 255 = 127.5 -> 128
        assert_eq!(image.pixels().as_slice().unwrap(), &[0, 64, 128, 255]);
    }

    #[test]
    fn test_gray16_all_zero_does_not_divide_by_zero() {
        let image = normalize(&RawRaster::gray16(3, 3, vec![0; 9])).unwrap();
        assert!(image.pixels().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_rgb8_uses_luma_weights() {
        let raster = RawRaster::new(
            3,
            1,
            3,
            RasterSamples::U8(vec![255, 0, 0, 0, 255, 0, 0, 0, 255]),
        );
        let image = normalize(&raster).unwrap();
        // 0.299 * 255 = 76.2, 0.587 * 255 = 149.7, 0.114 * 255 = 29.1
        assert_eq!(image.pixels().as_slice().unwrap(), &[76, 150, 29]);
    }

    #[test]
    fn test_rgb_gray_pixels_keep_their_value() {
        let raster = RawRaster::new(2, 1, 3, RasterSamples::U8(vec![90, 90, 90, 200, 200, 200]));
        let image = normalize(&raster).unwrap();
        assert_eq!(image.pixels().as_slice().unwrap(), &[90, 200]);
    }

    #[test]
    fn test_rgb16_reduced_then_rescaled() {
        let raster = RawRaster::new(
            2,
            1,
            3,
            RasterSamples::U16(vec![1000, 1000, 1000, 4000, 4000, 4000]),
        );
        let image = normalize(&raster).unwrap();
        // 1000/4000 * 255 = 63.75 -> 64
        assert_eq!(image.pixels().as_slice().unwrap(), &[64, 255]);
    }

    #[test]
    fn test_unsupported_channels_rejected() {
        let raster = RawRaster::new(1, 1, 4, RasterSamples::U8(vec![1, 2, 3, 4]));
        assert!(matches!(
            normalize(&raster),
            Err(DecodeError::UnsupportedChannels(4))
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let raster = RawRaster::gray8(3, 3, vec![0; 8]);
        assert!(matches!(
            normalize(&raster),
            Err(DecodeError::BufferLength {
                expected: 9,
                actual: 8,
                ..
            })
        ));
    }
}
