//! Image types and conversions between ndarray grids and image crate buffers.
//!
//! # Coordinate System Conversions
//!
//! - **ndarray**: matrix indexing [row, col] = [y, x] with (height, width) dimensions
//! - **image crate**: graphics indexing (x, y) with (width, height) dimensions
//!
//! Both `IntensityImage` and `BinaryMask` are immutable once built: every
//! processing step produces a new value instead of editing one in place.

use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView2};

/// Canonical 8-bit single-channel micrograph.
///
/// Produced once per source image by the normalizer and shared read-only by
/// every threshold method afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityImage {
    pixels: Array2<u8>,
}

impl IntensityImage {
    /// Wrap an existing (height, width) array.
    pub fn new(pixels: Array2<u8>) -> Self {
        Self { pixels }
    }

    /// Build from row-major samples.
    ///
    /// Returns `None` when `data.len() != width * height`.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        Array2::from_shape_vec((height, width), data)
            .ok()
            .map(Self::new)
    }

    /// Uniform image of a single intensity.
    pub fn from_elem(width: usize, height: usize, value: u8) -> Self {
        Self::new(Array2::from_elem((height, width), value))
    }

    pub fn view(&self) -> ArrayView2<'_, u8> {
        self.pixels.view()
    }

    pub fn pixels(&self) -> &Array2<u8> {
        &self.pixels
    }

    /// (height, width), matching ndarray's convention.
    pub fn dim(&self) -> (usize, usize) {
        self.pixels.dim()
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    /// Total number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Smallest and largest sample, or `None` for an empty image.
    pub fn min_max(&self) -> Option<(u8, u8)> {
        let mut iter = self.pixels.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    pub fn to_gray_image(&self) -> GrayImage {
        array2_to_gray_image(&self.pixels)
    }

    /// Linear stretch of [min, max] onto [0, 255] for display.
    ///
    /// Uniform images are returned unchanged.
    pub fn stretched(&self) -> IntensityImage {
        let Some((lo, hi)) = self.min_max() else {
            return self.clone();
        };
        if hi == lo {
            return self.clone();
        }
        let span = (hi - lo) as f32;
        Self::new(
            self.pixels
                .mapv(|v| (((v - lo) as f32 * 255.0) / span).round() as u8),
        )
    }

    pub fn into_inner(self) -> Array2<u8> {
        self.pixels
    }
}

/// Boolean segmentation mask, dimension-matched to its source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    pixels: Array2<bool>,
}

impl BinaryMask {
    pub fn new(pixels: Array2<bool>) -> Self {
        Self { pixels }
    }

    /// Build from row-major flags; `None` on a length mismatch.
    pub fn from_raw(width: usize, height: usize, data: Vec<bool>) -> Option<Self> {
        Array2::from_shape_vec((height, width), data)
            .ok()
            .map(Self::new)
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.pixels.view()
    }

    pub fn pixels(&self) -> &Array2<bool> {
        &self.pixels
    }

    pub fn dim(&self) -> (usize, usize) {
        self.pixels.dim()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Number of foreground (true) pixels.
    pub fn count_foreground(&self) -> usize {
        self.pixels.iter().filter(|&&v| v).count()
    }

    /// 0/255 rendering used for mask files and panel cells.
    pub fn to_u8(&self) -> Array2<u8> {
        self.pixels.mapv(|v| if v { 255 } else { 0 })
    }

    pub fn to_gray_image(&self) -> GrayImage {
        array2_to_gray_image(&self.to_u8())
    }

    pub fn into_inner(self) -> Array2<bool> {
        self.pixels
    }
}

/// Convert ndarray `Array2<u8>` to an image crate `GrayImage`.
///
/// Array index [row, col] maps to image pixel (col, row).
pub fn array2_to_gray_image(arr: &Array2<u8>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut img = GrayImage::new(width as u32, height as u32);

    for ((y, x), &value) in arr.indexed_iter() {
        img.put_pixel(x as u32, y as u32, Luma([value]));
    }

    img
}

/// Convert an image crate `GrayImage` into a (height, width) array.
pub fn gray_image_to_array2(img: &GrayImage) -> Array2<u8> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        img.get_pixel(x as u32, y as u32)[0]
    })
}
