//! Image processing pipeline for threshold comparison on micrographs.
//!
//! # Module Organization
//!
//! ## Image Types
//! - **image**: `IntensityImage` and `BinaryMask` plus conversions to the image crate
//! - **normalize**: reduction of decoded rasters to 8-bit single-channel intensity
//! - **io**: decoding source files and saving 8-bit grayscale outputs
//!
//! ## Enhancement
//! - **contrast**: pluggable contrast enhancers (CLAHE)
//!
//! ## Segmentation
//! - **detection**: histogram and local-window threshold estimators,
//!   connected component labeling
//! - **mask**: threshold application and speckle removal
//! - **regions**: porosity and component counts per mask
//!
//! ## Testing
//! - **test_patterns**: synthetic images for validating the pipeline

pub mod contrast;
pub mod detection;
pub mod image;
pub mod io;
pub mod mask;
pub mod normalize;
pub mod regions;
pub mod test_patterns;

pub use contrast::{Clahe, ContrastEnhancer};
pub use detection::{
    connected_components, local_mean_std, niblack_threshold, otsu_threshold,
    sauvola_threshold, triangle_threshold, yen_threshold, Connectivity, Histogram,
    SegmentationError,
};
pub use image::{array2_to_gray_image, gray_image_to_array2, BinaryMask, IntensityImage};
pub use io::{decode_raster, load_intensity_image, save_u8_image};
pub use mask::{remove_small_components, synthesize_mask, MaskOptions, Polarity, ThresholdSpec};
pub use normalize::{normalize, DecodeError, RasterSamples, RawRaster};
pub use regions::{analyze_regions, RegionMetrics};
