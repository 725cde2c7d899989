//! Threshold estimation and connected component labeling.
//!
//! # Module Organization
//!
//! - **thresholding**: global estimators on the intensity histogram
//!   (Otsu, Yen, triangle)
//! - **local**: windowed mean/standard deviation and the Niblack and
//!   Sauvola surfaces built on them
//! - **labeling**: two-pass union-find component labeling with selectable
//!   connectivity
//!
//! # Algorithm Comparison
//!
//! | Method   | Output  | Criterion                          |
//! |----------|---------|------------------------------------|
//! | Otsu     | scalar  | between-class variance             |
//! | Yen      | scalar  | entropic correlation               |
//! | Triangle | scalar  | distance to peak-to-tail line      |
//! | Niblack  | surface | local mean + k · local std         |
//! | Sauvola  | surface | dynamic-range normalized Niblack   |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::image::IntensityImage;

pub mod labeling;
pub mod local;
pub mod thresholding;

pub use labeling::{component_sizes, connected_components};
pub use local::{local_mean_std, niblack_threshold, sauvola_threshold, SAUVOLA_DYNAMIC_RANGE};
pub use thresholding::{otsu_threshold, triangle_threshold, yen_threshold};

/// Errors raised while estimating thresholds or synthesizing masks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentationError {
    /// Requested method is not registered in the catalog.
    #[error("unknown threshold method '{0}'")]
    UnknownMethod(String),

    /// Histogram has fewer than two occupied levels, so no level separates it.
    #[error("degenerate histogram: {distinct_levels} distinct intensity level(s)")]
    DegenerateHistogram {
        /// Number of occupied histogram bins (0 or 1).
        distinct_levels: usize,
    },

    /// Threshold surface does not match the image it is applied to.
    #[error("threshold surface is {actual:?} but image is {expected:?} (height, width)")]
    DimensionMismatch {
        /// Image dimensions.
        expected: (usize, usize),
        /// Surface dimensions.
        actual: (usize, usize),
    },
}

/// Pixel adjacency rule shared by speckle removal and region labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Horizontal and vertical neighbors only.
    Four,
    /// Diagonal neighbors are connected as well.
    #[default]
    Eight,
}

/// 256-bin intensity histogram of an 8-bit image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; 256],
    total: u64,
}

impl Histogram {
    pub fn from_image(image: &IntensityImage) -> Self {
        let mut counts = [0u64; 256];
        for &pixel in image.pixels().iter() {
            counts[pixel as usize] += 1;
        }
        Self {
            counts,
            total: image.len() as u64,
        }
    }

    pub fn counts(&self) -> &[u64; 256] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of occupied bins.
    pub fn distinct_levels(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Lowest and highest occupied level.
    pub fn range(&self) -> Option<(u8, u8)> {
        let lo = self.counts.iter().position(|&c| c > 0)?;
        let hi = self.counts.iter().rposition(|&c| c > 0)?;
        Some((lo as u8, hi as u8))
    }

    /// Bins from the lowest to the highest occupied level, with the offset of
    /// the first bin.
    ///
    /// Histogram estimators work on this span so empty tails do not bias
    /// them; it always holds at least two bins.
    pub fn occupied_span(&self) -> Result<(u8, &[u64]), SegmentationError> {
        match self.range() {
            Some((lo, hi)) if hi > lo => {
                Ok((lo, &self.counts[lo as usize..=hi as usize]))
            }
            _ => Err(SegmentationError::DegenerateHistogram {
                distinct_levels: self.distinct_levels(),
            }),
        }
    }
}
