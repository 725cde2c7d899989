//! Binary mask synthesis from a threshold and speckle cleanup.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::detection::{component_sizes, connected_components, Connectivity, SegmentationError};
use super::image::{BinaryMask, IntensityImage};

/// Output of a threshold estimator.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdSpec {
    /// One cutoff for the whole image.
    Scalar(f64),
    /// Per-pixel cutoffs, (height, width) matched to the source image.
    Surface(Array2<f64>),
}

impl ThresholdSpec {
    /// Threshold applied at pixel (y, x).
    fn at(&self, y: usize, x: usize) -> f64 {
        match self {
            ThresholdSpec::Scalar(t) => *t,
            ThresholdSpec::Surface(surface) => surface[[y, x]],
        }
    }
}

/// Which side of the threshold becomes foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// `value < threshold` (dark pores are foreground).
    Below,
    /// `value >= threshold` (bright material is foreground).
    #[default]
    Above,
}

/// Parameters shared by every mask of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskOptions {
    pub polarity: Polarity,
    /// Components with fewer pixels than this are discarded.
    pub min_component_size: usize,
    pub connectivity: Connectivity,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            polarity: Polarity::default(),
            min_component_size: 32,
            connectivity: Connectivity::default(),
        }
    }
}

/// Apply `threshold` to `image` and remove small components.
///
/// Returns `DimensionMismatch` when a surface does not match the image.
pub fn synthesize_mask(
    image: &IntensityImage,
    threshold: &ThresholdSpec,
    options: &MaskOptions,
) -> Result<BinaryMask, SegmentationError> {
    if let ThresholdSpec::Surface(surface) = threshold {
        if surface.dim() != image.dim() {
            return Err(SegmentationError::DimensionMismatch {
                expected: image.dim(),
                actual: surface.dim(),
            });
        }
    }

    let pixels = image.pixels();
    let raw = Array2::from_shape_fn(image.dim(), |(y, x)| {
        let below = (pixels[[y, x]] as f64) < threshold.at(y, x);
        match options.polarity {
            Polarity::Below => below,
            Polarity::Above => !below,
        }
    });

    Ok(remove_small_components(
        &BinaryMask::new(raw),
        options.min_component_size,
        options.connectivity,
    ))
}

/// Drop every connected component with fewer than `min_size` pixels.
pub fn remove_small_components(
    mask: &BinaryMask,
    min_size: usize,
    connectivity: Connectivity,
) -> BinaryMask {
    if min_size <= 1 {
        return mask.clone();
    }

    let (labels, count) = connected_components(&mask.view(), connectivity);
    let sizes = component_sizes(&labels.view(), count);

    BinaryMask::new(labels.mapv(|label| label > 0 && sizes[label - 1] >= min_size))
}
