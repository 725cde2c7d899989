//! Porosity and component statistics of a binary mask.

use super::detection::{connected_components, Connectivity};
use super::image::BinaryMask;

/// Measurements for one (image, method) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMetrics {
    pub image_id: String,
    pub method_name: String,
    /// Foreground pixels over total pixels, in [0, 1].
    pub foreground_fraction: f64,
    pub component_count: usize,
}

/// Measure the foreground fraction and number of connected components.
///
/// A zero-area mask reports a fraction of 0.0.
pub fn analyze_regions(
    image_id: &str,
    method_name: &str,
    mask: &BinaryMask,
    connectivity: Connectivity,
) -> RegionMetrics {
    let foreground_fraction = if mask.is_empty() {
        0.0
    } else {
        mask.count_foreground() as f64 / mask.len() as f64
    };
    let (_, component_count) = connected_components(&mask.view(), connectivity);

    RegionMetrics {
        image_id: image_id.to_string(),
        method_name: method_name.to_string(),
        foreground_fraction,
        component_count,
    }
}
