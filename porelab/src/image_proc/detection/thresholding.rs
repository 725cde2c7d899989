//! Global threshold estimators on the 8-bit intensity histogram.
//!
//! All three estimators work on the span of occupied levels (lowest to
//! highest non-empty bin) and return the last intensity of the lower class.
//! A pixel with value `v` therefore belongs to the lower class when `v <= t`.
//!
//! # Key Algorithms
//!
//! ## Otsu
//! Maximizes the between-class variance `w_b · w_f · (μ_b − μ_f)²`.
//!
//! ## Yen
//! Maximizes the entropic correlation
//! `ln((P1 · (1 − P1))² / (S1 · S2))`, where `P1` is the cumulative
//! probability up to `t`, `S1` the cumulative sum of squared probabilities
//! up to `t` and `S2` the sum of squared probabilities above `t`.
//!
//! ## Triangle
//! Draws a line from the histogram peak to the far end of the longer tail
//! and picks the level farthest below that line. Suited to unimodal
//! histograms such as a bright matrix with few dark pores.
//!
//! Images with a single intensity level have no separating threshold; every
//! estimator reports [`SegmentationError::DegenerateHistogram`] for them.

use super::{Histogram, SegmentationError};

/// Compute the threshold using Otsu's method.
///
/// # Performance
/// O(N + 256) where N is the number of pixels (histogram is built by caller).
pub fn otsu_threshold(histogram: &Histogram) -> Result<u8, SegmentationError> {
    let (offset, span) = histogram.occupied_span()?;
    let total_pixels = histogram.total() as f64;

    let mut sum = 0.0;
    for (i, &count) in span.iter().enumerate() {
        sum += i as f64 * count as f64;
    }

    let mut sum_b = 0.0;
    let mut weight_b = 0.0;

    let mut max_variance = 0.0;
    let mut threshold = 0usize;

    for (i, &count) in span.iter().enumerate() {
        weight_b += count as f64;
        if weight_b.abs() < f64::EPSILON {
            continue;
        }

        let weight_f = total_pixels - weight_b;
        if weight_f.abs() < f64::EPSILON {
            break;
        }

        sum_b += (i as f64) * (count as f64);
        let mean_b = sum_b / weight_b;
        let mean_f = (sum - sum_b) / weight_f;

        let variance = weight_b * weight_f * (mean_b - mean_f).powi(2);

        if variance > max_variance {
            max_variance = variance;
            threshold = i;
        }
    }

    Ok(offset + threshold as u8)
}

/// Compute the threshold using Yen's maximum correlation criterion.
pub fn yen_threshold(histogram: &Histogram) -> Result<u8, SegmentationError> {
    let (offset, span) = histogram.occupied_span()?;
    let total = histogram.total() as f64;
    let pmf: Vec<f64> = span.iter().map(|&c| c as f64 / total).collect();
    let n = pmf.len();

    // Squared-probability mass strictly above each index
    let mut tail_sq = vec![0.0; n + 1];
    for i in (0..n).rev() {
        tail_sq[i] = tail_sq[i + 1] + pmf[i] * pmf[i];
    }

    let mut p1 = 0.0;
    let mut p1_sq = 0.0;
    let mut best_crit = f64::NEG_INFINITY;
    let mut threshold = 0usize;

    for i in 0..n - 1 {
        p1 += pmf[i];
        p1_sq += pmf[i] * pmf[i];

        let separation = p1 * (1.0 - p1);
        let crit = ((separation * separation) / (p1_sq * tail_sq[i + 1])).ln();

        if crit > best_crit {
            best_crit = crit;
            threshold = i;
        }
    }

    Ok(offset + threshold as u8)
}

/// Compute the threshold using the triangle method.
pub fn triangle_threshold(histogram: &Histogram) -> Result<u8, SegmentationError> {
    let (offset, span) = histogram.occupied_span()?;
    let nbins = span.len();

    // First bin holding the maximum count
    let (mut arg_peak, peak_height) = span
        .iter()
        .enumerate()
        .fold((0usize, 0u64), |(best_i, best), (i, &c)| {
            if c > best {
                (i, c)
            } else {
                (best_i, best)
            }
        });
    let arg_low = 0usize;
    let arg_high = nbins - 1;

    // Walk toward the longer tail; mirror the histogram when it lies on the left
    let flip = arg_peak - arg_low < arg_high - arg_peak;
    let hist: Vec<u64> = if flip {
        arg_peak = nbins - arg_peak - 1;
        span.iter().rev().copied().collect()
    } else {
        span.to_vec()
    };

    let width = (arg_peak - arg_low) as f64;
    let norm = (peak_height as f64).hypot(width);
    let peak_norm = peak_height as f64 / norm;
    let width_norm = width / norm;

    let mut best_length = f64::NEG_INFINITY;
    let mut arg_level = arg_low;
    for x in 0..(arg_peak - arg_low) {
        let y = hist[x + arg_low] as f64;
        let length = peak_norm * x as f64 - width_norm * y;
        if length > best_length {
            best_length = length;
            arg_level = x + arg_low;
        }
    }

    if flip {
        arg_level = nbins - arg_level - 1;
    }

    Ok(offset + arg_level as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::image::IntensityImage;

    fn histogram_of(values: Vec<u8>) -> Histogram {
        let width = values.len();
        Histogram::from_image(&IntensityImage::from_raw(width, 1, values).unwrap())
    }

    /// Peak at level 10 with a flat tail of single pixels up to level 50.
    fn skewed_histogram() -> Histogram {
        let mut values = vec![10u8; 100];
        values.extend(11u8..=50);
        histogram_of(values)
    }

    #[test]
    fn test_otsu_bimodal() {
        let hist = histogram_of(vec![10, 10, 20, 20, 200, 200, 210, 210]);
        // Split between the dark and bright pairs; first maximizing level wins
        assert_eq!(otsu_threshold(&hist).unwrap(), 20);
    }

    #[test]
    fn test_otsu_two_levels_returns_lower_level() {
        let hist = histogram_of(vec![0, 255, 0, 255]);
        assert_eq!(otsu_threshold(&hist).unwrap(), 0);
    }

    #[test]
    fn test_otsu_respects_offset() {
        let hist = histogram_of(vec![100, 100, 101, 140, 141, 141]);
        let t = otsu_threshold(&hist).unwrap();
        assert!((101..140).contains(&t), "threshold {t}");
    }

    #[test]
    fn test_yen_two_levels() {
        let hist = histogram_of(vec![0, 255, 0, 255]);
        assert_eq!(yen_threshold(&hist).unwrap(), 0);
    }

    #[test]
    fn test_yen_separates_classes() {
        let mut values = vec![30u8; 50];
        values.extend(vec![35u8; 50]);
        values.extend(vec![180u8; 60]);
        values.extend(vec![190u8; 40]);
        let t = yen_threshold(&histogram_of(values)).unwrap();
        assert!((35..180).contains(&t), "threshold {t}");
    }

    #[test]
    fn test_triangle_skewed_histogram() {
        // Mirrored: peak at the right end, tail flat at height 1, so the
        // farthest point from the line is the bin next to the peak
        assert_eq!(triangle_threshold(&skewed_histogram()).unwrap(), 11);
    }

    #[test]
    fn test_triangle_tail_on_the_left() {
        let mut values: Vec<u8> = (200u8..240).collect();
        values.extend(vec![240u8; 100]);
        assert_eq!(triangle_threshold(&histogram_of(values)).unwrap(), 239);
    }

    #[test]
    fn test_uniform_image_degenerate_for_all_estimators() {
        let hist = Histogram::from_image(&IntensityImage::from_elem(8, 8, 128));
        let expected = SegmentationError::DegenerateHistogram { distinct_levels: 1 };
        assert_eq!(otsu_threshold(&hist), Err(expected.clone()));
        assert_eq!(yen_threshold(&hist), Err(expected.clone()));
        assert_eq!(triangle_threshold(&hist), Err(expected));
    }

    #[test]
    fn test_estimators_are_deterministic() {
        let hist = skewed_histogram();
        assert_eq!(otsu_threshold(&hist), otsu_threshold(&hist));
        assert_eq!(yen_threshold(&hist), yen_threshold(&hist));
        assert_eq!(triangle_threshold(&hist), triangle_threshold(&hist));
    }
}
