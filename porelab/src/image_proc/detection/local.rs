//! Locally adaptive threshold surfaces.
//!
//! Both methods need the mean `m` and standard deviation `s` of a square
//! window around every pixel. They are computed from integral images of the
//! intensity and squared intensity, so the cost is independent of the window
//! size.
//!
//! # Boundary Policy
//!
//! Windows that extend past the image edge see **edge-replicated** pixels:
//! the image is padded by clamping coordinates into range. Images smaller
//! than the window are therefore valid; their windows are made mostly of
//! replicated border pixels.

use ndarray::Array2;

use crate::image_proc::image::IntensityImage;

/// Half the dynamic range of 8-bit data, the `R` of Sauvola's formula.
pub const SAUVOLA_DYNAMIC_RANGE: f64 = 127.5;

/// Local mean and standard deviation over a `window × window` neighborhood.
///
/// `window` should be odd; even sizes are centered one pixel toward the
/// top-left. Returns (mean, std) arrays matching the image dimensions.
pub fn local_mean_std(image: &IntensityImage, window: usize) -> (Array2<f64>, Array2<f64>) {
    let (height, width) = image.dim();
    if image.is_empty() {
        return (Array2::zeros((height, width)), Array2::zeros((height, width)));
    }

    let window = window.max(1);
    let radius = window / 2;
    let pixels = image.pixels();

    // Integral images over the padded grid, with a leading zero row/column
    let padded_h = height + window - 1;
    let padded_w = width + window - 1;
    let mut sum = Array2::<f64>::zeros((padded_h + 1, padded_w + 1));
    let mut sum_sq = Array2::<f64>::zeros((padded_h + 1, padded_w + 1));

    for py in 0..padded_h {
        let sy = clamp_index(py, radius, height);
        let mut row_sum = 0.0;
        let mut row_sum_sq = 0.0;
        for px in 0..padded_w {
            let sx = clamp_index(px, radius, width);
            let v = pixels[[sy, sx]] as f64;
            row_sum += v;
            row_sum_sq += v * v;
            sum[[py + 1, px + 1]] = sum[[py, px + 1]] + row_sum;
            sum_sq[[py + 1, px + 1]] = sum_sq[[py, px + 1]] + row_sum_sq;
        }
    }

    let area = (window * window) as f64;
    let box_sum = |table: &Array2<f64>, y: usize, x: usize| {
        table[[y + window, x + window]] - table[[y, x + window]] - table[[y + window, x]]
            + table[[y, x]]
    };

    let mean = Array2::from_shape_fn((height, width), |(y, x)| box_sum(&sum, y, x) / area);
    let std = Array2::from_shape_fn((height, width), |(y, x)| {
        let m = mean[[y, x]];
        let variance = box_sum(&sum_sq, y, x) / area - m * m;
        variance.max(0.0).sqrt()
    });

    (mean, std)
}

/// Map a padded coordinate back into the image by edge replication.
fn clamp_index(padded: usize, radius: usize, len: usize) -> usize {
    padded.saturating_sub(radius).min(len - 1)
}

/// Niblack surface: `T = m + k · s`.
pub fn niblack_threshold(image: &IntensityImage, window: usize, k: f64) -> Array2<f64> {
    let (mean, std) = local_mean_std(image, window);
    mean + std * k
}

/// Sauvola surface: `T = m · (1 + k · (s / r − 1))`.
///
/// `r` is the dynamic range of the standard deviation, normally
/// [`SAUVOLA_DYNAMIC_RANGE`] for 8-bit images.
pub fn sauvola_threshold(image: &IntensityImage, window: usize, k: f64, r: f64) -> Array2<f64> {
    let (mean, std) = local_mean_std(image, window);
    let mut surface = mean;
    surface.zip_mut_with(&std, |m, &s| *m *= 1.0 + k * (s / r - 1.0));
    surface
}
