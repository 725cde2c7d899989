//! Synthetic images for validating thresholding and region analysis.
//!
//! Provides checkerboards, gradients and a simple "pore field" (dark disks
//! on a bright matrix) that stands in for a coating cross-section.

use ndarray::Array2;
use num_traits::{NumCast, Zero};

/// Generate a checkerboard pattern with specified block size
///
/// # Arguments
/// * `blocks_x` - Number of blocks in X direction
/// * `blocks_y` - Number of blocks in Y direction
/// * `block_size` - Size of each square block in pixels
/// * `black_value` - Value for black squares
/// * `white_value` - Value for white squares
/// * `top_left_black` - If true, top-left corner starts with black
///
/// # Returns
/// Array2 containing the checkerboard pattern
pub fn generate_checkerboard<T>(
    blocks_x: usize,
    blocks_y: usize,
    block_size: usize,
    black_value: T,
    white_value: T,
    top_left_black: bool,
) -> Array2<T>
where
    T: Clone + Zero,
{
    let width = blocks_x * block_size;
    let height = blocks_y * block_size;

    Array2::from_shape_fn((height, width), |(y, x)| {
        let (block_x, block_y) = (x / block_size, y / block_size);
        let is_white = if top_left_black {
            (block_x + block_y) % 2 == 1
        } else {
            (block_x + block_y) % 2 == 0
        };

        if is_white {
            white_value.clone()
        } else {
            black_value.clone()
        }
    })
}

/// Generate a horizontal gradient pattern
///
/// # Arguments
/// * `width` - Width of the pattern
/// * `height` - Height of the pattern
/// * `min_value` - Minimum value (left edge)
/// * `max_value` - Maximum value (right edge)
pub fn generate_horizontal_gradient<T>(
    width: usize,
    height: usize,
    min_value: T,
    max_value: T,
) -> Array2<T>
where
    T: Clone + NumCast + Zero,
{
    let min_f: f64 = num_traits::cast(min_value).unwrap_or(0.0);
    let max_f: f64 = num_traits::cast(max_value).unwrap_or(0.0);
    let span = width.saturating_sub(1).max(1) as f64;

    Array2::from_shape_fn((height, width), |(_, x)| {
        let t = x as f64 / span;
        let value_f = (min_f + t * (max_f - min_f)).round();
        num_traits::cast(value_f).unwrap_or_else(T::zero)
    })
}

/// Dark circular pores on a bright matrix.
///
/// # Arguments
/// * `width`, `height` - Image size
/// * `matrix_value` - Intensity of the coating material
/// * `pore_value` - Intensity inside pores
/// * `pores` - (center_row, center_col, radius) for each pore
pub fn generate_pore_field(
    width: usize,
    height: usize,
    matrix_value: u8,
    pore_value: u8,
    pores: &[(f64, f64, f64)],
) -> Array2<u8> {
    Array2::from_shape_fn((height, width), |(y, x)| {
        let inside = pores.iter().any(|&(cy, cx, r)| {
            let dy = y as f64 - cy;
            let dx = x as f64 - cx;
            dy * dy + dx * dx <= r * r
        });
        if inside {
            pore_value
        } else {
            matrix_value
        }
    })
}

/// Solid rectangle of `true` values written into a mask grid.
///
/// Used to build components of an exact pixel count.
pub fn fill_rect(mask: &mut Array2<bool>, top: usize, left: usize, rows: usize, cols: usize) {
    for y in top..top + rows {
        for x in left..left + cols {
            mask[[y, x]] = true;
        }
    }
}
