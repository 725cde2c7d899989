//! Contrast enhancement applied before thresholding.
//!
//! Enhancers are plain image-to-image transforms behind the
//! [`ContrastEnhancer`] trait so the orchestrator can swap or skip them.
//! The provided implementation is CLAHE (Zuiderveld, 1994).

use ndarray::Array2;

use super::image::IntensityImage;

/// Pluggable intensity transform run once per image before the catalog.
pub trait ContrastEnhancer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Produce an enhanced copy of `image` with identical dimensions.
    fn enhance(&self, image: &IntensityImage) -> IntensityImage;
}

/// Contrast Limited Adaptive Histogram Equalization.
///
/// Follows OpenCV's `createCLAHE`. The image is split into `tile_grid`
/// tiles, padding by mirror reflection when the size is not a multiple of
/// the grid. Each tile gets a lookup table `cdf * 255 / tile_pixels` built
/// from a histogram clipped at `clip_limit * tile_pixels / 256`, with the
/// clipped excess spread evenly and its remainder at a fixed stride. Pixels
/// interpolate bilinearly between the four nearest tile centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    /// Clip limit relative to a uniform histogram (0 disables clipping).
    pub clip_limit: f32,
    /// Tiles along (x, y).
    pub tile_grid: (usize, usize),
}

impl Default for Clahe {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: (8, 8),
        }
    }
}

/// Index into `0..len` with mirror reflection that skips the edge pixel.
fn reflect_101(index: usize, len: usize) -> usize {
    if index < len || len == 1 {
        index.min(len - 1)
    } else {
        2 * (len - 1) - index
    }
}

/// Clip `hist` at `limit` and redistribute the excess.
fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            clipped += *bin - limit;
            *bin = limit;
        }
    }

    let batch = clipped / 256;
    let mut residual = (clipped % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1);
        let mut i = 0;
        while i < 256 && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

impl Clahe {
    pub fn new(clip_limit: f32, tile_grid: (usize, usize)) -> Self {
        Self {
            clip_limit,
            tile_grid,
        }
    }

    /// Per-tile lookup tables, 256 entries per tile, row-major over tiles.
    fn tile_luts(
        &self,
        pixels: &Array2<u8>,
        grid_x: usize,
        grid_y: usize,
        tile_w: usize,
        tile_h: usize,
    ) -> Vec<[u8; 256]> {
        let (height, width) = pixels.dim();
        let tile_pixels = tile_w * tile_h;

        let clip = if self.clip_limit > 0.0 {
            Some(((self.clip_limit * tile_pixels as f32 / 256.0) as u32).max(1))
        } else {
            None
        };
        let scale = 255.0 / tile_pixels as f32;

        let mut luts = Vec::with_capacity(grid_x * grid_y);
        for ty in 0..grid_y {
            for tx in 0..grid_x {
                let mut hist = [0u32; 256];
                for y in ty * tile_h..(ty + 1) * tile_h {
                    let sy = reflect_101(y, height);
                    for x in tx * tile_w..(tx + 1) * tile_w {
                        hist[pixels[[sy, reflect_101(x, width)]] as usize] += 1;
                    }
                }

                if let Some(limit) = clip {
                    clip_histogram(&mut hist, limit);
                }

                let mut lut = [0u8; 256];
                let mut sum = 0u32;
                for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
                    sum += count;
                    *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
                }
                luts.push(lut);
            }
        }

        luts
    }
}

impl ContrastEnhancer for Clahe {
    fn name(&self) -> &str {
        "clahe"
    }

    fn enhance(&self, image: &IntensityImage) -> IntensityImage {
        if image.is_empty() {
            return image.clone();
        }

        let pixels = image.pixels();
        let (height, width) = pixels.dim();

        // Tiles never shrink below one pixel on small images
        let grid_x = self.tile_grid.0.clamp(1, width);
        let grid_y = self.tile_grid.1.clamp(1, height);
        let tile_w = width.div_ceil(grid_x);
        let tile_h = height.div_ceil(grid_y);

        let luts = self.tile_luts(pixels, grid_x, grid_y, tile_w, tile_h);

        let output = Array2::from_shape_fn((height, width), |(y, x)| {
            let value = pixels[[y, x]] as usize;

            // Position relative to tile centers
            let fy = (y as f32 / tile_h as f32 - 0.5).clamp(0.0, (grid_y - 1) as f32);
            let fx = (x as f32 / tile_w as f32 - 0.5).clamp(0.0, (grid_x - 1) as f32);

            let ty0 = fy.floor() as usize;
            let tx0 = fx.floor() as usize;
            let ty1 = (ty0 + 1).min(grid_y - 1);
            let tx1 = (tx0 + 1).min(grid_x - 1);

            let wy = fy - ty0 as f32;
            let wx = fx - tx0 as f32;

            let v00 = luts[ty0 * grid_x + tx0][value] as f32;
            let v10 = luts[ty0 * grid_x + tx1][value] as f32;
            let v01 = luts[ty1 * grid_x + tx0][value] as f32;
            let v11 = luts[ty1 * grid_x + tx1][value] as f32;

            let top = v00 * (1.0 - wx) + v10 * wx;
            let bottom = v01 * (1.0 - wx) + v11 * wx;
            (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8
        });

        IntensityImage::new(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::test_patterns::generate_horizontal_gradient;

    #[test]
    fn test_preserves_dimensions() {
        let image = IntensityImage::new(generate_horizontal_gradient(37, 23, 40u8, 90u8));
        let enhanced = Clahe::default().enhance(&image);
        assert_eq!(enhanced.dim(), image.dim());
    }

    #[test]
    fn test_stretches_low_contrast_image() {
        let image = IntensityImage::new(generate_horizontal_gradient(64, 64, 100u8, 140u8));
        let enhanced = Clahe::new(0.0, (1, 1)).enhance(&image);

        let (lo, hi) = enhanced.min_max().unwrap();
        assert!(hi - lo > 140 - 100, "range {lo}..{hi} was not expanded");
    }

    #[test]
    fn test_preserves_ordering_within_single_tile() {
        let image = IntensityImage::new(generate_horizontal_gradient(32, 4, 10u8, 200u8));
        let enhanced = Clahe::new(0.0, (1, 1)).enhance(&image);
        let row = enhanced.pixels().row(0).to_vec();
        assert!(row.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_image_smaller_than_grid() {
        let image = IntensityImage::from_raw(3, 2, vec![0, 50, 100, 150, 200, 250]).unwrap();
        let enhanced = Clahe::default().enhance(&image);
        assert_eq!(enhanced.dim(), (2, 3));
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let image = IntensityImage::from_elem(16, 16, 90);
        let enhanced = Clahe::default().enhance(&image);
        let first = enhanced.pixels()[[0, 0]];
        assert!(enhanced.pixels().iter().all(|&v| v == first));
    }

    #[test]
    fn test_uniform_tile_maps_to_mid_gray() {
        // 8x8 tiles of 64 pixels: clip at 1, 63 counts spread every 4th bin,
        // cdf(120) = 32 -> 32 * 255 / 64 = 127.5
        let image = IntensityImage::from_elem(64, 64, 120);
        let enhanced = Clahe::default().enhance(&image);
        assert!(enhanced.pixels().iter().all(|&v| v == 128));
    }

    #[test]
    fn test_unclipped_single_tile_is_plain_equalization() {
        let image = IntensityImage::from_raw(4, 1, vec![10, 10, 200, 200]).unwrap();
        let enhanced = Clahe::new(0.0, (1, 1)).enhance(&image);
        assert_eq!(enhanced.pixels().as_slice().unwrap(), &[128, 128, 255, 255]);
    }

    #[test]
    fn test_clip_histogram_spreads_residual_at_stride() {
        let mut hist = [0u32; 256];
        hist[0] = 10;
        clip_histogram(&mut hist, 2);
        // 8 clipped counts land on bins 0, 32, .., 224
        assert_eq!(hist[0], 3);
        assert_eq!(hist[32], 1);
        assert_eq!(hist[224], 1);
        assert_eq!(hist[1], 0);
        assert_eq!(hist.iter().sum::<u32>(), 10);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(0, 1), 0);
    }
}
