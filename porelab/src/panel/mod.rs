//! Side-by-side comparison panel of the original image and every mask.
//!
//! Layout, top to bottom:
//!
//! ```text
//! +---------------------------------------------+
//! |                 title band                  |
//! +----------+----------+----------+------------+
//! | original |  otsu    |  yen     |  triangle  |  <- label band
//! | [cell]   |  [cell]  |  [cell]  |  [cell]    |
//! +----------+----------+----------+------------+
//! | sauvola  |  ...                             |
//! ```
//!
//! Cells are placed row-major. The original is stretched to the full
//! intensity range; masks render as 0/255.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

use crate::image_proc::detection::SegmentationError;
use crate::image_proc::image::{BinaryMask, IntensityImage};

mod labels;

pub use labels::LabelRenderer;

/// Grid geometry: `rows = ceil(cells / columns)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub columns: usize,
    pub rows: usize,
    pub cells: usize,
}

impl PanelLayout {
    pub fn new(cells: usize, columns: usize) -> Self {
        let columns = columns.max(1);
        Self {
            columns,
            rows: cells.div_ceil(columns),
            cells,
        }
    }

    /// (row, column) of cell `index`.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.columns, index % self.columns)
    }
}

/// Visual parameters of a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelStyle {
    pub columns: usize,
    /// Longest cell edge in pixels; larger images are downscaled. 0 disables.
    pub max_cell: u32,
    pub title_height: u32,
    pub label_height: u32,
    /// Gap between cells and around the border.
    pub spacing: u32,
    pub background: u8,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            columns: 4,
            max_cell: 512,
            title_height: 40,
            label_height: 24,
            spacing: 8,
            background: 255,
        }
    }
}

impl PanelStyle {
    /// Cell size for an image of `width` x `height`.
    fn cell_size(&self, width: u32, height: u32) -> (u32, u32) {
        let longest = width.max(height);
        if self.max_cell == 0 || longest <= self.max_cell {
            return (width, height);
        }
        let scale = self.max_cell as f64 / longest as f64;
        let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);
        (scaled(width), scaled(height))
    }
}

/// Assembled panel raster and its grid.
#[derive(Debug, Clone)]
pub struct ComparisonPanel {
    pub image: GrayImage,
    pub layout: PanelLayout,
    /// Cell size in pixels (width, height).
    pub cell_size: (u32, u32),
}

impl ComparisonPanel {
    /// Save as 8-bit grayscale; the format follows the extension.
    pub fn save(&self, path: &Path) -> image::ImageResult<()> {
        self.image.save(path)
    }
}

/// Compose `original` and the named `masks` into one grid image.
///
/// Masks must match the original's dimensions.
pub fn assemble_panel(
    original: &IntensityImage,
    masks: &[(String, BinaryMask)],
    title: &str,
    style: &PanelStyle,
    labels: &LabelRenderer,
) -> Result<ComparisonPanel, SegmentationError> {
    if let Some((_, mask)) = masks.iter().find(|(_, m)| m.dim() != original.dim()) {
        return Err(SegmentationError::DimensionMismatch {
            expected: original.dim(),
            actual: mask.dim(),
        });
    }

    let layout = PanelLayout::new(masks.len() + 1, style.columns);
    let (cell_w, cell_h) = style.cell_size(original.width() as u32, original.height() as u32);

    let spacing = style.spacing;
    let pitch_x = cell_w + spacing;
    let pitch_y = style.label_height + cell_h + spacing;
    let width = spacing + layout.columns as u32 * pitch_x;
    let height = style.title_height + spacing + layout.rows as u32 * pitch_y;

    let mut canvas = GrayImage::from_pixel(width, height, Luma([style.background]));

    labels.draw(
        &mut canvas,
        0,
        0,
        width,
        style.title_height,
        title,
        style.title_height as f32 * 0.5,
    );

    let original_cell = (
        "original",
        original.stretched().to_gray_image(),
        FilterType::Triangle,
    );
    let cells = std::iter::once(original_cell).chain(
        masks
            .iter()
            .map(|(name, mask)| (name.as_str(), mask.to_gray_image(), FilterType::Nearest)),
    );

    for (index, (name, cell, filter)) in cells.enumerate() {
        let (row, col) = layout.position(index);
        let x = spacing + col as u32 * pitch_x;
        let y = style.title_height + spacing + row as u32 * pitch_y;

        labels.draw(
            &mut canvas,
            x,
            y,
            cell_w,
            style.label_height,
            name,
            style.label_height as f32 * 0.6,
        );

        if cell.width() == 0 || cell.height() == 0 {
            continue;
        }
        let cell = if cell.dimensions() == (cell_w, cell_h) {
            cell
        } else {
            imageops::resize(&cell, cell_w, cell_h, filter)
        };
        imageops::replace(
            &mut canvas,
            &cell,
            x as i64,
            (y + style.label_height) as i64,
        );
    }

    Ok(ComparisonPanel {
        image: canvas,
        layout,
        cell_size: (cell_w, cell_h),
    })
}
