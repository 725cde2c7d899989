//! Text labels for panel cells, rendered as SVG through resvg.

use std::sync::Arc;

use image::GrayImage;
use log::{debug, warn};
use tiny_skia::{Pixmap, Transform};
use usvg::{fontdb, Options, Tree};

const FONT_FAMILY: &str = "DejaVu Sans";

/// Renders short text strings onto grayscale canvases.
///
/// Without a font database every draw is a no-op, so panels are still
/// produced on machines without system fonts.
#[derive(Clone)]
pub struct LabelRenderer {
    fontdb: Option<Arc<fontdb::Database>>,
}

impl LabelRenderer {
    /// Load the system fonts.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        if db.is_empty() {
            warn!("No system fonts found; panels will be unlabeled");
            return Self::without_fonts();
        }
        debug!("Loaded {} font faces for panel labels", db.len());

        Self {
            fontdb: Some(Arc::new(db)),
        }
    }

    /// Renderer that draws nothing.
    pub fn without_fonts() -> Self {
        Self { fontdb: None }
    }

    pub fn has_fonts(&self) -> bool {
        self.fontdb.is_some()
    }

    /// Draw `text` centered in the box at (`x`, `y`) of size `width` x
    /// `height`, dark on the existing background.
    pub fn draw(
        &self,
        canvas: &mut GrayImage,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        text: &str,
        font_size: f32,
    ) {
        let Some(fontdb) = &self.fontdb else {
            return;
        };
        if width == 0 || height == 0 {
            return;
        }

        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><text x="{cx}" y="{cy}" text-anchor="middle" dominant-baseline="central" font-family="{FONT_FAMILY}" font-size="{font_size}" fill="black">{text}</text></svg>"#,
            w = width,
            h = height,
            cx = width as f32 / 2.0,
            cy = height as f32 / 2.0,
            text = escape_xml(text),
        );

        let options = Options {
            fontdb: Arc::clone(fontdb),
            font_family: FONT_FAMILY.to_string(),
            text_rendering: usvg::TextRendering::GeometricPrecision,
            ..Default::default()
        };

        let tree = match Tree::from_str(&svg, &options) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Failed to lay out label '{text}': {e}");
                return;
            }
        };

        let Some(mut pixmap) = Pixmap::new(width, height) else {
            return;
        };
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

        for py in 0..height {
            for px in 0..width {
                let (cx, cy) = (x + px, y + py);
                if cx >= canvas.width() || cy >= canvas.height() {
                    continue;
                }
                let Some(overlay) = pixmap.pixel(px, py) else {
                    continue;
                };
                if overlay.alpha() == 0 {
                    continue;
                }
                let color = overlay.demultiply();
                let base = canvas.get_pixel(cx, cy)[0];
                canvas.get_pixel_mut(cx, cy)[0] = blend_channel(base, color.red(), color.alpha());
            }
        }
    }
}

impl Default for LabelRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LabelRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelRenderer")
            .field("faces", &self.fontdb.as_ref().map(|db| db.len()))
            .finish()
    }
}

fn blend_channel(base: u8, overlay: u8, alpha: u8) -> u8 {
    let alpha_f = alpha as f32 / 255.0;
    (base as f32 * (1.0 - alpha_f) + overlay as f32 * alpha_f).round() as u8
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
