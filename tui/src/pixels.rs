//! Half-block image rendering.
//!
//! Every terminal cell shows two vertically stacked pixels: the upper one as
//! the foreground of `▀`, the lower one as the background. An area of
//! `w x h` cells is therefore a `w x 2h` pixel surface.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use image::Rgba;
use image::RgbaImage;
use image::imageops;
use image::imageops::FilterType;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;

const UPPER_HALF: &str = "▀";
const SCALE_CACHE_LIMIT: usize = 128;

pub(crate) fn pixel_size(area: Rect) -> (u32, u32) {
    (u32::from(area.width), u32::from(area.height) * 2)
}

/// Draws `pixels` into `area`, top-left aligned. Transparent pixels and
/// pixels outside the image show `background`.
pub(crate) fn render_pixels(pixels: &RgbaImage, area: Rect, buf: &mut Buffer, background: Color) {
    for row in 0..area.height {
        for col in 0..area.width {
            let x = u32::from(col);
            let y = u32::from(row) * 2;
            let top = color_at(pixels, x, y, background);
            let bottom = color_at(pixels, x, y + 1, background);
            if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                cell.set_symbol(UPPER_HALF).set_fg(top).set_bg(bottom);
            }
        }
    }
}

fn color_at(pixels: &RgbaImage, x: u32, y: u32, background: Color) -> Color {
    match pixels.get_pixel_checked(x, y) {
        Some(Rgba([r, g, b, a])) if *a > 0 => Color::Rgb(*r, *g, *b),
        _ => background,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Fit {
    /// Fill the target, cropping the overflow (kept top-aligned).
    Cover,
    /// Fit inside the target, centred on a transparent canvas.
    Contain,
    /// Scale each axis independently.
    Stretch,
}

pub(crate) fn scale(image: &RgbaImage, width: u32, height: u32, fit: Fit) -> RgbaImage {
    let (width, height) = (width.max(1), height.max(1));
    let (src_w, src_h) = (image.width().max(1), image.height().max(1));
    match fit {
        Fit::Stretch => imageops::resize(image, width, height, FilterType::Triangle),
        Fit::Cover => {
            let factor = f64::max(
                f64::from(width) / f64::from(src_w),
                f64::from(height) / f64::from(src_h),
            );
            let scaled_w = scaled_extent(src_w, factor).max(width);
            let scaled_h = scaled_extent(src_h, factor).max(height);
            let resized = imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);
            let x = (scaled_w - width) / 2;
            imageops::crop_imm(&resized, x, 0, width, height).to_image()
        }
        Fit::Contain => {
            let factor = f64::min(
                f64::from(width) / f64::from(src_w),
                f64::from(height) / f64::from(src_h),
            );
            let scaled_w = scaled_extent(src_w, factor).clamp(1, width);
            let scaled_h = scaled_extent(src_h, factor).clamp(1, height);
            let resized = imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);
            let mut canvas = RgbaImage::new(width, height);
            let x = i64::from((width - scaled_w) / 2);
            let y = i64::from((height - scaled_h) / 2);
            imageops::overlay(&mut canvas, &resized, x, y);
            canvas
        }
    }
}

fn scaled_extent(extent: u32, factor: f64) -> u32 {
    let scaled = (f64::from(extent) * factor).round();
    if scaled < 1.0 { 1 } else { scaled as u32 }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ScaleKey {
    id: Arc<str>,
    width: u32,
    height: u32,
    fit: Fit,
}

/// Scaled copies of decoded images, keyed by identifier and target size.
/// Rendering happens through `&self`, hence the interior mutability.
#[derive(Debug, Default)]
pub(crate) struct ScaleCache {
    entries: RefCell<HashMap<ScaleKey, Arc<RgbaImage>>>,
}

impl ScaleCache {
    pub(crate) fn scaled(
        &self,
        id: &Arc<str>,
        image: &RgbaImage,
        width: u32,
        height: u32,
        fit: Fit,
    ) -> Arc<RgbaImage> {
        let key = ScaleKey {
            id: Arc::clone(id),
            width,
            height,
            fit,
        };
        let mut entries = self.entries.borrow_mut();
        if let Some(hit) = entries.get(&key) {
            return Arc::clone(hit);
        }
        if entries.len() >= SCALE_CACHE_LIMIT {
            entries.clear();
        }
        let scaled = Arc::new(scale(image, width, height, fit));
        entries.insert(key, Arc::clone(&scaled));
        scaled
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}
