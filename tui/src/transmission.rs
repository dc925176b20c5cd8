//! The featured transmission panel and the overlays drawn on the viewport.

use image::Rgba;
use image::RgbaImage;
use kiosk_client::LoadedImage;
use kiosk_core::ImageRecord;
use kiosk_core::MissionElapsed;
use kiosk_core::RevealGrid;
use kiosk_core::RevealState;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::Widget;

use crate::colors;
use crate::pixels::Fit;
use crate::pixels::ScaleCache;
use crate::pixels::pixel_size;
use crate::pixels::render_pixels;
use crate::thumbnails::Thumbnail;

const HEADING: &str = "Mission Elapsed Time";
const SUBHEADING: &str = "Current transmission from Internet Voyager";
const FOOTER: &str = "Scroll down to review past transmissions";
const LOADING: &str = "Loading...";
/// Rows used by text around the image: three above, one below, two gaps.
const TEXT_ROWS: u16 = 6;

/// Reveal state of a mounted featured image. `image` is `None` when the
/// image could not be loaded; the revealed cells then show a placeholder.
pub(crate) struct MountedReveal<'a> {
    pub image: Option<&'a LoadedImage>,
    pub grid: RevealGrid,
    pub state: RevealState,
}

pub(crate) struct TransmissionPanel<'a> {
    pub record: &'a ImageRecord,
    pub mounted: Option<MountedReveal<'a>>,
    pub mission: MissionElapsed,
    pub cache: &'a ScaleCache,
}

impl Widget for TransmissionPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Style::default().bg(colors::background()));
        let Some(mounted) = self.mounted else {
            return;
        };
        buf.set_style(
            area,
            Style::default().bg(colors::overlay()).fg(colors::text()),
        );

        let max_rows = (u32::from(area.height) * 7 / 10) as u16;
        let mut image_rows = max_rows.min(area.height.saturating_sub(TEXT_ROWS));
        let mut image_cols = image_rows.saturating_mul(2);
        if image_cols > area.width {
            image_cols = area.width - area.width % 2;
            image_rows = image_cols / 2;
        }
        let total = TEXT_ROWS + image_rows;
        let top = area.y + area.height.saturating_sub(total) / 2;
        let row = |offset: u16| Rect::new(area.x, top + offset, area.width, 1);

        Line::from(HEADING)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .centered()
            .render(row(0), buf);
        Line::from(self.mission.to_string())
            .centered()
            .render(row(1), buf);
        Line::from(SUBHEADING)
            .style(Style::default().add_modifier(Modifier::ITALIC))
            .centered()
            .render(row(2), buf);

        if image_rows > 0 {
            let image_area = Rect::new(
                area.x + (area.width - image_cols) / 2,
                top + 4,
                image_cols,
                image_rows,
            );
            let (width, height) = pixel_size(image_area);
            let canvas = match mounted.image {
                Some(image) => {
                    let scaled = self.cache.scaled(
                        &self.record.shared_id(),
                        image.pixels(),
                        width,
                        height,
                        Fit::Stretch,
                    );
                    reveal_canvas(&scaled, mounted.grid, mounted.state)
                }
                None => broken_canvas(width, height, mounted.grid, mounted.state),
            };
            render_pixels(&canvas, image_area, buf, colors::overlay());
        }

        if area.height >= total {
            Line::from(FOOTER)
                .style(Style::default().fg(colors::text_dim()))
                .centered()
                .render(row(total - 1), buf);
        }
    }
}

/// Copies the revealed cells of `scaled` onto a transparent canvas.
pub(crate) fn reveal_canvas(scaled: &RgbaImage, grid: RevealGrid, state: RevealState) -> RgbaImage {
    if state.is_complete() {
        return scaled.clone();
    }
    let (width, height) = scaled.dimensions();
    let mut canvas = RgbaImage::new(width, height);
    for index in 0..state.visible_cells {
        let Some(cell) = grid.cell(index) else {
            break;
        };
        let crop = grid.crop(cell, width, height);
        for y in crop.y..crop.y + crop.height {
            for x in crop.x..crop.x + crop.width {
                canvas.put_pixel(x, y, *scaled.get_pixel(x, y));
            }
        }
    }
    canvas
}

/// Checkerboard over the revealed cells, for an image that failed to load.
fn broken_canvas(width: u32, height: u32, grid: RevealGrid, state: RevealState) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| match grid.cell_at(x, y, width, height) {
        Some(cell) if state.shows(grid.index_of(cell)) => {
            let [r, g, b] = colors::broken((cell.row + cell.col) % 2 == 0);
            Rgba([r, g, b, 255])
        }
        _ => Rgba([0, 0, 0, 0]),
    })
}

/// Centred caption box drawn over the viewport during the arrival sequence.
pub(crate) struct CaptionOverlay<'a> {
    pub text: &'a str,
}

impl Widget for CaptionOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 3 {
            return;
        }
        let width = (self.text.chars().count() as u16)
            .saturating_add(6)
            .min(area.width);
        let boxed = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - 3) / 2,
            width,
            3,
        );
        buf.set_style(
            boxed,
            Style::default()
                .bg(colors::caption_background())
                .fg(colors::text()),
        );
        Line::from(self.text)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .centered()
            .render(Rect::new(boxed.x, boxed.y + 1, boxed.width, 1), buf);
    }
}

/// Shown until the first listing arrives.
pub(crate) struct LoadingScreen;

impl Widget for LoadingScreen {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(
            area,
            Style::default().bg(colors::background()).fg(colors::text()),
        );
        if area.height == 0 {
            return;
        }
        Line::from(LOADING)
            .centered()
            .render(Rect::new(area.x, area.y + area.height / 2, area.width, 1), buf);
    }
}

/// A past transmission enlarged over the whole viewport.
pub(crate) struct EnlargedView<'a> {
    pub record: &'a ImageRecord,
    pub thumbnail: Option<&'a Thumbnail>,
    pub cache: &'a ScaleCache,
}

impl Widget for EnlargedView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(
            area,
            Style::default().bg(colors::background()).fg(colors::text()),
        );
        if area.height < 3 || area.width < 2 {
            return;
        }
        let image_area = Rect::new(
            area.x + 1,
            area.y + 1,
            area.width - 2,
            area.height.saturating_sub(3),
        );
        let middle = Rect::new(area.x, area.y + area.height / 2, area.width, 1);
        match self.thumbnail {
            Some(Thumbnail::Ready(image)) if !image_area.is_empty() => {
                let (width, height) = pixel_size(image_area);
                let scaled = self.cache.scaled(
                    &self.record.shared_id(),
                    image.pixels(),
                    width,
                    height,
                    Fit::Contain,
                );
                render_pixels(&scaled, image_area, buf, colors::background());
            }
            Some(Thumbnail::Failed) => {
                Line::from("Transmission unavailable")
                    .centered()
                    .render(middle, buf);
            }
            _ => Line::from(LOADING).centered().render(middle, buf),
        }

        let label = self.record.capture_label();
        let footer = if label.is_empty() {
            "Esc to close".to_string()
        } else {
            format!("{label}  ·  Esc to close")
        };
        Line::from(footer)
            .style(Style::default().fg(colors::text_dim()))
            .centered()
            .render(Rect::new(area.x, area.bottom() - 1, area.width, 1), buf);
    }
}
