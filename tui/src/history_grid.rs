use kiosk_core::ImageRecord;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::Block;
use ratatui::widgets::Widget;

use crate::colors;
use crate::pixels::Fit;
use crate::pixels::ScaleCache;
use crate::pixels::pixel_size;
use crate::pixels::render_pixels;
use crate::thumbnails::Thumbnail;

/// One past transmission: the image cropped to fill the tile, with its
/// capture time in the bottom-right corner.
pub(crate) struct HistoryTile<'a> {
    pub record: &'a ImageRecord,
    pub thumbnail: Option<&'a Thumbnail>,
    pub selected: bool,
    pub cache: &'a ScaleCache,
}

impl Widget for HistoryTile<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        buf.set_style(area, Style::default().bg(colors::background()));

        match self.thumbnail {
            Some(Thumbnail::Ready(image)) => {
                let (width, height) = pixel_size(area);
                let scaled = self.cache.scaled(
                    &self.record.shared_id(),
                    image.pixels(),
                    width,
                    height,
                    Fit::Cover,
                );
                render_pixels(&scaled, area, buf, colors::background());
            }
            Some(Thumbnail::Failed) => {
                let middle = Rect::new(area.x, area.y + area.height / 2, area.width, 1);
                Line::from("unavailable")
                    .style(Style::default().fg(colors::text_dim()))
                    .centered()
                    .render(middle, buf);
            }
            Some(Thumbnail::Loading(_)) | None => {}
        }

        let label = self.record.capture_label();
        if !label.is_empty() {
            let width = label.len() as u16;
            let x = area.x + area.width.saturating_sub(width.saturating_add(1));
            let y = area.bottom().saturating_sub(1);
            buf.set_stringn(
                x,
                y,
                &label,
                usize::from(area.width),
                Style::default()
                    .fg(colors::text())
                    .bg(colors::background())
                    .add_modifier(Modifier::BOLD),
            );
        }

        if self.selected {
            Block::bordered()
                .border_style(Style::default().fg(colors::selection()))
                .render(area, buf);
        }
    }
}
