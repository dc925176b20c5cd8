//! Geometry of the scrollable page.
//!
//! The page is a column of content taller than the terminal: the featured
//! panel fills the first screen, and history tiles follow below it in rows of
//! `columns`. Content coordinates are `u32` rows from the top of the page;
//! the viewport shows `[scroll, scroll + viewport.height)`.

use std::ops::Range;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

const MIN_TILE_HEIGHT: u16 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SurfaceLayout {
    pub viewport: Rect,
    pub columns: u16,
    pub tile_width: u16,
    pub tile_height: u16,
    pub history_len: usize,
}

impl SurfaceLayout {
    pub(crate) fn new(viewport: Rect, columns: u16, history_len: usize) -> Self {
        let columns = columns.max(1);
        let tile_width = (viewport.width / columns).max(1);
        // Terminal cells are about twice as tall as wide; halving keeps tiles square.
        let tile_height = (tile_width / 2).max(MIN_TILE_HEIGHT);
        Self {
            viewport,
            columns,
            tile_width,
            tile_height,
            history_len,
        }
    }

    pub(crate) fn featured_height(&self) -> u32 {
        u32::from(self.viewport.height)
    }

    pub(crate) fn history_rows(&self) -> u32 {
        let rows = self.history_len.div_ceil(usize::from(self.columns));
        u32::try_from(rows).unwrap_or(u32::MAX)
    }

    pub(crate) fn content_height(&self) -> u32 {
        self.featured_height()
            .saturating_add(self.history_rows().saturating_mul(u32::from(self.tile_height)))
    }

    /// Largest valid scroll offset: the bottom of the page at the bottom of
    /// the viewport.
    pub(crate) fn max_scroll(&self) -> u32 {
        self.content_height()
            .saturating_sub(u32::from(self.viewport.height))
    }

    /// Column offset and content row of tile `index`.
    pub(crate) fn tile_origin(&self, index: usize) -> (u16, u32) {
        let columns = usize::from(self.columns);
        let col = (index % columns) as u16;
        let row = u32::try_from(index / columns).unwrap_or(u32::MAX);
        let x = self.viewport.x + col * self.tile_width;
        let y = self
            .featured_height()
            .saturating_add(row.saturating_mul(u32::from(self.tile_height)));
        (x, y)
    }

    /// Indexes of tiles that intersect the viewport at `scroll`.
    pub(crate) fn visible_tiles(&self, scroll: u32) -> Range<usize> {
        let top = scroll;
        let bottom = scroll.saturating_add(u32::from(self.viewport.height));
        let featured = self.featured_height();
        if bottom <= featured || self.history_len == 0 {
            return 0..0;
        }
        let tile_height = u32::from(self.tile_height);
        let first_row = top.saturating_sub(featured) / tile_height;
        let last_row = (bottom - featured).div_ceil(tile_height);
        let columns = usize::from(self.columns);
        let start = (first_row as usize).saturating_mul(columns);
        let end = (last_row as usize).saturating_mul(columns);
        start.min(self.history_len)..end.min(self.history_len)
    }

    /// Scroll offset that brings tile `index` fully into view, moving as
    /// little as possible from `scroll`.
    pub(crate) fn scroll_to_tile(&self, index: usize, scroll: u32) -> u32 {
        let (_, top) = self.tile_origin(index);
        let bottom = top.saturating_add(u32::from(self.tile_height));
        let height = u32::from(self.viewport.height);
        let scroll = if top < scroll {
            top
        } else if bottom > scroll.saturating_add(height) {
            bottom.saturating_sub(height)
        } else {
            scroll
        };
        scroll.min(self.max_scroll())
    }

    /// Where a block of content rows lands in the viewport, if at all.
    pub(crate) fn place(&self, content_y: u32, height: u16, scroll: u32) -> Option<Placement> {
        let top = content_y.max(scroll);
        let bottom = content_y
            .saturating_add(u32::from(height))
            .min(scroll.saturating_add(u32::from(self.viewport.height)));
        if top >= bottom {
            return None;
        }
        Some(Placement {
            dst_y: self.viewport.y + (top - scroll) as u16,
            src_y: (top - content_y) as u16,
            rows: (bottom - top) as u16,
        })
    }
}

/// Visible slice of a block rendered off-screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Placement {
    pub dst_y: u16,
    pub src_y: u16,
    pub rows: u16,
}

/// Copies the visible rows of `scratch` (rendered at origin) into `buf` at
/// column `x`.
pub(crate) fn blit(scratch: &Buffer, placement: Placement, x: u16, buf: &mut Buffer) {
    let width = scratch.area.width;
    for row in 0..placement.rows {
        for col in 0..width {
            let Some(src) = scratch.cell((col, placement.src_y + row)) else {
                continue;
            };
            if let Some(dst) = buf.cell_mut((x + col, placement.dst_y + row)) {
                *dst = src.clone();
            }
        }
    }
}
