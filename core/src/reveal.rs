//! Age-based progressive reveal of the featured image.
//!
//! The image is cut into a square grid of cells. Cells are revealed in
//! row-major order, and how many are visible depends only on how old the
//! capture is. The reveal therefore survives restarts and never depends on
//! the presentation timeline.

use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;

use crate::config::RevealConfig;
use crate::record::ImageRecord;

/// `clamp((now - capture) / window, 0, 1)`.
pub fn reveal_fraction(capture: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> f64 {
    if window.is_zero() {
        return if now >= capture { 1.0 } else { 0.0 };
    }
    let age = now.signed_duration_since(capture);
    let Ok(age) = age.to_std() else {
        // Negative age: capture lies in the future.
        return 0.0;
    };
    (age.as_secs_f64() / window.as_secs_f64()).clamp(0.0, 1.0)
}

/// `floor(fraction * total)`, never more than `total`.
pub fn visible_cells(fraction: f64, total: usize) -> usize {
    if fraction.is_nan() || fraction <= 0.0 {
        return 0;
    }
    let cells = (fraction.min(1.0) * total as f64).floor() as usize;
    cells.min(total)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: u16,
    pub col: u16,
}

/// Source rectangle of one cell, in pixels of the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevealGrid {
    size: u16,
}

impl RevealGrid {
    pub fn new(size: u16) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn total_cells(&self) -> usize {
        usize::from(self.size) * usize::from(self.size)
    }

    /// Row-major cell for `index`, or `None` past the end of the grid.
    pub fn cell(&self, index: usize) -> Option<GridCell> {
        if index >= self.total_cells() {
            return None;
        }
        let size = usize::from(self.size);
        Some(GridCell {
            row: (index / size) as u16,
            col: (index % size) as u16,
        })
    }

    pub fn index_of(&self, cell: GridCell) -> usize {
        usize::from(cell.row) * usize::from(self.size) + usize::from(cell.col)
    }

    /// Cell covering pixel `(x, y)` of a `width` x `height` surface.
    pub fn cell_at(&self, x: u32, y: u32, width: u32, height: u32) -> Option<GridCell> {
        if x >= width || y >= height {
            return None;
        }
        let size = u64::from(self.size);
        let col = u64::from(x) * size / u64::from(width);
        let row = u64::from(y) * size / u64::from(height);
        Some(GridCell {
            row: row as u16,
            col: col as u16,
        })
    }

    /// Source rectangle for `cell` in a `width` x `height` image. The
    /// rectangles of all cells tile the image exactly, and agree with
    /// [`RevealGrid::cell_at`]. Cells may be empty when the image has fewer
    /// pixels than the grid has cells per side.
    pub fn crop(&self, cell: GridCell, width: u32, height: u32) -> CropRect {
        let size = u64::from(self.size);
        let x0 = boundary(u64::from(cell.col), u64::from(width), size);
        let x1 = boundary(u64::from(cell.col) + 1, u64::from(width), size);
        let y0 = boundary(u64::from(cell.row), u64::from(height), size);
        let y1 = boundary(u64::from(cell.row) + 1, u64::from(height), size);
        CropRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// `ceil(step * extent / size)`, the first pixel belonging to `step`.
fn boundary(step: u64, extent: u64, size: u64) -> u32 {
    let value = (step * extent).div_ceil(size).min(extent);
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RevealState {
    pub fraction: f64,
    pub visible_cells: usize,
    pub total_cells: usize,
}

impl RevealState {
    pub fn is_complete(&self) -> bool {
        self.visible_cells >= self.total_cells
    }

    /// Whether the row-major cell `index` is currently shown.
    pub fn shows(&self, index: usize) -> bool {
        index < self.visible_cells
    }
}

/// Reveal progress for one featured item.
///
/// When the item carries no capture time, the instant the clock was mounted
/// is used instead, so the reveal starts from nothing and grows.
#[derive(Clone, Debug)]
pub struct RevealClock {
    id: String,
    basis: DateTime<Utc>,
    window: Duration,
    grid: RevealGrid,
}

impl RevealClock {
    pub fn new(record: &ImageRecord, mounted_at: DateTime<Utc>, config: &RevealConfig) -> Self {
        Self {
            id: record.id().to_string(),
            basis: record.captured_at().unwrap_or(mounted_at),
            window: config.window(),
            grid: RevealGrid::new(config.grid_size),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn grid(&self) -> RevealGrid {
        self.grid
    }

    pub fn state(&self, now: DateTime<Utc>) -> RevealState {
        let fraction = reveal_fraction(self.basis, now, self.window);
        let total_cells = self.grid.total_cells();
        RevealState {
            fraction,
            visible_cells: visible_cells(fraction, total_cells),
            total_cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const WINDOW: Duration = Duration::from_millis(3_600_000);

    fn capture() -> DateTime<Utc> {
        match DateTime::from_timestamp(1_757_624_400, 0) {
            Some(capture) => capture,
            None => panic!("valid timestamp"),
        }
    }

    #[test]
    fn half_window_reveals_half_the_grid() {
        let now = capture() + TimeDelta::milliseconds(1_800_000);
        let fraction = reveal_fraction(capture(), now, WINDOW);
        assert_eq!(fraction, 0.5);
        assert_eq!(visible_cells(fraction, RevealGrid::new(60).total_cells()), 1800);
    }

    #[test]
    fn fraction_is_clamped_at_both_ends() {
        let before = capture() - TimeDelta::seconds(5);
        assert_eq!(reveal_fraction(capture(), before, WINDOW), 0.0);
        assert_eq!(reveal_fraction(capture(), capture(), WINDOW), 0.0);
        let after = capture() + TimeDelta::hours(3);
        assert_eq!(reveal_fraction(capture(), after, WINDOW), 1.0);
        assert_eq!(visible_cells(1.0, 3600), 3600);
    }

    #[test]
    fn unknown_capture_starts_at_mount_time() {
        let record = ImageRecord::new("no-timestamp.png");
        let clock = RevealClock::new(&record, capture(), &RevealConfig::default());
        assert_eq!(clock.state(capture()).visible_cells, 0);

        let later = clock.state(capture() + TimeDelta::minutes(30));
        assert_eq!(later.visible_cells, 1800);
        assert!(!later.is_complete());
        assert!(clock.state(capture() + TimeDelta::hours(2)).is_complete());
    }

    #[test]
    fn known_capture_ignores_mount_time() {
        let record = ImageRecord::new("shots/a_20250911_210000_.png");
        let mounted = capture() + TimeDelta::minutes(15);
        let clock = RevealClock::new(&record, mounted, &RevealConfig::default());
        assert_eq!(clock.state(mounted).visible_cells, 900);
    }

    #[test]
    fn cells_are_row_major() {
        let grid = RevealGrid::new(60);
        assert_eq!(grid.cell(0), Some(GridCell { row: 0, col: 0 }));
        assert_eq!(grid.cell(61), Some(GridCell { row: 1, col: 1 }));
        assert_eq!(grid.cell(3599), Some(GridCell { row: 59, col: 59 }));
        assert_eq!(grid.cell(3600), None);
        assert_eq!(grid.index_of(GridCell { row: 1, col: 1 }), 61);
    }

    #[test]
    fn crops_tile_the_image_exactly() {
        let grid = RevealGrid::new(7);
        let (width, height) = (100u32, 45u32);
        let mut area = 0u64;
        for index in 0..grid.total_cells() {
            let Some(cell) = grid.cell(index) else {
                panic!("cell {index} missing");
            };
            let crop = grid.crop(cell, width, height);
            area += u64::from(crop.width) * u64::from(crop.height);
            for y in crop.y..crop.y + crop.height {
                for x in crop.x..crop.x + crop.width {
                    assert_eq!(grid.cell_at(x, y, width, height), Some(cell));
                }
            }
        }
        assert_eq!(area, u64::from(width) * u64::from(height));
    }

    proptest! {
        #[test]
        fn fraction_is_monotonic(a in 0i64..10_000_000, b in 0i64..10_000_000, offset in -5_000_000i64..5_000_000) {
            let (early, late) = if a <= b { (a, b) } else { (b, a) };
            let basis = capture();
            let at = |ms: i64| basis + TimeDelta::milliseconds(ms + offset);
            let early = reveal_fraction(basis, at(early), WINDOW);
            let late = reveal_fraction(basis, at(late), WINDOW);
            prop_assert!(early <= late);
            prop_assert!((0.0..=1.0).contains(&late));
        }

        #[test]
        fn cell_at_stays_inside_grid(size in 1u16..80, w in 1u32..400, h in 1u32..400, x in 0u32..400, y in 0u32..400) {
            let grid = RevealGrid::new(size);
            match grid.cell_at(x, y, w, h) {
                Some(cell) => {
                    prop_assert!(cell.row < size && cell.col < size);
                    let crop = grid.crop(cell, w, h);
                    prop_assert!(x >= crop.x && x < crop.x + crop.width);
                    prop_assert!(y >= crop.y && y < crop.y + crop.height);
                }
                None => prop_assert!(x >= w || y >= h),
            }
        }
    }
}
