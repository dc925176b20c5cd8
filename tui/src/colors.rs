use ratatui::style::Color;

pub(crate) fn background() -> Color {
    Color::Black
}

pub(crate) fn text() -> Color {
    Color::White
}

pub(crate) fn text_dim() -> Color {
    Color::Gray
}

/// Dim layer drawn behind the revealed transmission.
pub(crate) fn overlay() -> Color {
    Color::Rgb(18, 18, 22)
}

pub(crate) fn caption_background() -> Color {
    Color::Rgb(24, 24, 24)
}

pub(crate) fn selection() -> Color {
    Color::Yellow
}

/// Shade of the pattern shown in place of an image that failed to load.
pub(crate) fn broken(even: bool) -> [u8; 3] {
    if even { [70, 70, 70] } else { [40, 40, 40] }
}
