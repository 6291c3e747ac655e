use ratatui::style::Color;

/// Named terminal palette accepted by the `color-*` pane keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaneColor {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl PaneColor {
    /// Unknown names fall back to `Default`.
    pub fn from_name(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "black" => Self::Black,
            "red" => Self::Red,
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "blue" => Self::Blue,
            "magenta" => Self::Magenta,
            "cyan" => Self::Cyan,
            "white" => Self::White,
            _ => Self::Default,
        }
    }

    pub fn to_color(self) -> Color {
        match self {
            Self::Default => Color::Reset,
            Self::Black => Color::Black,
            Self::Red => Color::Red,
            Self::Green => Color::Green,
            Self::Yellow => Color::Yellow,
            Self::Blue => Color::Blue,
            Self::Magenta => Color::Magenta,
            Self::Cyan => Color::Cyan,
            Self::White => Color::White,
        }
    }
}

/// Foreground/background pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub fg: PaneColor,
    pub bg: PaneColor,
}

impl ColorPair {
    pub fn new(fg: PaneColor, bg: PaneColor) -> Self {
        Self { fg, bg }
    }

    pub fn swapped(self) -> Self {
        Self {
            fg: self.bg,
            bg: self.fg,
        }
    }
}

/// Inclusive cell rectangle: `top..=bottom` rows, `left..=right` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub top: u16,
    pub left: u16,
    pub bottom: u16,
    pub right: u16,
}

impl Rect {
    pub fn width(&self) -> u16 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u16 {
        self.bottom - self.top + 1
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }

    pub fn fits_within(&self, width: u16, height: u16) -> bool {
        self.right < width && self.bottom < height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRequest {
    Fixed { width: u16, height: u16 },
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    Box,
    Transparent,
}

#[cfg(test)]
mod tests {
    use super::{ColorPair, PaneColor, Rect};

    #[test]
    fn unknown_color_names_fall_back_to_default() {
        assert_eq!(PaneColor::from_name("Cyan"), PaneColor::Cyan);
        assert_eq!(PaneColor::from_name(" white "), PaneColor::White);
        assert_eq!(PaneColor::from_name("chartreuse"), PaneColor::Default);
    }

    #[test]
    fn swapped_pair_is_reversible() {
        let pair = ColorPair::new(PaneColor::White, PaneColor::Blue);
        assert_eq!(pair.swapped(), ColorPair::new(PaneColor::Blue, PaneColor::White));
        assert_eq!(pair.swapped().swapped(), pair);
    }

    #[test]
    fn adjacent_rects_do_not_overlap() {
        let a = Rect {
            top: 0,
            left: 0,
            bottom: 9,
            right: 39,
        };
        let b = Rect {
            top: 0,
            left: 41,
            bottom: 9,
            right: 80,
        };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&a));
        assert_eq!(a.width(), 40);
        assert_eq!(a.height(), 10);
        assert!(b.fits_within(100, 10));
        assert!(!b.fits_within(80, 10));
    }
}
