use crate::config::PaneConfig;
use crate::surface::Surface;
use crate::types::{BorderStyle, ColorPair, PaneColor, Rect};
use ratatui::symbols::border;
use std::sync::Arc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const BLANK_BORDER: border::Set = border::Set {
    top_left: " ",
    top_right: " ",
    bottom_left: " ",
    bottom_right: " ",
    vertical_left: " ",
    vertical_right: " ",
    horizontal_top: " ",
    horizontal_bottom: " ",
};

/// One bordered region of the dashboard and the text it last received.
#[derive(Debug, Clone)]
pub struct Pane {
    config: Arc<PaneConfig>,
    rect: Option<Rect>,
    row_group: usize,
    content: String,
    status: String,
    border_colors: ColorPair,
    shrink: bool,
}

impl Pane {
    pub fn new(config: Arc<PaneConfig>, shrink: bool) -> Self {
        let border_colors = config.border_colors;
        Self {
            config,
            rect: None,
            row_group: 0,
            content: String::new(),
            status: String::new(),
            border_colors,
            shrink,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn row_group(&self) -> usize {
        self.row_group
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn border_colors(&self) -> ColorPair {
        self.border_colors
    }

    pub fn place(&mut self, rect: Option<Rect>, row_group: usize) {
        self.rect = rect;
        self.row_group = row_group;
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Focus highlight swaps the configured border colours; clearing it
    /// restores them exactly.
    pub fn set_highlight(&mut self, on: bool) {
        self.border_colors = if on {
            self.config.border_colors.swapped()
        } else {
            self.config.border_colors
        };
    }

    pub fn is_highlighted(&self) -> bool {
        self.border_colors != self.config.border_colors
    }

    /// Row holding the bottom border. In shrink mode this is one row below
    /// the last content row, or the row under the top border when nothing
    /// has been written yet; always derived from the current content.
    pub fn box_bottom(&self) -> Option<u16> {
        let rect = self.rect?;
        if !self.shrink {
            return Some(rect.bottom);
        }
        let used = self.flowed_lines(rect).len() as u16;
        let last_content_row = rect.top + used;
        Some((last_content_row + 1).min(rect.bottom).max(rect.top))
    }

    /// Height the pane needs for its current content inside a slot of the
    /// given size: borders plus flowed lines, never more than the slot.
    pub fn fitted_height(&self, slot_width: u16, slot_height: u16) -> u16 {
        let lines = flow_text(
            &self.content,
            slot_width.saturating_sub(2),
            slot_height.saturating_sub(2),
            self.config.wrap,
        );
        (lines.len() as u16 + 2).min(slot_height)
    }

    /// Full render: wipe the owned rectangle below the box, then border,
    /// header, content and status.
    pub fn draw(&self, surface: &mut dyn Surface) {
        let (Some(rect), Some(bottom)) = (self.rect, self.box_bottom()) else {
            return;
        };
        for row in (bottom + 1)..=rect.bottom {
            for col in rect.left..=rect.right {
                surface.set_cell(col, row, ' ', PaneColor::Default, PaneColor::Default);
            }
        }
        self.draw_border(surface, rect, bottom);
        self.draw_header(surface, rect);
        self.draw_content(surface, rect, bottom);
        self.draw_status(surface, rect, bottom);
    }

    /// Border, header and status only; the interior is left untouched.
    pub fn draw_decoration(&self, surface: &mut dyn Surface) {
        let (Some(rect), Some(bottom)) = (self.rect, self.box_bottom()) else {
            return;
        };
        self.draw_border(surface, rect, bottom);
        self.draw_header(surface, rect);
        self.draw_status(surface, rect, bottom);
    }

    fn glyphs(&self) -> &'static border::Set {
        match self.config.border_style {
            BorderStyle::Box => &border::PLAIN,
            BorderStyle::Transparent => &BLANK_BORDER,
        }
    }

    fn label_colors(&self) -> ColorPair {
        let fg = match self.border_colors.bg {
            PaneColor::Default => PaneColor::Black,
            other => other,
        };
        ColorPair::new(fg, self.border_colors.fg)
    }

    fn draw_border(&self, surface: &mut dyn Surface, rect: Rect, bottom: u16) {
        let glyphs = self.glyphs();
        let ColorPair { fg, bg } = self.border_colors;
        for col in rect.left..=rect.right {
            surface.set_cell(col, rect.top, glyph(glyphs.horizontal_top), fg, bg);
            surface.set_cell(col, bottom, glyph(glyphs.horizontal_bottom), fg, bg);
        }
        for row in rect.top..=bottom {
            surface.set_cell(rect.left, row, glyph(glyphs.vertical_left), fg, bg);
            surface.set_cell(rect.right, row, glyph(glyphs.vertical_right), fg, bg);
        }
        surface.set_cell(rect.left, rect.top, glyph(glyphs.top_left), fg, bg);
        surface.set_cell(rect.right, rect.top, glyph(glyphs.top_right), fg, bg);
        surface.set_cell(rect.left, bottom, glyph(glyphs.bottom_left), fg, bg);
        surface.set_cell(rect.right, bottom, glyph(glyphs.bottom_right), fg, bg);
    }

    fn draw_header(&self, surface: &mut dyn Surface, rect: Rect) {
        let Some(name) = self.config.name.as_deref() else {
            return;
        };
        let label = format!("  {name}  ");
        let available = rect.width().saturating_sub(2);
        let used = (label.width() as u16).min(available);
        let start = rect.left + 1 + (available - used) / 2;
        let colors = self.label_colors();
        put_text(surface, start, rect.top, start + used, &label, colors);
    }

    fn draw_content(&self, surface: &mut dyn Surface, rect: Rect, bottom: u16) {
        let ColorPair { fg, bg } = self.config.content_colors;
        let first_row = rect.top + 1;
        let first_col = rect.left + 1;
        for row in first_row..bottom {
            for col in first_col..rect.right {
                surface.set_cell(col, row, ' ', fg, bg);
            }
        }
        for (line_idx, line) in self.flowed_lines(rect).into_iter().enumerate() {
            let row = first_row + line_idx as u16;
            if row >= bottom {
                break;
            }
            put_text(surface, first_col, row, rect.right, &line, ColorPair::new(fg, bg));
        }
    }

    fn draw_status(&self, surface: &mut dyn Surface, rect: Rect, bottom: u16) {
        if self.status.is_empty() || bottom == rect.top {
            return;
        }
        let text = format!(" {} ", self.status);
        put_text(surface, rect.left + 1, bottom, rect.right, &text, self.label_colors());
    }

    fn flowed_lines(&self, rect: Rect) -> Vec<String> {
        flow_text(
            &self.content,
            rect.width().saturating_sub(2),
            rect.height().saturating_sub(2),
            self.config.wrap,
        )
    }
}

fn glyph(symbol: &str) -> char {
    symbol.chars().next().unwrap_or(' ')
}

/// Writes `text` from `left` up to (not including) `limit`, advancing by
/// display width. A wide glyph that would cross `limit` ends the write; the
/// cell it covers on the right is blanked.
fn put_text(
    surface: &mut dyn Surface,
    left: u16,
    row: u16,
    limit: u16,
    text: &str,
    colors: ColorPair,
) {
    let mut col = left;
    for ch in text.chars() {
        let cells = ch.width().unwrap_or(0) as u16;
        if cells == 0 {
            continue;
        }
        if col + cells > limit {
            break;
        }
        surface.set_cell(col, row, ch, colors.fg, colors.bg);
        for covered in col + 1..col + cells {
            surface.set_cell(covered, row, ' ', colors.fg, colors.bg);
        }
        col += cells;
    }
}

/// Streams `text` into rows of at most `width` display cells. A newline ends
/// the current row; a wide glyph that does not fit moves to the next row.
/// With `wrap` off, the first row that overflows is kept truncated and
/// everything after it is dropped. Zero-width characters are skipped.
pub fn flow_text(text: &str, width: u16, max_rows: u16, wrap: bool) -> Vec<String> {
    let width = usize::from(width);
    let max_rows = usize::from(max_rows);
    let mut rows = Vec::new();
    if width == 0 || max_rows == 0 {
        return rows;
    }

    let mut current = String::new();
    let mut filled = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            rows.push(std::mem::take(&mut current));
            filled = 0;
            if rows.len() >= max_rows {
                return rows;
            }
            continue;
        }
        if ch == '\r' {
            continue;
        }
        let ch = if ch.is_control() { ' ' } else { ch };
        let cells = ch.width().unwrap_or(0);
        if cells == 0 || cells > width {
            continue;
        }
        if filled + cells > width {
            rows.push(std::mem::take(&mut current));
            filled = 0;
            if !wrap || rows.len() >= max_rows {
                return rows;
            }
        }
        current.push(ch);
        filled += cells;
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}
