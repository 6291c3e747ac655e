use crate::errors::BoardError;
use crate::types::PaneColor;
use crossterm::cursor;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect as CellArea;
use ratatui::Terminal;
use std::io::stdout;
use unicode_width::UnicodeWidthStr;

/// The shared character-cell grid every pane draws into.
///
/// Writes only touch the in-memory grid; nothing reaches the terminal until
/// `present`. Callers serialize access through the dashboard lock.
pub trait Surface: Send {
    fn size(&self) -> (u16, u16);
    fn resize(&mut self, width: u16, height: u16);
    fn clear(&mut self);
    /// Returns false (and writes nothing) when the cell is outside the grid.
    fn set_cell(&mut self, x: u16, y: u16, ch: char, fg: PaneColor, bg: PaneColor) -> bool;
    fn present(&mut self) -> Result<(), BoardError>;
    fn snapshot_text(&self) -> String;
}

/// A ratatui `Buffer` presented through a ratatui `Terminal`.
pub struct CellSurface<B: Backend> {
    terminal: Terminal<B>,
    cells: Buffer,
}

impl<B: Backend> CellSurface<B> {
    pub fn new(backend: B) -> Result<Self, BoardError> {
        let terminal = Terminal::new(backend).map_err(|e| BoardError::Surface(e.to_string()))?;
        let size = terminal
            .size()
            .map_err(|e| BoardError::Surface(e.to_string()))?;
        Ok(Self {
            terminal,
            cells: Buffer::empty(CellArea::new(0, 0, size.width, size.height)),
        })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend + Send> Surface for CellSurface<B> {
    fn size(&self) -> (u16, u16) {
        (self.cells.area.width, self.cells.area.height)
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.cells.resize(CellArea::new(0, 0, width, height));
        self.cells.reset();
    }

    fn clear(&mut self) {
        self.cells.reset();
    }

    fn set_cell(&mut self, x: u16, y: u16, ch: char, fg: PaneColor, bg: PaneColor) -> bool {
        match self.cells.cell_mut((x, y)) {
            Some(cell) => {
                cell.set_char(ch).set_fg(fg.to_color()).set_bg(bg.to_color());
                true
            }
            None => false,
        }
    }

    fn present(&mut self) -> Result<(), BoardError> {
        let cells = &self.cells;
        self.terminal
            .draw(|frame| {
                let area = frame.area();
                let target = frame.buffer_mut();
                for y in 0..area.height.min(cells.area.height) {
                    for x in 0..area.width.min(cells.area.width) {
                        if let (Some(src), Some(dst)) = (cells.cell((x, y)), target.cell_mut((x, y)))
                        {
                            *dst = src.clone();
                        }
                    }
                }
            })
            .map(|_| ())
            .map_err(|e| BoardError::Surface(e.to_string()))
    }

    fn snapshot_text(&self) -> String {
        let mut out = String::new();
        for y in 0..self.cells.area.height {
            let mut covered = 0usize;
            for x in 0..self.cells.area.width {
                if covered > 0 {
                    covered -= 1;
                    continue;
                }
                let symbol = self.cells.cell((x, y)).map(|cell| cell.symbol()).unwrap_or(" ");
                out.push_str(symbol);
                covered = symbol.width().saturating_sub(1);
            }
            out.push('\n');
        }
        out
    }
}

/// Raw mode, alternate screen, hidden cursor and mouse capture for the
/// lifetime of the guard.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> Result<Self, BoardError> {
        enable_raw_mode().map_err(|e| BoardError::Surface(format!("enable raw mode: {e}")))?;
        let mut out = stdout();
        if let Err(e) = execute!(out, EnterAlternateScreen, cursor::Hide, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(BoardError::Surface(format!("enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut out = stdout();
        let _ = execute!(out, DisableMouseCapture, cursor::Show, LeaveAlternateScreen);
    }
}

#[cfg(test)]
mod tests {
    use super::{CellSurface, Surface};
    use crate::types::PaneColor;
    use ratatui::backend::TestBackend;
    use ratatui::style::Color;

    #[test]
    fn out_of_bounds_writes_are_skipped() {
        let mut surface = CellSurface::new(TestBackend::new(4, 2)).expect("surface");
        assert!(surface.set_cell(3, 1, 'x', PaneColor::Red, PaneColor::Default));
        assert!(!surface.set_cell(4, 0, 'y', PaneColor::Red, PaneColor::Default));
        assert!(!surface.set_cell(0, 2, 'z', PaneColor::Red, PaneColor::Default));
        assert_eq!(surface.snapshot_text(), "    \n   x\n");
    }

    #[test]
    fn present_copies_cells_to_backend() {
        let mut surface = CellSurface::new(TestBackend::new(3, 1)).expect("surface");
        surface.set_cell(1, 0, '#', PaneColor::Green, PaneColor::Black);
        surface.present().expect("present");
        let cell = surface.backend().buffer().cell((1, 0)).expect("cell");
        assert_eq!(cell.symbol(), "#");
        assert_eq!(cell.fg, Color::Green);
        assert_eq!(cell.bg, Color::Black);
    }

    #[test]
    fn resize_blanks_the_grid() {
        let mut surface = CellSurface::new(TestBackend::new(3, 1)).expect("surface");
        surface.set_cell(0, 0, 'a', PaneColor::White, PaneColor::Default);
        surface.resize(5, 2);
        assert_eq!(surface.size(), (5, 2));
        assert_eq!(surface.snapshot_text(), "     \n     \n");
    }
}
