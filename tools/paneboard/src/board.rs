use crate::config::DashboardConfig;
use crate::errors::BoardError;
use crate::layout::{canvas_size, natural_row_heights, pack, place, Slot};
use crate::pane::Pane;
use crate::surface::Surface;
use crate::types::{PaneColor, SizeRequest};

pub const LOADING_PLACEHOLDER: &str = "loading…";

/// Everything that touches the shared surface. Only reachable through the
/// dashboard lock, so each method runs as one serialized write + present.
pub struct Board {
    surface: Box<dyn Surface>,
    panes: Vec<Pane>,
    requests: Vec<SizeRequest>,
    focus: Option<usize>,
    bounds: (Option<u16>, Option<u16>),
    shrink: bool,
    slots: Vec<Slot>,
    row_heights: Vec<u16>,
    canvas_height: u16,
    notice: Option<String>,
}

impl Board {
    /// Packs the panes against the surface's current size. A pane that does
    /// not fit is a configuration error and nothing is drawn.
    pub fn new(config: &DashboardConfig, surface: Box<dyn Surface>) -> Result<Self, BoardError> {
        let panes = config
            .panes
            .iter()
            .map(|pane| Pane::new(pane.clone(), config.shrink))
            .collect();
        let mut board = Self {
            surface,
            panes,
            requests: config.size_requests(),
            focus: None,
            bounds: (config.width, config.height),
            shrink: config.shrink,
            slots: Vec::new(),
            row_heights: Vec::new(),
            canvas_height: 0,
            notice: None,
        };
        board.relayout()?;
        Ok(board)
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn pane(&self, idx: usize) -> Option<&Pane> {
        self.panes.get(idx)
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn surface(&self) -> &dyn Surface {
        self.surface.as_ref()
    }

    pub fn snapshot_text(&self) -> String {
        self.surface.snapshot_text()
    }

    /// Packs from scratch against the current surface size.
    fn relayout(&mut self) -> Result<(), BoardError> {
        let (width, height) = canvas_size(self.bounds, self.surface.size());
        self.slots = pack(&self.requests, width, height)?;
        self.canvas_height = height;
        self.place_panes();
        Ok(())
    }

    fn place_panes(&mut self) {
        let heights = self.current_row_heights();
        let rects = place(&self.slots, &heights, self.canvas_height);
        for ((pane, slot), rect) in self.panes.iter_mut().zip(&self.slots).zip(rects) {
            pane.place(rect, slot.row_group);
        }
        self.row_heights = heights;
    }

    /// Shrink mode sizes each row to its tallest fitted pane; otherwise rows
    /// take their tallest requested height.
    fn current_row_heights(&self) -> Vec<u16> {
        if !self.shrink {
            return natural_row_heights(&self.slots);
        }
        let mut heights = vec![0u16; self.row_heights_len()];
        for (pane, slot) in self.panes.iter().zip(&self.slots) {
            let fitted = pane.fitted_height(slot.width, slot.height);
            heights[slot.row_group] = heights[slot.row_group].max(fitted);
        }
        heights
    }

    fn row_heights_len(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| slot.row_group + 1)
            .max()
            .unwrap_or(0)
    }

    /// Clear and draw every pane, then present.
    pub fn redraw_all(&mut self) -> Result<(), BoardError> {
        self.surface.clear();
        if let Some(notice) = &self.notice {
            for (col, ch) in notice.chars().enumerate() {
                let Ok(col) = u16::try_from(col) else {
                    break;
                };
                if !self
                    .surface
                    .set_cell(col, 0, ch, PaneColor::Yellow, PaneColor::Default)
                {
                    break;
                }
            }
        }
        for pane in &self.panes {
            pane.draw(self.surface.as_mut());
        }
        self.surface.present()
    }

    /// Resize the surface, repack, redraw. A terminal too small for the
    /// configured panes hides them behind a notice instead of failing.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<Option<String>, BoardError> {
        self.surface.resize(width, height);
        let rejected = match self.relayout() {
            Ok(()) => {
                self.notice = None;
                None
            }
            Err(error) => {
                self.slots.clear();
                self.row_heights.clear();
                for pane in &mut self.panes {
                    pane.place(None, 0);
                }
                let message = format!("terminal too small ({width}x{height}): {error}");
                self.notice = Some(message.clone());
                Some(message)
            }
        };
        self.redraw_all()?;
        Ok(rejected)
    }

    pub fn visible_panes(&self) -> usize {
        self.panes.iter().filter(|pane| pane.rect().is_some()).count()
    }

    /// Store new content for one pane and draw it. In shrink mode a change in
    /// the pane's row height reflows every row.
    pub fn apply_refresh(
        &mut self,
        idx: usize,
        content: String,
        status: String,
    ) -> Result<(), BoardError> {
        let Some(pane) = self.panes.get_mut(idx) else {
            return Ok(());
        };
        pane.set_content(content);
        pane.set_status(status);

        if self.shrink && self.current_row_heights() != self.row_heights {
            self.place_panes();
            return self.redraw_all();
        }
        self.panes[idx].draw(self.surface.as_mut());
        self.surface.present()
    }

    pub fn set_status(&mut self, idx: usize, status: &str) -> Result<(), BoardError> {
        let Some(pane) = self.panes.get_mut(idx) else {
            return Ok(());
        };
        pane.set_status(status);
        self.panes[idx].draw_decoration(self.surface.as_mut());
        self.surface.present()
    }

    pub fn show_loading(&mut self, idx: usize) -> Result<(), BoardError> {
        self.apply_refresh(
            idx,
            LOADING_PLACEHOLDER.to_string(),
            LOADING_PLACEHOLDER.to_string(),
        )
    }

    /// Move focus one pane forward or back, wrapping at either end. Only the
    /// two affected borders are redrawn.
    pub fn step_focus(&mut self, forward: bool) -> Result<(), BoardError> {
        let Some(next) = next_focus(self.focus, self.panes.len(), forward) else {
            return Ok(());
        };
        if let Some(current) = self.focus {
            self.highlight(current, false);
        }
        self.focus = Some(next);
        self.highlight(next, true);
        self.surface.present()
    }

    /// Drop the highlight but remember which pane had focus.
    pub fn clear_highlight(&mut self) -> Result<(), BoardError> {
        let Some(current) = self.focus else {
            return Ok(());
        };
        self.highlight(current, false);
        self.surface.present()
    }

    fn highlight(&mut self, idx: usize, on: bool) {
        if let Some(pane) = self.panes.get_mut(idx) {
            pane.set_highlight(on);
            pane.draw_decoration(self.surface.as_mut());
        }
    }
}

pub fn next_focus(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (current, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(idx), true) => (idx + 1) % len,
        (Some(idx), false) => (idx + len - 1) % len,
    })
}

#[cfg(test)]
mod tests {
    use super::{next_focus, Board};
    use crate::config::{DashboardConfig, PaneConfig};
    use crate::surface::CellSurface;
    use crate::types::SizeRequest;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn dashboard(shrink: bool, sizes: &[(u16, u16)]) -> DashboardConfig {
        DashboardConfig {
            name: "ops".to_string(),
            width: None,
            height: None,
            shrink,
            panes: sizes
                .iter()
                .enumerate()
                .map(|(idx, (width, height))| {
                    let mut pane = PaneConfig::new(&format!("p{idx}"), "true");
                    pane.size = SizeRequest::Fixed {
                        width: *width,
                        height: *height,
                    };
                    Arc::new(pane)
                })
                .collect(),
        }
    }

    fn board(shrink: bool, sizes: &[(u16, u16)], width: u16, height: u16) -> Board {
        let surface = CellSurface::new(TestBackend::new(width, height)).expect("surface");
        Board::new(&dashboard(shrink, sizes), Box::new(surface)).expect("board")
    }

    #[test]
    fn focus_wraps_in_both_directions() {
        assert_eq!(next_focus(None, 3, true), Some(0));
        assert_eq!(next_focus(Some(2), 3, true), Some(0));
        assert_eq!(next_focus(Some(0), 3, false), Some(2));
        assert_eq!(next_focus(None, 3, false), Some(2));
        assert_eq!(next_focus(None, 0, true), None);
    }

    #[test]
    fn oversized_pane_fails_before_drawing() {
        let surface = CellSurface::new(TestBackend::new(20, 5)).expect("surface");
        assert!(Board::new(&dashboard(false, &[(30, 3)]), Box::new(surface)).is_err());
    }

    #[test]
    fn resize_too_small_hides_panes_and_recovers() {
        let mut board = board(false, &[(40, 10), (40, 10)], 100, 10);
        assert_eq!(board.visible_panes(), 2);

        let rejected = board.resize(30, 10).expect("resize");
        assert!(rejected.is_some());
        assert_eq!(board.visible_panes(), 0);
        assert!(board.snapshot_text().starts_with("terminal too small"));

        assert!(board.resize(100, 10).expect("resize").is_none());
        assert_eq!(board.visible_panes(), 2);
        assert!(board.notice().is_none());
    }

    #[test]
    fn resize_repacks_into_new_rows() {
        let mut board = board(false, &[(40, 5), (40, 5)], 100, 10);
        assert_eq!(board.pane(1).and_then(|p| p.rect()).map(|r| r.top), Some(0));
        board.resize(60, 10).expect("resize");
        let second = board.pane(1).and_then(|p| p.rect()).expect("rect");
        assert_eq!((second.top, second.left), (5, 0));
        assert_eq!(board.pane(1).map(|p| p.row_group()), Some(1));
    }

    #[test]
    fn shrink_mode_grows_rows_with_content() {
        let mut board = board(true, &[(20, 8), (20, 8)], 20, 16);
        assert_eq!(board.pane(1).and_then(|p| p.rect()).map(|r| r.top), Some(2));

        board
            .apply_refresh(0, "a\nb\nc".to_string(), "took 0s".to_string())
            .expect("refresh");
        assert_eq!(board.pane(1).and_then(|p| p.rect()).map(|r| r.top), Some(5));

        board
            .apply_refresh(0, "a".to_string(), "took 0s".to_string())
            .expect("refresh");
        assert_eq!(board.pane(1).and_then(|p| p.rect()).map(|r| r.top), Some(3));
    }

    #[test]
    fn escape_keeps_focus_index_but_drops_highlight() {
        let mut board = board(false, &[(10, 4), (10, 4)], 30, 4);
        board.step_focus(true).expect("focus");
        assert!(board.pane(0).map(|p| p.is_highlighted()).unwrap_or(false));
        board.clear_highlight().expect("clear");
        assert_eq!(board.focus(), Some(0));
        assert!(board.panes().iter().all(|pane| !pane.is_highlighted()));
        board.step_focus(true).expect("focus");
        assert_eq!(board.focus(), Some(1));
        assert!(!board.pane(0).map(|p| p.is_highlighted()).unwrap_or(true));
    }

    #[test]
    fn loading_placeholder_fills_content_and_status() {
        let mut board = board(false, &[(20, 4)], 20, 4);
        board.show_loading(0).expect("loading");
        let frame = board.snapshot_text();
        assert!(frame.lines().nth(1).unwrap_or_default().contains("loading…"));
        assert!(frame.lines().nth(3).unwrap_or_default().contains("loading…"));
    }
}
