use crate::errors::BoardError;
use crate::types::{Rect, SizeRequest};

/// Columns left blank between neighbouring panes in a row.
pub const COLUMN_GAP: u16 = 1;
/// Auto mode switches from one row to two at this many panes.
pub const AUTO_TWO_ROW_THRESHOLD: usize = 6;

/// Horizontal placement of one pane inside a packed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub row_group: usize,
    pub left: u16,
    pub width: u16,
    pub height: u16,
}

/// Packing canvas: configured dashboard bounds clamped to the live terminal.
pub fn canvas_size(bounds: (Option<u16>, Option<u16>), terminal: (u16, u16)) -> (u16, u16) {
    let width = bounds.0.map_or(terminal.0, |w| w.min(terminal.0));
    let height = bounds.1.map_or(terminal.1, |h| h.min(terminal.1));
    (width, height)
}

/// Packs panes left to right, wrapping to a new row group whenever the next
/// pane would cross the canvas width. Any `Auto` request switches the whole
/// dashboard to auto sizing.
pub fn pack(requests: &[SizeRequest], width: u16, height: u16) -> Result<Vec<Slot>, BoardError> {
    if requests.iter().any(|request| *request == SizeRequest::Auto) {
        return pack_auto(requests.len(), width, height);
    }

    let mut slots = Vec::with_capacity(requests.len());
    let mut row_group = 0usize;
    let mut cursor = 0u16;
    let mut row_started = false;
    for (idx, request) in requests.iter().enumerate() {
        let SizeRequest::Fixed {
            width: pane_width,
            height: pane_height,
        } = *request
        else {
            continue;
        };
        if pane_width == 0 || pane_height == 0 {
            return Err(BoardError::InvalidConfig(format!(
                "pane {idx} has an empty size {pane_width}x{pane_height}"
            )));
        }
        if pane_width > width {
            return Err(BoardError::InvalidConfig(format!(
                "pane {idx} width {pane_width} exceeds dashboard width {width}"
            )));
        }
        if pane_height > height {
            return Err(BoardError::InvalidConfig(format!(
                "pane {idx} height {pane_height} exceeds dashboard height {height}"
            )));
        }

        if row_started && u32::from(cursor) + u32::from(pane_width) > u32::from(width) {
            row_group += 1;
            cursor = 0;
        }
        slots.push(Slot {
            row_group,
            left: cursor,
            width: pane_width,
            height: pane_height,
        });
        cursor = cursor.saturating_add(pane_width).saturating_add(COLUMN_GAP);
        row_started = true;
    }
    Ok(slots)
}

fn pack_auto(count: usize, width: u16, height: u16) -> Result<Vec<Slot>, BoardError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let rows = if count < AUTO_TWO_ROW_THRESHOLD { 1 } else { 2 };
    let columns = count.div_ceil(rows);
    let gaps = (columns as u32 - 1) * u32::from(COLUMN_GAP);
    let pane_width = (u32::from(width).saturating_sub(gaps) / columns as u32) as u16;
    let pane_height = height / rows as u16;
    if pane_width < 2 || pane_height < 2 {
        return Err(BoardError::InvalidConfig(format!(
            "{width}x{height} is too small to auto-size {count} panes"
        )));
    }

    Ok((0..count)
        .map(|idx| Slot {
            row_group: idx / columns,
            left: (idx % columns) as u16 * (pane_width + COLUMN_GAP),
            width: pane_width,
            height: pane_height,
        })
        .collect())
}

/// Height of each row group: its tallest slot.
pub fn natural_row_heights(slots: &[Slot]) -> Vec<u16> {
    let groups = slots.iter().map(|slot| slot.row_group + 1).max().unwrap_or(0);
    let mut heights = vec![0u16; groups];
    for slot in slots {
        heights[slot.row_group] = heights[slot.row_group].max(slot.height);
    }
    heights
}

/// Stacks row groups top to bottom. Rows starting below the canvas are
/// hidden (`None`); rows crossing the bottom edge are clipped.
pub fn place(slots: &[Slot], row_heights: &[u16], canvas_height: u16) -> Vec<Option<Rect>> {
    let mut tops = Vec::with_capacity(row_heights.len());
    let mut next_top = 0u32;
    for height in row_heights {
        tops.push(next_top);
        next_top += u32::from(*height);
    }

    slots
        .iter()
        .map(|slot| {
            let top = *tops.get(slot.row_group)?;
            let row_height = row_heights.get(slot.row_group).copied().unwrap_or(slot.height);
            let height = u32::from(slot.height.min(row_height));
            if height == 0 || top >= u32::from(canvas_height) {
                return None;
            }
            let bottom = (top + height - 1).min(u32::from(canvas_height) - 1);
            Some(Rect {
                top: top as u16,
                left: slot.left,
                bottom: bottom as u16,
                right: slot.left + slot.width - 1,
            })
        })
        .collect()
}
