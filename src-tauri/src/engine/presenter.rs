//! Windowing contract for the virtualized traitor list.

use serde::{Deserialize, Serialize};

/// Fixed row height of the list, in pixels.
pub const ROW_HEIGHT: f64 = 72.0;
/// Rows rendered above and below the visible area.
pub const OVERSCAN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
}

/// Which rows to draw and where.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VirtualWindow {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    /// Pixel offset of row `start`.
    pub offset_top: f64,
    pub total_height: f64,
}

pub fn visible_window(count: usize, viewport: Viewport, row_height: f64, overscan: usize) -> VirtualWindow {
    let total_height = count as f64 * row_height;
    if count == 0 || row_height <= 0.0 {
        return VirtualWindow { start: 0, end: 0, offset_top: 0.0, total_height };
    }

    let scroll_top = viewport.scroll_top.max(0.0);
    let height = viewport.height.max(0.0);

    let first_visible = ((scroll_top / row_height).floor() as usize).min(count - 1);
    let last_visible = (((scroll_top + height) / row_height).ceil() as usize).clamp(first_visible + 1, count);

    let start = first_visible.saturating_sub(overscan);
    let end = (last_visible + overscan).min(count);

    VirtualWindow {
        start,
        end,
        offset_top: start as f64 * row_height,
        total_height,
    }
}
