//! Decorations drawn over the visible slice of the minimap: selection,
//! bookmarks, current line, find results, changed lines and the viewport
//! indicator. Also the panel placement and click rules the overlay config
//! controls.
//!
//! Mark positions are visual lines (after folds and soft wraps), the same
//! unit the raster rows use. The minimap image itself is never modified.

use std::ops::Range;

use anyhow::Result;

use crate::compositor::{Rgba, blend_pixel};
use crate::config::OverlayConfig;
use crate::image::MinimapImage;
use crate::scroll::ScrollState;

/// Width of the changed-line gutter bar, in pixels.
const CHANGE_BAR_WIDTH: u32 = 2;

/// Fill opacity of the viewport indicator relative to its color.
const VIEWPORT_FILL: f32 = 0.25;

/// Editor decorations to draw, in visual lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    /// Inclusive start, exclusive end.
    pub selections: Vec<Range<usize>>,
    pub bookmarks: Vec<usize>,
    pub current_line: Option<usize>,
    pub find_symbols: Vec<usize>,
    pub changes: Vec<usize>,
}

/// Build the panel image: the visible rows of `image` with `marks` and the
/// viewport indicator composited on top.
pub fn compose_panel(
    image: &MinimapImage,
    scroll: &ScrollState,
    overlay: &OverlayConfig,
    marks: &Marks,
) -> Result<MinimapImage> {
    let mut panel = image.crop_rows(scroll.visible_start, scroll.draw_height)?;
    let band = Band {
        ppl: scroll.pixels_per_line.max(1),
        top: scroll.visible_start,
    };

    if overlay.show_selection {
        for sel in &marks.selections {
            band.fill_lines(&mut panel, sel.clone(), 0, overlay.selection_color);
        }
    }
    if overlay.show_find_symbols {
        for &line in &marks.find_symbols {
            band.fill_lines(&mut panel, line..line + 1, 0, overlay.find_symbols_color);
        }
    }
    if overlay.show_bookmarks {
        for &line in &marks.bookmarks {
            band.fill_lines(&mut panel, line..line + 1, 0, overlay.bookmarks_color);
        }
    }
    if overlay.show_current_line
        && let Some(line) = marks.current_line
    {
        band.fill_lines(&mut panel, line..line + 1, 0, overlay.current_line_color);
    }
    if overlay.show_changes {
        for &line in &marks.changes {
            band.fill_lines(&mut panel, line..line + 1, CHANGE_BAR_WIDTH, overlay.changes_color);
        }
    }

    draw_viewport(&mut panel, scroll, overlay.viewport_color);
    Ok(panel)
}

/// Maps visual lines to panel rows.
struct Band {
    ppl: u32,
    top: u32,
}

impl Band {
    /// Blend `color` over the rows of `lines`. `width == 0` means the full
    /// panel width.
    fn fill_lines(&self, panel: &mut MinimapImage, lines: Range<usize>, width: u32, color: Rgba) {
        let row = |line: usize| u32::try_from(line).unwrap_or(u32::MAX).saturating_mul(self.ppl);
        let start = row(lines.start).max(self.top) - self.top;
        let end = row(lines.end).saturating_sub(self.top).min(panel.height());
        let width = if width == 0 { panel.width() } else { width.min(panel.width()) };
        for y in start..end {
            for x in 0..width {
                blend_pixel(panel, x, y, color);
            }
        }
    }
}

fn draw_viewport(panel: &mut MinimapImage, scroll: &ScrollState, color: Rgba) {
    let rect = scroll.viewport_indicator();
    let top = rect.y.max(0);
    let bottom = (rect.y + i64::from(rect.height)).min(i64::from(panel.height()));
    if top >= bottom {
        return;
    }
    let fill = color.with_alpha(color.a * VIEWPORT_FILL);
    let (top, bottom) = (top as u32, bottom as u32);
    let last_x = panel.width().saturating_sub(1);
    for y in top..bottom {
        let edge_row = y == top || y + 1 == bottom;
        for x in 0..panel.width() {
            let edge = edge_row || x == 0 || x == last_x;
            blend_pixel(panel, x, y, if edge { color } else { fill });
        }
    }
}

/// Horizontal panel position inside an editor `editor_width` pixels wide.
pub fn panel_x(editor_width: u32, panel_width: u32, overlay: &OverlayConfig) -> u32 {
    if overlay.right_aligned {
        editor_width.saturating_sub(panel_width)
    } else {
        0
    }
}

/// Panel width after a user drag to `requested`; a locked panel keeps
/// `configured`.
pub fn panel_width(requested: u32, configured: u32, overlay: &OverlayConfig) -> u32 {
    if overlay.width_locked {
        configured
    } else {
        requested.max(1)
    }
}

/// Line to jump to for a click at `panel_y`. Jumps happen on press or on
/// release depending on the config, so exactly one of the two returns a line.
pub fn click_target(
    scroll: &ScrollState,
    panel_y: u32,
    pressed: bool,
    overlay: &OverlayConfig,
) -> Option<usize> {
    (pressed == overlay.jump_on_mouse_down).then(|| scroll.line_at(panel_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RenderConfig, RenderStyle};
    use crate::scroll::Viewport;

    fn setup(lines: usize) -> (MinimapImage, ScrollState, OverlayConfig) {
        let cfg = RenderConfig {
            pixels_per_line: 2,
            image_width: 10,
            render_style: RenderStyle::Clean,
        };
        let mut scroll = ScrollState::new();
        scroll.compute_dimensions(lines, &cfg);
        scroll.recompute_visible(&Viewport {
            y: 0,
            height: 100,
            line_height: 10,
        });
        let image = MinimapImage::try_new(10, scroll.document_height + 200).unwrap();
        (image, scroll, Config::default().overlay)
    }

    #[test]
    fn panel_covers_visible_rows() {
        let (image, scroll, overlay) = setup(30);
        let panel = compose_panel(&image, &scroll, &overlay, &Marks::default()).unwrap();
        assert_eq!(panel.height(), scroll.draw_height);
        assert_eq!(panel.width(), 10);
        // Viewport: 100 editor px at 10 px/line = 10 lines = 20 rows.
        assert!(panel.band_has_ink(0, 1));
        assert!(panel.band_has_ink(19, 1));
        assert!(!panel.band_has_ink(20, 40));
    }

    #[test]
    fn marks_respect_toggles() {
        let (image, scroll, mut overlay) = setup(30);
        let marks = Marks {
            bookmarks: vec![15],
            changes: vec![20],
            ..Marks::default()
        };
        let panel = compose_panel(&image, &scroll, &overlay, &marks).unwrap();
        assert!(panel.band_has_ink(30, 2));
        assert!(!panel.band_has_ink(32, 2));
        // Change bar is a narrow gutter.
        assert_ne!(panel.pixel(1, 40).unwrap()[3], 0);
        assert_eq!(panel.pixel(2, 40).unwrap()[3], 0);

        overlay.show_bookmarks = false;
        overlay.show_changes = false;
        let panel = compose_panel(&image, &scroll, &overlay, &marks).unwrap();
        assert!(!panel.band_has_ink(30, 20));
    }

    #[test]
    fn selection_spans_lines() {
        let (image, scroll, overlay) = setup(30);
        let marks = Marks {
            selections: vec![12..15],
            current_line: Some(25),
            ..Marks::default()
        };
        let panel = compose_panel(&image, &scroll, &overlay, &marks).unwrap();
        assert!(!panel.band_has_ink(22, 2));
        assert!(panel.band_has_ink(24, 6));
        assert!(!panel.band_has_ink(30, 2));
        assert!(panel.band_has_ink(50, 2));
    }

    #[test]
    fn placement_and_clicks() {
        let (_, scroll, mut overlay) = setup(30);
        assert_eq!(panel_x(800, 110, &overlay), 690);
        overlay.right_aligned = false;
        assert_eq!(panel_x(800, 110, &overlay), 0);

        assert_eq!(panel_width(150, 110, &overlay), 150);
        overlay.width_locked = true;
        assert_eq!(panel_width(150, 110, &overlay), 110);

        assert_eq!(click_target(&scroll, 7, true, &overlay), Some(3));
        assert_eq!(click_target(&scroll, 7, false, &overlay), None);
        overlay.jump_on_mouse_down = false;
        assert_eq!(click_target(&scroll, 7, false, &overlay), Some(3));
    }
}
