//! Geometry: document pixel size, the slice of the minimap that is on
//! screen, and where the editor viewport sits inside it.
//!
//! The minimap panel is as tall as the editor viewport. When the document is
//! taller than the panel, the minimap itself scrolls proportionally with the
//! editor so that the top of the document lines up at scroll 0 and the bottom
//! at maximum scroll.

use crate::config::RenderConfig;

/// Editor viewport in editor pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Vertical scroll offset of the editor.
    pub y: i64,
    /// Visible height of the editor (and of the minimap panel).
    pub height: u32,
    /// Editor pixels per visual line.
    pub line_height: u32,
}

/// Fully derived minimap geometry. Recomputed, never patched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollState {
    pub pixels_per_line: u32,
    /// Minimap pixels per editor pixel.
    pub scale: f64,
    pub document_width: u32,
    pub document_height: u32,
    /// First image row drawn at the top of the panel.
    pub visible_start: u32,
    /// One past the last image row drawn.
    pub visible_end: u32,
    /// Panel rows covered by the image.
    pub draw_height: u32,
    /// Editor viewport top, in image rows.
    pub viewport_start: u32,
    /// Editor viewport height, in image rows.
    pub viewport_height: u32,
}

/// Viewport indicator rectangle in panel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorRect {
    pub y: i64,
    pub height: u32,
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the document from its visual line count.
    pub fn compute_dimensions(&mut self, line_count: usize, config: &RenderConfig) {
        self.pixels_per_line = config.pixels_per_line;
        self.document_width = config.image_width;
        self.document_height = u32::try_from(line_count)
            .unwrap_or(u32::MAX)
            .saturating_mul(config.pixels_per_line);
    }

    /// Derive the visible window from the editor viewport.
    pub fn recompute_visible(&mut self, viewport: &Viewport) {
        let line_height = viewport.line_height.max(1);
        self.scale = f64::from(self.pixels_per_line) / f64::from(line_height);

        let doc_h = self.document_height;
        self.viewport_start = ((viewport.y.max(0) as f64 * self.scale) as u32).min(doc_h);
        self.viewport_height = ((f64::from(viewport.height) * self.scale) as u32).min(doc_h);
        self.draw_height = viewport.height.min(doc_h);

        // Editor scroll range and minimap scroll range, both in image rows.
        let editor_range = doc_h.saturating_sub(self.viewport_height);
        let map_range = doc_h - self.draw_height;
        self.visible_start = if map_range == 0 || editor_range == 0 {
            0
        } else {
            let progress = f64::from(self.viewport_start.min(editor_range)) / f64::from(editor_range);
            ((progress * f64::from(map_range)) as u32).min(map_range)
        };
        self.visible_end = (self.visible_start + self.draw_height).min(doc_h);
    }

    /// Where the editor viewport is drawn on the panel.
    pub fn viewport_indicator(&self) -> IndicatorRect {
        IndicatorRect {
            y: i64::from(self.viewport_start) - i64::from(self.visible_start),
            height: self.viewport_height.max(1),
        }
    }

    /// Visual line under a panel row, e.g. for jump-on-click.
    pub fn line_at(&self, panel_y: u32) -> usize {
        let row = self
            .visible_start
            .saturating_add(panel_y)
            .min(self.document_height.saturating_sub(1));
        (row / self.pixels_per_line.max(1)) as usize
    }
}
