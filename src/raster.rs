//! Raster engine: one full pass over a token stream, writing glyph
//! intensities into a persistent minimap image.
//!
//! Walk model:
//!   Every source line owns `pixels_per_line` image rows. A cursor `(x, y)`
//!   moves through the document one offset at a time; a glyph is painted at
//!   the cursor and then `x` advances by one column. Tabs advance four columns
//!   without painting, newlines and soft-wrap breaks start a new row.
//!
//! Row derivation:
//!   The row of a token's first unwalked offset is
//!   `(line + soft wraps before offset - folded lines) * pixels_per_line`.
//!   Every token continues from the offset the walk reached, so one that a
//!   fold skip ran into resumes at the fold end. A token starting beyond that
//!   offset is a gap and truncates the pass, unless a collapsed fold covers
//!   the gap.
//!   When that differs from the row the previous token ended on, the cursor
//!   column is recomputed by re-walking from the start of the source line.
//!   Within a token the walk itself tracks the row.
//!
//! Folds:
//!   An offset inside a collapsed region jumps straight to the region's end
//!   and adds the number of source lines the region spans to the folded-line
//!   count, so nothing inside a fold is ever painted.
//!
//! Concurrency:
//!   The engine takes `&mut self` for a pass and assumes exclusive access to
//!   its image; at most one pass runs at a time because the host gates calls
//!   through [`RenderCoordinator`](crate::coordinator::RenderCoordinator).
//!   Cancellation is polled once per token.

use std::time::Instant;

use log::{debug, warn};
use thiserror::Error;

use crate::compositor::{Rgba, set_pixel};
use crate::config::{RenderConfig, RenderStyle};
use crate::glyph::{clean_weight, weights_for};
use crate::image::MinimapImage;
use crate::scroll::ScrollState;
use crate::source::{DocumentText, FoldQuery, SoftWraps, Token};

/// Extra source lines of image height allocated on growth.
pub const SLACK_LINES: u32 = 100;

/// Columns a tab advances the cursor (no tab-stop alignment).
pub const TAB_WIDTH: i64 = 4;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("pixels_per_line must be between 1 and 4, got {0}")]
    UnsupportedPixelsPerLine(u32),
    #[error("failed to allocate a {width}x{height} minimap image")]
    Allocation { width: u32, height: u32 },
}

/// How a pass ended. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed,
    /// The cancellation check fired; the image holds a partial pass.
    Cancelled,
    /// A token referenced `offset` past the end of the text; the pass stopped
    /// there.
    Truncated { offset: usize },
}

/// Everything a pass reads from the document.
pub struct RenderInput<'a> {
    pub text: &'a dyn DocumentText,
    /// Ordered, gap-free tokens covering the document.
    pub tokens: &'a [Token],
    pub folds: &'a dyn FoldQuery,
    pub soft_wraps: &'a SoftWraps,
}

/// Owns the minimap image and refreshes it one pass at a time.
#[derive(Debug, Default)]
pub struct RasterEngine {
    image: Option<MinimapImage>,
    allocations: u64,
}

impl RasterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The image from the most recent pass, if any pass has run.
    pub fn image(&self) -> Option<&MinimapImage> {
        self.image.as_ref()
    }

    /// Number of image buffers allocated so far.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Run one full pass.
    ///
    /// `scroll` must already have been sized with
    /// [`ScrollState::compute_dimensions`] for this document and config.
    pub fn update(
        &mut self,
        input: &RenderInput<'_>,
        scroll: &ScrollState,
        config: &RenderConfig,
        is_cancelled: impl Fn() -> bool,
    ) -> Result<PassOutcome, RasterError> {
        if !(1..=4).contains(&config.pixels_per_line) {
            return Err(RasterError::UnsupportedPixelsPerLine(config.pixels_per_line));
        }
        let start = Instant::now();

        let image = self.ensure_image(scroll.document_height, config)?;
        image.clear();
        let outcome = walk_tokens(image, input, config, &is_cancelled);

        match outcome {
            PassOutcome::Truncated { offset } => warn!(
                "raster: token stream runs past the end of the text (offset {offset}, len {}), pass truncated",
                input.text.len()
            ),
            PassOutcome::Cancelled => debug!("raster: pass cancelled"),
            PassOutcome::Completed => {}
        }
        debug!(
            "raster: pass {:?} in {:.1}ms ({} tokens, {} chars, {} soft wraps, image {}x{})",
            outcome,
            start.elapsed().as_secs_f64() * 1000.0,
            input.tokens.len(),
            input.text.len(),
            input.soft_wraps.len(),
            image.width(),
            image.height()
        );
        Ok(outcome)
    }

    /// Make sure the image can hold the document, growing it with slack when
    /// it cannot. The height never shrinks.
    fn ensure_image(
        &mut self,
        document_height: u32,
        config: &RenderConfig,
    ) -> Result<&mut MinimapImage, RasterError> {
        match self.image.take() {
            Some(img) if img.height() >= document_height && img.width() == config.image_width => {
                Ok(self.image.insert(img))
            }
            old => {
                // Release the old buffer before allocating the new one.
                let old_height = old.map_or(0, |img| img.height());
                let slack = SLACK_LINES * config.pixels_per_line;
                let height = document_height.saturating_add(slack).max(old_height);
                let img = MinimapImage::try_new(config.image_width, height)?;
                self.allocations += 1;
                debug!(
                    "raster: allocated {}x{} image (document_height={document_height})",
                    config.image_width, height
                );
                Ok(self.image.insert(img))
            }
        }
    }
}

/// Skip over a collapsed fold at `offset`, counting the source lines it hides.
/// Returns the offset to continue from.
fn skip_fold(input: &RenderInput<'_>, offset: usize, folded_lines: &mut usize) -> Option<usize> {
    let region = input.folds.collapsed_region_at(offset)?;
    if region.end <= offset {
        return None;
    }
    let text = input.text;
    *folded_lines += text
        .line_number(region.end)
        .saturating_sub(text.line_number(region.start));
    Some(region.end)
}

/// Column of offset `to`, counted from `start` (the beginning of its source
/// line). Folds in between were already counted by the walk, so they are
/// jumped without touching the folded-line count. With `clip` set, counting
/// stops once the column passes it.
///
/// Returns where counting stopped and the column there, or the first offset
/// past the end of the text.
fn recount_column(
    input: &RenderInput<'_>,
    start: usize,
    to: usize,
    clip: Option<i64>,
) -> Result<(usize, i64), usize> {
    let mut i = start;
    let mut x = 0;
    while i < to {
        if let Some(region) = input.folds.collapsed_region_at(i).filter(|r| r.end > i) {
            i = region.end;
            continue;
        }
        let c = input.text.char_at(i).ok_or(i)?;
        if c != '\n' && input.soft_wraps.is_break(i) {
            x = 0;
        }
        x += if c == '\t' { TAB_WIDTH } else { 1 };
        i += 1;

        // Nothing past the right edge is drawn, stop counting.
        if clip.is_some_and(|w| x > w) {
            break;
        }
    }
    Ok((i, x))
}

fn walk_tokens(
    image: &mut MinimapImage,
    input: &RenderInput<'_>,
    config: &RenderConfig,
    is_cancelled: &dyn Fn() -> bool,
) -> PassOutcome {
    let text = input.text;
    let tokens = input.tokens;
    let wraps = input.soft_wraps;
    let ppl = i64::from(config.pixels_per_line);
    let clip_width = i64::from(config.image_width);
    let img_w = i64::from(image.width());
    let img_h = i64::from(image.height());

    let mut folded_lines = 0usize;
    let mut x: i64 = 0;
    let mut prev_y: Option<i64> = None;
    // Offset the walk reached; every token continues from here.
    let mut resume = 0usize;

    for token in tokens {
        if is_cancelled() {
            return PassOutcome::Cancelled;
        }
        // Already walked, e.g. swallowed by a fold skip.
        if token.end <= resume {
            continue;
        }
        // Tokens must tile the text; only a collapsed fold may hide a gap.
        if token.start > resume
            && !input
                .folds
                .collapsed_region_at(resume)
                .is_some_and(|r| r.end >= token.start)
        {
            return PassOutcome::Truncated { offset: resume };
        }
        let from = resume;
        let line = text.line_number(from);
        let visual_line = (line + wraps.breaks_before(from)) as i64 - folded_lines as i64;
        let mut y = visual_line * ppl;
        let mut i = from;

        if prev_y != Some(y) {
            // New row: recount the columns in front of the token.
            let clip = wraps.is_empty().then_some(clip_width);
            match recount_column(input, text.line_start(line), from, clip) {
                Ok((at, col)) => (i, x) = (at, col),
                Err(offset) => return PassOutcome::Truncated { offset },
            }
        }

        while i < token.end {
            if let Some(end) = skip_fold(input, i, &mut folded_lines) {
                i = end;
                continue;
            }
            let Some(c) = text.char_at(i) else {
                return PassOutcome::Truncated { offset: i };
            };
            if c != '\n' && wraps.is_break(i) {
                x = 0;
                y += ppl;
            }
            match c {
                '\n' => {
                    x = 0;
                    y += ppl;
                }
                '\t' => x += TAB_WIDTH,
                _ => {
                    if (0..img_w).contains(&x) && y >= 0 && y + ppl < img_h {
                        paint(image, x as u32, y as u32, c as u32, token.color, config);
                    }
                    x += 1;
                }
            }
            i += 1;
        }

        prev_y = Some(y);
        resume = i;
    }

    PassOutcome::Completed
}

fn paint(image: &mut MinimapImage, x: u32, y: u32, code: u32, color: Rgba, config: &RenderConfig) {
    match config.render_style {
        RenderStyle::Clean => render_clean(image, x, y, code, color, config.pixels_per_line),
        RenderStyle::Accurate => render_accurate(image, x, y, code, color, config.pixels_per_line),
    }
}

// ---------------------------------------------------------------------------
// Render styles
// ---------------------------------------------------------------------------

/// Clean style row multipliers, one table per `pixels_per_line`. A zero
/// leaves the row untouched, faking whitespace between lines.
const CLEAN_ROWS: [&[f32]; 4] = [
    &[0.6],
    &[0.3, 0.6],
    &[0.1, 0.6, 0.6],
    &[0.0, 0.6, 0.6, 0.6],
];

/// Which half of the glyph a sub-row samples, and its multiplier.
#[derive(Debug, Clone, Copy)]
enum Sample {
    Skip,
    Top(f32),
    Mid(f32),
    Bottom(f32),
}

const ACCURATE_ROWS: [&[Sample]; 4] = [
    &[Sample::Mid(1.0)],
    &[Sample::Top(0.5), Sample::Bottom(1.0)],
    &[Sample::Top(0.3), Sample::Mid(1.0), Sample::Bottom(0.7)],
    &[Sample::Skip, Sample::Top(1.0), Sample::Mid(1.0), Sample::Bottom(1.0)],
];

/// Paint one character with a flat per-class weight.
///
/// The caller guarantees rows `y..y + pixels_per_line` and column `x` are
/// inside the image. Whitespace and control characters touch nothing.
pub fn render_clean(
    image: &mut MinimapImage,
    x: u32,
    y: u32,
    code: u32,
    color: Rgba,
    pixels_per_line: u32,
) {
    let weight = clean_weight(code);
    if weight == 0.0 {
        return;
    }
    let Some(rows) = rows_for(&CLEAN_ROWS, pixels_per_line) else {
        return;
    };
    for (dy, &mult) in (0u32..).zip(rows.iter()) {
        if mult > 0.0 {
            set_pixel(image, x, y + dy, color, weight * mult);
        }
    }
}

/// Paint one character using its top/bottom ink weights, so asymmetric glyphs
/// stay distinguishable even at one or two rows per line.
pub fn render_accurate(
    image: &mut MinimapImage,
    x: u32,
    y: u32,
    code: u32,
    color: Rgba,
    pixels_per_line: u32,
) {
    let (top, bottom) = weights_for(code);
    if top == 0.0 && bottom == 0.0 {
        return;
    }
    let Some(rows) = rows_for(&ACCURATE_ROWS, pixels_per_line) else {
        return;
    };
    let mid = (top + bottom) / 2.0;
    for (dy, sample) in (0u32..).zip(rows.iter()) {
        let alpha = match *sample {
            Sample::Skip => continue,
            Sample::Top(m) => top * m,
            Sample::Mid(m) => mid * m,
            Sample::Bottom(m) => bottom * m,
        };
        set_pixel(image, x, y + dy, color, alpha);
    }
}

fn rows_for<T>(tables: &[&'static [T]; 4], pixels_per_line: u32) -> Option<&'static [T]> {
    debug_assert!(
        (1..=4).contains(&pixels_per_line),
        "pixels_per_line {pixels_per_line} reached a render style"
    );
    tables.get((pixels_per_line as usize).checked_sub(1)?).copied()
}
