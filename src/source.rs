//! Document-side inputs to a render pass: text, tokens, folds and soft wraps.
//!
//! Offsets are character indices into the document (one `char` each), lines
//! are separated by `\n`. The traits are what a host editor implements; the
//! concrete types are in-memory versions used by the CLI and the tests.

use std::ops::Range;

use crate::compositor::Rgba;

/// A contiguous document range drawn in one foreground color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub color: Rgba,
}

impl Token {
    pub fn new(range: Range<usize>, color: Rgba) -> Self {
        Self {
            start: range.start,
            end: range.end,
            color,
        }
    }
}

/// Indexable document text.
pub trait DocumentText {
    /// Number of characters.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Character at `offset`, `None` past the end.
    fn char_at(&self, offset: usize) -> Option<char>;

    /// Number of lines (an empty document has one line).
    fn line_count(&self) -> usize;

    /// 0-based line containing `offset`. Offsets past the end map to the last
    /// line.
    fn line_number(&self, offset: usize) -> usize;

    /// Offset of the first character of `line`.
    fn line_start(&self, line: usize) -> usize;
}

/// Collapsed fold lookup.
pub trait FoldQuery {
    /// The collapsed region containing `offset`, if any.
    fn collapsed_region_at(&self, offset: usize) -> Option<Range<usize>>;

    fn is_collapsed(&self, offset: usize) -> bool {
        self.collapsed_region_at(offset).is_some()
    }
}

// ---------------------------------------------------------------------------
// TextBuffer
// ---------------------------------------------------------------------------

/// Document text held as chars plus a line-start index.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    chars: Vec<char>,
    line_starts: Vec<usize>,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut line_starts = vec![0];
        line_starts.extend(
            chars
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self { chars, line_starts }
    }

    /// Offset range of `line`, excluding its newline.
    pub fn line_range(&self, line: usize) -> Range<usize> {
        let start = self.line_start(line);
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.chars.len(), |next| next - 1);
        start..end.max(start)
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl DocumentText for TextBuffer {
    fn len(&self) -> usize {
        self.chars.len()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(offset).copied()
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_number(&self, offset: usize) -> usize {
        // line_starts[0] == 0, so the partition point is at least 1.
        self.line_starts.partition_point(|&s| s <= offset) - 1
    }

    fn line_start(&self, line: usize) -> usize {
        match self.line_starts.get(line) {
            Some(&s) => s,
            None => self.chars.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// FoldSet
// ---------------------------------------------------------------------------

/// Disjoint collapsed regions, sorted by start.
#[derive(Debug, Clone, Default)]
pub struct FoldSet {
    regions: Vec<Range<usize>>,
}

impl FoldSet {
    /// Build from arbitrary regions. Empty regions are dropped; overlapping
    /// regions are merged since folds may not nest with each other.
    pub fn new(mut regions: Vec<Range<usize>>) -> Self {
        regions.retain(|r| r.start < r.end);
        regions.sort_by_key(|r| r.start);
        let mut merged: Vec<Range<usize>> = Vec::with_capacity(regions.len());
        for r in regions {
            match merged.last_mut() {
                Some(last) if r.start < last.end => last.end = last.end.max(r.end),
                _ => merged.push(r),
            }
        }
        Self { regions: merged }
    }

    /// Collapse inclusive 0-based line ranges the way an editor folds a block:
    /// the region starts at the end of the first line and ends at the end of
    /// the last line, so the first line stays visible.
    pub fn from_line_ranges(text: &TextBuffer, lines: &[(usize, usize)]) -> Self {
        let regions = lines
            .iter()
            .filter(|(first, last)| first < last && *last < text.line_count())
            .map(|&(first, last)| text.line_range(first).end..text.line_range(last).end)
            .collect();
        Self::new(regions)
    }

    pub fn regions(&self) -> &[Range<usize>] {
        &self.regions
    }
}

impl FoldQuery for FoldSet {
    fn collapsed_region_at(&self, offset: usize) -> Option<Range<usize>> {
        let idx = self.regions.partition_point(|r| r.start <= offset);
        let candidate = self.regions.get(idx.checked_sub(1)?)?;
        candidate.contains(&offset).then(|| candidate.clone())
    }
}

// ---------------------------------------------------------------------------
// SoftWraps
// ---------------------------------------------------------------------------

/// Sorted offsets where a visual line break occurs without a newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftWraps {
    offsets: Vec<usize>,
}

impl SoftWraps {
    pub fn new(mut offsets: Vec<usize>) -> Self {
        offsets.sort_unstable();
        offsets.dedup();
        Self { offsets }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Wrap every line at `columns` visual columns, counting a tab as 4.
    ///
    /// A character that would start past the limit begins a new visual line.
    pub fn at_column(text: &TextBuffer, columns: usize) -> Self {
        let columns = columns.max(1);
        let mut offsets = Vec::new();
        let mut col = 0usize;
        for (i, &c) in text.chars().iter().enumerate() {
            match c {
                '\n' => col = 0,
                _ => {
                    let advance = if c == '\t' { 4 } else { 1 };
                    if col > 0 && col + advance > columns {
                        offsets.push(i);
                        col = 0;
                    }
                    col += advance;
                }
            }
        }
        Self { offsets }
    }

    /// Drop wrap points hidden inside collapsed folds.
    pub fn retain_visible(&mut self, folds: &dyn FoldQuery) {
        self.offsets.retain(|&o| !folds.is_collapsed(o));
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Number of wrap offsets strictly less than `offset`.
    pub fn breaks_before(&self, offset: usize) -> usize {
        self.offsets.partition_point(|&o| o < offset)
    }

    pub fn is_break(&self, offset: usize) -> bool {
        self.offsets.binary_search(&offset).is_ok()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}
