#![no_main]

use libfuzzer_sys::fuzz_target;
use codeminimap::compositor::Rgba;
use codeminimap::config::{RenderConfig, RenderStyle};
use codeminimap::raster::{PassOutcome, RasterEngine, RenderInput};
use codeminimap::scroll::ScrollState;
use codeminimap::source::{DocumentText, FoldSet, SoftWraps, TextBuffer, Token};

const COLOR: Rgba = Rgba {
    r: 0.8,
    g: 0.8,
    b: 0.8,
    a: 1.0,
};

// Layout: [ppl, style, wrap, fold_a, fold_b, cut...] '\0' text
fuzz_target!(|data: &[u8]| {
    let Some(split) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let (head, rest) = data.split_at(split);
    let Ok(source) = std::str::from_utf8(&rest[1..]) else {
        return;
    };
    let [ppl, style, wrap, fold_a, fold_b, cuts @ ..] = head else {
        return;
    };

    let text = TextBuffer::new(source);
    let len = text.len();

    // Token boundaries from the cut bytes; they may run past the end.
    let mut bounds: Vec<usize> = cuts.iter().map(|&c| usize::from(c)).collect();
    bounds.push(len);
    bounds.sort_unstable();
    bounds.dedup();
    let mut tokens = Vec::new();
    let mut start = 0;
    for end in bounds {
        if end > start {
            tokens.push(Token::new(start..end, COLOR));
            start = end;
        }
    }

    let lines = text.line_count();
    let a = usize::from(*fold_a) % lines.max(1);
    let b = usize::from(*fold_b) % lines.max(1);
    let folds = FoldSet::from_line_ranges(&text, &[(a.min(b), a.max(b))]);
    let mut soft_wraps = match wrap {
        0 => SoftWraps::none(),
        w => SoftWraps::at_column(&text, usize::from(*w)),
    };
    soft_wraps.retain_visible(&folds);

    let config = RenderConfig {
        pixels_per_line: u32::from(ppl % 4) + 1,
        image_width: 64,
        render_style: if style % 2 == 0 {
            RenderStyle::Clean
        } else {
            RenderStyle::Accurate
        },
    };
    let folded: usize = folds
        .regions()
        .iter()
        .map(|r| text.line_number(r.end) - text.line_number(r.start))
        .sum();
    let mut scroll = ScrollState::new();
    scroll.compute_dimensions(lines + soft_wraps.len() - folded, &config);

    let input = RenderInput {
        text: &text,
        tokens: &tokens,
        folds: &folds,
        soft_wraps: &soft_wraps,
    };
    let mut engine = RasterEngine::new();
    let outcome = engine
        .update(&input, &scroll, &config, || false)
        .expect("valid config must render");
    match outcome {
        PassOutcome::Completed => assert!(tokens.iter().all(|t| t.end <= len)),
        PassOutcome::Truncated { offset } => assert!(offset >= len, "truncated early at {offset}"),
        PassOutcome::Cancelled => panic!("never cancelled"),
    }
});
