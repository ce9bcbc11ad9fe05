use std::collections::HashSet;
use std::fs;
use std::thread;

use codeminimap::config::{Config, RenderConfig, RenderStyle};
use codeminimap::coordinator::RenderCoordinator;
use codeminimap::overlay::{self, Marks};
use codeminimap::raster::{PassOutcome, RasterEngine};
use codeminimap::scheduler::Snapshot;
use codeminimap::scroll::{ScrollState, Viewport};
use codeminimap::source::FoldQuery;
use codeminimap::theme;

fn load_fixture() -> String {
    fs::read_to_string("tests/fixtures/sample.rs").expect("fixture should exist")
}

fn snapshot(text: &str, wrap_at: Option<usize>, folds: &[(usize, usize)]) -> Snapshot {
    let theme = theme::get(theme::DEFAULT_THEME).expect("default theme");
    Snapshot::highlighted(text, theme, wrap_at, folds)
}

fn render_config(pixels_per_line: u32, render_style: RenderStyle) -> RenderConfig {
    RenderConfig {
        pixels_per_line,
        image_width: 110,
        render_style,
    }
}

fn render(
    engine: &mut RasterEngine,
    snap: &Snapshot,
    cfg: &RenderConfig,
) -> (ScrollState, PassOutcome) {
    let mut scroll = ScrollState::new();
    scroll.compute_dimensions(snap.visual_line_count(), cfg);
    let outcome = engine
        .update(&snap.input(), &scroll, cfg, || false)
        .expect("pass should succeed");
    (scroll, outcome)
}

/// Expected `(column, visual line)` of every painted character, walking the
/// text independently of the engine.
fn expected_cells(snap: &Snapshot, width: usize) -> HashSet<(u32, u32)> {
    let chars = snap.text.chars();
    let mut cells = HashSet::new();
    let (mut line, mut col, mut i) = (0u32, 0usize, 0usize);
    while i < chars.len() {
        if let Some(region) = snap.folds.collapsed_region_at(i) {
            i = region.end;
            continue;
        }
        let c = chars[i];
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            if snap.soft_wraps.is_break(i) {
                line += 1;
                col = 0;
            }
            if c == '\t' {
                col += 4;
            } else {
                if c as u32 > 32 && col < width {
                    cells.insert((col as u32, line));
                }
                col += 1;
            }
        }
        i += 1;
    }
    cells
}

fn assert_cells_match(
    engine: &RasterEngine,
    scroll: &ScrollState,
    expected: &HashSet<(u32, u32)>,
) {
    let img = engine.image().expect("image after pass");
    let ppl = scroll.pixels_per_line;
    for &(x, line) in expected {
        let alpha = img.pixel(x, line * ppl + ppl - 1).expect("in bounds")[3];
        assert_ne!(alpha, 0, "missing glyph at column {x}, visual line {line}");
    }
    for y in 0..img.height() {
        for x in 0..img.width() {
            if img.pixel(x, y).expect("in bounds")[3] != 0 {
                assert!(expected.contains(&(x, y / ppl)), "stray ink at ({x}, {y})");
            }
        }
    }
}

#[test]
fn test_fixture_renders_in_every_mode() {
    let text = load_fixture();
    let snap = snapshot(&text, None, &[]);
    for style in [RenderStyle::Clean, RenderStyle::Accurate] {
        for ppl in 1..=4 {
            let cfg = render_config(ppl, style);
            let mut engine = RasterEngine::new();
            let (scroll, outcome) = render(&mut engine, &snap, &cfg);
            assert_eq!(outcome, PassOutcome::Completed);
            let img = engine.image().unwrap();
            assert!(img.band_has_ink(0, scroll.document_height));
            assert!(!img.band_has_ink(scroll.document_height, img.height()));

            let png_data = img.encode_png(scroll.document_height).unwrap();
            assert_eq!(&png_data[..8], b"\x89PNG\r\n\x1a\n", "output should be valid PNG");
        }
    }
}

#[test]
fn test_empty_input() {
    let snap = snapshot("", None, &[]);
    let mut engine = RasterEngine::new();
    let (scroll, outcome) = render(&mut engine, &snap, &render_config(2, RenderStyle::Accurate));
    assert_eq!(outcome, PassOutcome::Completed);
    assert_eq!(scroll.document_height, 2);
    let img = engine.image().unwrap();
    assert!(!img.band_has_ink(0, img.height()));
    let png_data = img.encode_png(scroll.document_height).unwrap();
    assert_eq!(&png_data[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
fn test_every_visible_char_lands_on_its_row() {
    let text = load_fixture();
    let cfg = render_config(2, RenderStyle::Clean);

    // Plain: long lines are clipped at the image width.
    let snap = snapshot(&text, None, &[]);
    let mut engine = RasterEngine::new();
    let (scroll, _) = render(&mut engine, &snap, &cfg);
    assert_cells_match(&engine, &scroll, &expected_cells(&snap, 110));

    // Folded and soft-wrapped.
    let snap = snapshot(&text, Some(40), &[(5, 9), (13, 15)]);
    assert!(!snap.soft_wraps.is_empty());
    let mut engine = RasterEngine::new();
    let (scroll, _) = render(&mut engine, &snap, &cfg);
    assert_cells_match(&engine, &scroll, &expected_cells(&snap, 110));
}

#[test]
fn test_two_passes_are_identical() {
    let text = load_fixture();
    let snap = snapshot(&text, Some(60), &[(11, 20)]);
    let cfg = render_config(3, RenderStyle::Accurate);
    let mut engine = RasterEngine::new();
    render(&mut engine, &snap, &cfg);
    let first = engine.image().unwrap().clone();
    render(&mut engine, &snap, &cfg);
    assert_eq!(engine.image().unwrap(), &first);
}

#[test]
fn test_png_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minimap.png");

    let snap = snapshot(&load_fixture(), None, &[]);
    let mut engine = RasterEngine::new();
    let (scroll, _) = render(&mut engine, &snap, &render_config(2, RenderStyle::Accurate));
    let png_data = engine.image().unwrap().encode_png(scroll.document_height).unwrap();
    fs::write(&path, &png_data).unwrap();

    let read_back = fs::read(&path).unwrap();
    assert_eq!(read_back, png_data);
    assert!(read_back.len() > 100, "PNG should not be trivially small");
}

#[test]
fn test_invalidations_during_a_pass_trigger_one_followup() {
    let snap = snapshot(&load_fixture(), None, &[]);
    let cfg = render_config(2, RenderStyle::Clean);
    let coordinator = RenderCoordinator::new();
    let mut engine = RasterEngine::new();
    let mut passes = 0;

    assert!(coordinator.try_acquire());
    loop {
        thread::scope(|s| {
            let worker = s.spawn(|| render(&mut engine, &snap, &cfg));
            if passes == 0 {
                for _ in 0..5 {
                    assert!(!coordinator.request());
                }
            }
            worker.join().unwrap();
        });
        passes += 1;
        if !coordinator.release() || !coordinator.try_acquire() {
            break;
        }
    }
    assert_eq!(passes, 2);
}

#[test]
fn test_viewport_panel_for_fixture() {
    let config = Config::default();
    let snap = snapshot(&load_fixture(), None, &[]);
    let cfg = config.render_config();
    let mut engine = RasterEngine::new();
    let (mut scroll, _) = render(&mut engine, &snap, &cfg);

    // An editor 10 lines tall at 16px per line, scrolled to line 5.
    scroll.recompute_visible(&Viewport {
        y: 5 * 16,
        height: 160,
        line_height: 16,
    });
    let marks = Marks {
        bookmarks: vec![2],
        ..Marks::default()
    };
    let panel =
        overlay::compose_panel(engine.image().unwrap(), &scroll, &config.overlay, &marks).unwrap();
    assert_eq!(panel.height(), scroll.draw_height);
    assert_eq!(panel.width(), config.width);
    let png_data = panel.encode_png(panel.height()).unwrap();
    assert_eq!(&png_data[..8], b"\x89PNG\r\n\x1a\n");
}
