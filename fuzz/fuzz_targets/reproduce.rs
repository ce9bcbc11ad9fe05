use std::time::Instant;

use codeminimap::config::Config;
use codeminimap::raster::RasterEngine;
use codeminimap::scheduler::Snapshot;
use codeminimap::scroll::ScrollState;
use codeminimap::theme;
use log::info;

fn main() {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: reproduce <artifact-file-or-source>");
        std::process::exit(1);
    });

    let data = std::fs::read(&path).unwrap_or_else(|e| {
        eprintln!("Failed to read {path}: {e}");
        std::process::exit(1);
    });
    let source = String::from_utf8_lossy(&data);

    let iterations = std::env::var("ITERATIONS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1);

    eprintln!("=== Input: {} ({} bytes), {} iteration(s) ===", path, data.len(), iterations);

    let Some(theme) = theme::get(theme::DEFAULT_THEME) else {
        eprintln!("default theme missing");
        std::process::exit(1);
    };
    let config = Config::default().render_config();
    let mut engine = RasterEngine::new();

    for i in 0..iterations {
        let iter_start = Instant::now();

        let snapshot = Snapshot::highlighted(&source, theme, Some(80), &[]);
        let mut scroll = ScrollState::new();
        scroll.compute_dimensions(snapshot.visual_line_count(), &config);

        match engine.update(&snapshot.input(), &scroll, &config, || false) {
            Ok(outcome) => info!("iteration {i}: {outcome:?}"),
            Err(e) => {
                eprintln!("Render error: {e}");
                std::process::exit(1);
            }
        }

        info!(
            "iteration {}: total {:.1}ms",
            i,
            iter_start.elapsed().as_secs_f64() * 1000.0
        );
    }
}
