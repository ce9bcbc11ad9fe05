use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};

use codeminimap::config::{self, Config, RenderStyle};
use codeminimap::input::InputSource;
use codeminimap::overlay::{self, Marks};
use codeminimap::raster::{PassOutcome, RasterEngine};
use codeminimap::scheduler::{Scheduler, Snapshot};
use codeminimap::scroll::{ScrollState, Viewport};
use codeminimap::source::DocumentText;
use codeminimap::theme::{self, Theme};
use codeminimap::watch::FileWatcher;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CODEMINIMAP_BUILD_GIT_HASH"),
    ", ",
    env!("CODEMINIMAP_BUILD_PROFILE"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "codeminimap",
    about = "Render source-code minimaps to PNG",
    version,
    long_version = LONG_VERSION
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Pixel rows per source line (1-4)
    #[arg(long, global = true)]
    pixels_per_line: Option<u32>,

    /// Minimap width in pixels
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Glyph rendering style
    #[arg(long, global = true, value_enum)]
    style: Option<RenderStyle>,

    /// Color theme for syntax classes
    #[arg(long, global = true, default_value = theme::DEFAULT_THEME)]
    theme: String,

    /// Soft-wrap lines longer than COLS columns
    #[arg(long, global = true, value_name = "COLS")]
    wrap_at: Option<usize>,

    /// Collapse lines START-END (1-based, inclusive); repeatable
    #[arg(long = "fold", global = true, value_name = "START-END", value_parser = parse_line_range)]
    folds: Vec<(usize, usize)>,

    /// Log output file path (logs go to stderr via RUST_LOG otherwise)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Render a source file to a minimap PNG
    Render {
        /// Input source file (use `-` for stdin)
        input: PathBuf,

        /// Output PNG file
        #[arg(short, long, default_value = "minimap.png")]
        output: PathBuf,

        /// Render the panel an editor showing lines START-END would display,
        /// with overlays, instead of the whole document
        #[arg(long, value_name = "START-END", value_parser = parse_line_range)]
        viewport: Option<(usize, usize)>,

        /// Editor line height in pixels, for --viewport
        #[arg(long, default_value_t = 16)]
        line_height: u32,

        /// Bookmarked line (1-based); repeatable, needs --viewport
        #[arg(long, requires = "viewport")]
        bookmark: Vec<usize>,

        /// Caret line (1-based), needs --viewport
        #[arg(long, requires = "viewport")]
        current_line: Option<usize>,
    },
    /// Re-render the PNG whenever the source file changes
    Watch {
        /// Input source file
        input: PathBuf,

        /// Output PNG file
        #[arg(short, long, default_value = "minimap.png")]
        output: PathBuf,
    },
}

/// Parse `START-END` (1-based, inclusive) into a 0-based pair.
fn parse_line_range(s: &str) -> Result<(usize, usize), String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected START-END, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid line number '{v}': {e}"))
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if start == 0 || end < start {
        return Err(format!("invalid line range '{s}' (lines are 1-based, START <= END)"));
    }
    Ok((start - 1, end - 1))
}

/// Settings shared by both subcommands.
struct Common {
    config: Config,
    theme: &'static Theme,
    wrap_at: Option<usize>,
    folds: Vec<(usize, usize)>,
}

impl Common {
    fn snapshot(&self, text: &str) -> Snapshot {
        Snapshot::highlighted(text, self.theme, self.wrap_at, &self.folds)
    }
}

/// Overlay marks given on the command line, in 0-based source lines.
struct SourceMarks {
    bookmarks: Vec<usize>,
    current_line: Option<usize>,
}

impl SourceMarks {
    /// Move each mark onto the visual line it is drawn on.
    fn to_visual(&self, snapshot: &Snapshot) -> Marks {
        Marks {
            bookmarks: self.bookmarks.iter().map(|&l| snapshot.visual_line(l)).collect(),
            current_line: self.current_line.map(|l| snapshot.visual_line(l)),
            ..Marks::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = match std::fs::File::create(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: failed to open log file {}: {e}", log_path.display());
                std::process::exit(1);
            }
        };
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else {
        env_logger::init();
    }

    if let Err(e) = run(cli) {
        let msg = format!("{e:#}");
        if msg.contains("[BUG]") {
            eprintln!("\x1b[1;31m{msg}\x1b[0m");
        } else {
            eprintln!("Error: {msg}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Load config file and merge CLI overrides
    let mut cfg = config::load_config()?;
    cfg.merge_cli(cli.pixels_per_line, cli.width, cli.style);
    let config = cfg.resolve()?;

    let theme = theme::get(&cli.theme).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown theme '{}' (available: {})",
            cli.theme,
            theme::names().join(", ")
        )
    })?;

    let common = Common {
        config,
        theme,
        wrap_at: cli.wrap_at,
        folds: cli.folds,
    };

    match cli.command {
        Command::Render {
            input,
            output,
            viewport,
            line_height,
            bookmark,
            current_line,
        } => {
            let marks = SourceMarks {
                bookmarks: bookmark.iter().map(|l| l.saturating_sub(1)).collect(),
                current_line: current_line.map(|l| l.saturating_sub(1)),
            };
            let viewport = viewport.map(|(first, last)| Viewport {
                y: i64::from(line_height) * first as i64,
                height: line_height.saturating_mul((last - first + 1) as u32),
                line_height,
            });
            cmd_render(&common, &input, &output, viewport, &marks)
        }
        Command::Watch { input, output } => cmd_watch(common, &input, &output),
    }
}

fn cmd_render(
    common: &Common,
    input: &Path,
    output: &Path,
    viewport: Option<Viewport>,
    marks: &SourceMarks,
) -> Result<()> {
    let pipeline_start = Instant::now();
    let source = InputSource::from_arg(input);
    let text = source.read()?;

    let snapshot = common.snapshot(&text);
    if common.config.is_disabled_for(snapshot.text.len()) {
        anyhow::bail!(
            "minimap disabled for {} ({} chars, limit {})",
            source.display_name(),
            snapshot.text.len(),
            common.config.max_document_chars
        );
    }

    let render_config = common.config.render_config();
    let mut scroll = ScrollState::new();
    scroll.compute_dimensions(snapshot.visual_line_count(), &render_config);

    let mut engine = RasterEngine::new();
    let outcome = engine.update(&snapshot.input(), &scroll, &render_config, || false)?;
    let image = engine
        .image()
        .ok_or_else(|| anyhow::anyhow!("[BUG] raster pass produced no image"))?;

    let png_data = match viewport {
        Some(vp) => {
            scroll.recompute_visible(&vp);
            let marks = marks.to_visual(&snapshot);
            let panel = overlay::compose_panel(image, &scroll, &common.config.overlay, &marks)?;
            panel.encode_png(panel.height())?
        }
        None => image.encode_png(scroll.document_height)?,
    };
    fs::write(output, &png_data).with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        "cmd_render: total pipeline completed in {:.1}ms",
        pipeline_start.elapsed().as_secs_f64() * 1000.0
    );
    if let PassOutcome::Truncated { offset } = outcome {
        eprintln!("warning: token stream ended early at offset {offset}");
    }
    eprintln!(
        "rendered {} -> {} ({} lines, {} bytes)",
        source.display_name(),
        output.display(),
        snapshot.visual_line_count(),
        png_data.len()
    );
    Ok(())
}

fn cmd_watch(common: Common, input: &Path, output: &Path) -> Result<()> {
    let source = InputSource::from_arg(input);
    let InputSource::File(path) = source else {
        anyhow::bail!("watch needs a file path, not stdin");
    };
    let watcher = FileWatcher::new(&path)
        .with_context(|| format!("failed to watch {}", path.display()))?;
    let interval = common.config.scheduler.watch_interval;
    let config = common.config.clone();

    let document = move || -> Result<Snapshot> {
        let text = InputSource::File(path.clone()).read()?;
        Ok(common.snapshot(&text))
    };
    let (scheduler, invalidator) = Scheduler::new(config, document, Viewport::default());

    eprintln!("watching {} -> {} (Ctrl-C to stop)", input.display(), output.display());
    thread::scope(|s| {
        s.spawn(move || watcher.forward(&invalidator, interval));
        scheduler.run(|frame| {
            let written = frame
                .image
                .encode_png(frame.scroll.document_height)
                .and_then(|png| {
                    fs::write(output, &png)
                        .with_context(|| format!("failed to write {}", output.display()))
                });
            match written {
                Ok(()) => eprintln!("updated {}", output.display()),
                Err(e) => error!("watch: {e:#}"),
            }
        })
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_ranges_are_one_based_inclusive() {
        assert_eq!(parse_line_range("5-8"), Ok((4, 7)));
        assert_eq!(parse_line_range("3-3"), Ok((2, 2)));
        assert!(parse_line_range("0-3").is_err());
        assert!(parse_line_range("8-5").is_err());
        assert!(parse_line_range("5").is_err());
        assert!(parse_line_range("a-b").is_err());
    }

    #[test]
    fn cli_parses_render_flags() {
        let cli = Cli::try_parse_from([
            "codeminimap",
            "render",
            "src/lib.rs",
            "--fold",
            "2-4",
            "--fold",
            "10-12",
            "--style",
            "clean",
            "--viewport",
            "1-40",
            "--bookmark",
            "7",
        ])
        .unwrap();
        assert_eq!(cli.folds, vec![(1, 3), (9, 11)]);
        assert_eq!(cli.style, Some(RenderStyle::Clean));
        match cli.command {
            Command::Render {
                viewport, bookmark, ..
            } => {
                assert_eq!(viewport, Some((0, 39)));
                assert_eq!(bookmark, vec![7]);
            }
            Command::Watch { .. } => panic!("expected render"),
        }
    }

    #[test]
    fn marks_follow_folds_and_wraps() {
        let common = Common {
            config: Config::default(),
            theme: theme::get(theme::DEFAULT_THEME).unwrap(),
            wrap_at: Some(10),
            folds: vec![(1, 3)],
        };
        // Line 0 wraps once; lines 1..=3 fold into line 1.
        let snapshot = common.snapshot("fn main() {}\n{\n  a;\n}\nnext();\n");
        let marks = SourceMarks {
            bookmarks: vec![0, 2, 4],
            current_line: Some(4),
        }
        .to_visual(&snapshot);
        assert_eq!(marks.bookmarks, vec![0, 2, 3]);
        assert_eq!(marks.current_line, Some(3));
    }

    #[test]
    fn bookmarks_require_viewport() {
        assert!(Cli::try_parse_from(["codeminimap", "render", "a.rs", "--bookmark", "3"]).is_err());
    }
}
