use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::compositor::Rgba;

// ---------------------------------------------------------------------------
// ConfigFile — deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub disabled: Option<bool>,
    pub pixels_per_line: Option<u32>,
    pub width: Option<u32>,
    pub render_style: Option<RenderStyle>,
    pub max_document_chars: Option<usize>,
    #[serde(default)]
    pub overlay: OverlayConfigFile,
    #[serde(default)]
    pub scheduler: SchedulerConfigFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OverlayConfigFile {
    pub viewport_color: Option<String>,
    pub right_aligned: Option<bool>,
    pub width_locked: Option<bool>,
    pub jump_on_mouse_down: Option<bool>,
    pub show_selection: Option<bool>,
    pub selection_color: Option<String>,
    pub show_bookmarks: Option<bool>,
    pub bookmarks_color: Option<String>,
    pub show_current_line: Option<bool>,
    pub current_line_color: Option<String>,
    pub show_find_symbols: Option<bool>,
    pub find_symbols_color: Option<String>,
    pub show_changes: Option<bool>,
    pub changes_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerConfigFile {
    pub debounce_ms: Option<u64>,
    pub retry_ms: Option<u64>,
    pub watch_interval_ms: Option<u64>,
}

/// How glyph intensity is approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderStyle {
    /// One flat weight per character class.
    Clean,
    /// Per-character top/bottom ink weights.
    Accurate,
}

// ---------------------------------------------------------------------------
// Config — resolved (all fields concrete)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub disabled: bool,
    pub pixels_per_line: u32,
    pub width: u32,
    pub render_style: RenderStyle,
    pub max_document_chars: usize,
    pub overlay: OverlayConfig,
    pub scheduler: SchedulerConfig,
}

/// Display toggles and colors for the decoration painters drawn on top of
/// the minimap. Carried as plain data; the raster engine never reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    pub viewport_color: Rgba,
    pub right_aligned: bool,
    pub width_locked: bool,
    pub jump_on_mouse_down: bool,
    pub show_selection: bool,
    pub selection_color: Rgba,
    pub show_bookmarks: bool,
    pub bookmarks_color: Rgba,
    pub show_current_line: bool,
    pub current_line_color: Rgba,
    pub show_find_symbols: bool,
    pub find_symbols_color: Rgba,
    pub show_changes: bool,
    pub changes_color: Rgba,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub debounce: Duration,
    pub retry: Duration,
    pub watch_interval: Duration,
}

/// Per-pass snapshot handed to the raster engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub pixels_per_line: u32,
    pub image_width: u32,
    pub render_style: RenderStyle,
}

impl Config {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            pixels_per_line: self.pixels_per_line,
            image_width: self.width,
            render_style: self.render_style,
        }
    }

    /// Whether the minimap should stay blank for a document of `chars` length.
    pub fn is_disabled_for(&self, chars: usize) -> bool {
        self.disabled || chars > self.max_document_chars
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigFile::default().build()
    }
}

/// Parse a user color, falling back to `default` (with the default's alpha)
/// when missing or malformed.
fn resolve_color(key: &str, value: Option<&str>, default: Rgba) -> Rgba {
    match value {
        None | Some("") => default,
        Some(hex) => match Rgba::from_hex(hex) {
            Some(c) => c.with_alpha(default.a),
            None => {
                warn!("config: {key}={hex:?} is not a 6-digit hex color, using default");
                default
            }
        },
    }
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(
        &mut self,
        pixels_per_line: Option<u32>,
        width: Option<u32>,
        render_style: Option<RenderStyle>,
    ) {
        if let Some(v) = pixels_per_line {
            debug!("config: CLI override pixels_per_line={v}");
            self.pixels_per_line = pixels_per_line;
        }
        if let Some(v) = width {
            debug!("config: CLI override width={v}");
            self.width = width;
        }
        if let Some(v) = render_style {
            debug!("config: CLI override render_style={v:?}");
            self.render_style = render_style;
        }
    }

    /// Resolve to a Config by applying defaults to missing fields.
    ///
    /// Fails on values the raster engine cannot honor.
    pub fn resolve(self) -> anyhow::Result<Config> {
        if let Some(ppl) = self.pixels_per_line
            && !(1..=4).contains(&ppl)
        {
            bail!("pixels_per_line must be between 1 and 4, got {ppl}");
        }
        if self.width == Some(0) {
            bail!("width must be greater than 0");
        }

        let config = self.build();
        info!(
            "config: resolved disabled={}, pixels_per_line={}, width={}, render_style={:?}, \
             max_document_chars={}, debounce={}ms, retry={}ms, watch_interval={}ms",
            config.disabled,
            config.pixels_per_line,
            config.width,
            config.render_style,
            config.max_document_chars,
            config.scheduler.debounce.as_millis(),
            config.scheduler.retry.as_millis(),
            config.scheduler.watch_interval.as_millis(),
        );
        Ok(config)
    }

    fn build(self) -> Config {
        let o = self.overlay;
        let s = self.scheduler;
        Config {
            disabled: self.disabled.unwrap_or(false),
            pixels_per_line: self.pixels_per_line.unwrap_or(2),
            width: self.width.unwrap_or(110),
            render_style: self.render_style.unwrap_or(RenderStyle::Accurate),
            max_document_chars: self.max_document_chars.unwrap_or(2_500_000),
            overlay: OverlayConfig {
                viewport_color: resolve_color(
                    "viewport_color",
                    o.viewport_color.as_deref(),
                    Rgba::from_rgb8(0xA0, 0xA0, 0xA0),
                ),
                right_aligned: o.right_aligned.unwrap_or(true),
                width_locked: o.width_locked.unwrap_or(false),
                jump_on_mouse_down: o.jump_on_mouse_down.unwrap_or(true),
                show_selection: o.show_selection.unwrap_or(true),
                selection_color: resolve_color(
                    "selection_color",
                    o.selection_color.as_deref(),
                    Rgba::from_rgba8(0, 0, 255, 127),
                ),
                show_bookmarks: o.show_bookmarks.unwrap_or(true),
                bookmarks_color: resolve_color(
                    "bookmarks_color",
                    o.bookmarks_color.as_deref(),
                    Rgba::from_rgba8(255, 255, 0, 127),
                ),
                show_current_line: o.show_current_line.unwrap_or(true),
                current_line_color: resolve_color(
                    "current_line_color",
                    o.current_line_color.as_deref(),
                    Rgba::from_rgba8(0, 255, 0, 127),
                ),
                show_find_symbols: o.show_find_symbols.unwrap_or(true),
                find_symbols_color: resolve_color(
                    "find_symbols_color",
                    o.find_symbols_color.as_deref(),
                    Rgba::from_rgba8(255, 165, 0, 127),
                ),
                show_changes: o.show_changes.unwrap_or(true),
                changes_color: resolve_color(
                    "changes_color",
                    o.changes_color.as_deref(),
                    Rgba::from_rgba8(0, 0, 255, 96),
                ),
            },
            scheduler: SchedulerConfig {
                debounce: Duration::from_millis(s.debounce_ms.unwrap_or(32)),
                retry: Duration::from_millis(s.retry_ms.unwrap_or(500)),
                watch_interval: Duration::from_millis(s.watch_interval_ms.unwrap_or(200)),
            },
        }
    }
}

/// Config file location: `$CODEMINIMAP_CONFIG` if set, otherwise
/// `codeminimap/config.toml` under `$XDG_CONFIG_HOME` or `~/.config`.
/// Empty variables count as unset.
fn config_path(var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let var = |key: &str| var(key).filter(|v| !v.is_empty());
    if let Some(explicit) = var("CODEMINIMAP_CONFIG") {
        return Some(PathBuf::from(explicit));
    }
    let base = var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| var("HOME").map(|home| Path::new(&home).join(".config")))?;
    Some(base.join("codeminimap").join("config.toml"))
}

/// Load the user's config file, or defaults when there is none.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    match config_path(|key| std::env::var_os(key)) {
        Some(path) => load_config_from(&path),
        None => {
            info!("config: no config location (HOME unset), using defaults");
            Ok(ConfigFile::default())
        }
    }
}

/// Parse the config file at `path`. A missing file means defaults; an
/// unreadable or malformed one is an error.
pub fn load_config_from(path: &Path) -> anyhow::Result<ConfigFile> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("config: {} not found, using defaults", path.display());
            return Ok(ConfigFile::default());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    let cfg = toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    info!("config: loaded from {}", path.display());
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml() {
        let cfg: ConfigFile = toml::from_str("").unwrap();
        let resolved = cfg.resolve().unwrap();
        assert!(!resolved.disabled);
        assert_eq!(resolved.pixels_per_line, 2);
        assert_eq!(resolved.width, 110);
        assert_eq!(resolved.render_style, RenderStyle::Accurate);
        assert_eq!(resolved.max_document_chars, 2_500_000);
        assert_eq!(resolved.overlay.viewport_color, Rgba::from_rgb8(0xA0, 0xA0, 0xA0));
        assert!(resolved.overlay.right_aligned);
        assert!(resolved.overlay.jump_on_mouse_down);
        assert_eq!(resolved.scheduler.debounce, Duration::from_millis(32));
        assert_eq!(resolved, Config::default());
    }

    #[test]
    fn partial_toml() {
        let text = r#"
            pixels_per_line = 4
            render_style = "clean"
            [overlay]
            show_bookmarks = false
            selection_color = "FF0000"
            [scheduler]
            debounce_ms = 10
        "#;
        let cfg: ConfigFile = toml::from_str(text).unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.pixels_per_line, 4);
        assert_eq!(resolved.render_style, RenderStyle::Clean);
        assert!(!resolved.overlay.show_bookmarks);
        assert_eq!(
            resolved.overlay.selection_color,
            Rgba::from_rgba8(255, 0, 0, 127)
        );
        assert_eq!(resolved.scheduler.debounce, Duration::from_millis(10));
        // Defaults for unspecified fields
        assert_eq!(resolved.width, 110);
        assert!(resolved.overlay.show_selection);
    }

    #[test]
    fn malformed_color_falls_back() {
        let cfg: ConfigFile = toml::from_str("[overlay]\nchanges_color = \"blue\"").unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.overlay.changes_color, Rgba::from_rgba8(0, 0, 255, 96));
    }

    #[test]
    fn invalid_toml() {
        let text = "this is not valid toml [[[";
        let result = toml::from_str::<ConfigFile>(text);
        assert!(result.is_err());
        assert!(toml::from_str::<ConfigFile>("render_style = \"fancy\"").is_err());
    }

    #[test]
    fn pixels_per_line_out_of_range() {
        for ppl in [0, 5, 100] {
            let mut cfg = ConfigFile::default();
            cfg.merge_cli(Some(ppl), None, None);
            assert!(cfg.resolve().is_err(), "ppl={ppl}");
        }
        let cfg: ConfigFile = toml::from_str("width = 0").unwrap();
        assert!(cfg.resolve().is_err());
    }

    #[test]
    fn cli_overrides() {
        let mut cfg: ConfigFile = toml::from_str("pixels_per_line = 1\nwidth = 80").unwrap();
        cfg.merge_cli(Some(3), None, Some(RenderStyle::Clean));
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.pixels_per_line, 3); // CLI wins
        assert_eq!(resolved.width, 80); // config file value kept
        assert_eq!(resolved.render_style, RenderStyle::Clean);
        assert_eq!(
            resolved.render_config(),
            RenderConfig {
                pixels_per_line: 3,
                image_width: 80,
                render_style: RenderStyle::Clean,
            }
        );
    }

    #[test]
    fn disabled_for_large_documents() {
        let cfg: ConfigFile = toml::from_str("max_document_chars = 10").unwrap();
        let resolved = cfg.resolve().unwrap();
        assert!(!resolved.is_disabled_for(10));
        assert!(resolved.is_disabled_for(11));
        let cfg: ConfigFile = toml::from_str("disabled = true").unwrap();
        assert!(cfg.resolve().unwrap().is_disabled_for(0));
    }

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<OsString> + 'a {
        move |key: &str| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| OsString::from(v))
        }
    }

    #[test]
    fn config_path_precedence() {
        let expected = |p: &str| Some(PathBuf::from(p));
        assert_eq!(
            config_path(env(&[("CODEMINIMAP_CONFIG", "/etc/cm.toml"), ("HOME", "/home/u")])),
            expected("/etc/cm.toml")
        );
        assert_eq!(
            config_path(env(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/u")])),
            expected("/xdg/codeminimap/config.toml")
        );
        assert_eq!(
            config_path(env(&[("XDG_CONFIG_HOME", ""), ("HOME", "/home/u")])),
            expected("/home/u/.config/codeminimap/config.toml")
        );
        assert_eq!(config_path(env(&[])), None);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.resolve().unwrap(), Config::default());

        std::fs::write(&path, "width = 64\n[scheduler]\nretry_ms = 5\n").unwrap();
        let resolved = load_config_from(&path).unwrap().resolve().unwrap();
        assert_eq!(resolved.width, 64);
        assert_eq!(resolved.scheduler.retry, Duration::from_millis(5));

        std::fs::write(&path, "width = \"wide\"").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"));
    }
}
