//! Input source for the CLI: a file path or a stdin pipe.
//!
//! Source files are decoded lossily; a stray invalid byte should cost one
//! replacement glyph on the minimap, not the whole render.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    /// `-` means stdin.
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(arg.to_path_buf())
        }
    }

    /// Display name for log lines and messages.
    pub fn display_name(&self) -> &str {
        match self {
            InputSource::File(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown"),
            InputSource::Stdin => "<stdin>",
        }
    }

    /// Read the whole input (blocking).
    pub fn read(&self) -> Result<String> {
        match self {
            InputSource::File(path) => {
                let file =
                    File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
                read_lossy(file).with_context(|| format!("failed to read {}", path.display()))
            }
            InputSource::Stdin => read_lossy(io::stdin()).context("failed to read stdin"),
        }
    }
}

/// Read everything from `reader`, replacing invalid UTF-8.
pub fn read_lossy<R: Read>(mut reader: R) -> io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
