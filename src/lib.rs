//! Code minimap raster engine.
//!
//! Renders a source document into a narrow RGBA image where each line
//! becomes a few pixel rows and each character a weighted dot in its token's
//! color. The engine itself ([`raster`]) is host-agnostic; [`scheduler`],
//! [`cache`] and [`coordinator`] are the pieces a host needs to keep the image
//! current while the document changes.

pub mod cache;
pub mod compositor;
pub mod config;
pub mod coordinator;
pub mod glyph;
pub mod highlight;
pub mod image;
pub mod input;
pub mod overlay;
pub mod raster;
pub mod scheduler;
pub mod scroll;
pub mod source;
pub mod theme;
pub mod watch;
