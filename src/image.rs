//! RGBA8 raster owned by the raster engine.

use std::time::Instant;

use anyhow::Result;
use log::debug;

use crate::raster::RasterError;

/// A straight (non-premultiplied) RGBA8 pixel buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimapImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl MinimapImage {
    /// Allocate a transparent image, reporting allocation failure instead of
    /// aborting.
    pub fn try_new(width: u32, height: u32) -> Result<Self, RasterError> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(RasterError::Allocation { width, height })?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| RasterError::Allocation { width, height })?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Read one pixel. `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[i..i + 4]);
        Some(px)
    }

    /// Overwrite one pixel. The caller guarantees bounds.
    pub(crate) fn put(&mut self, x: u32, y: u32, px: [u8; 4]) {
        debug_assert!(x < self.width && y < self.height, "pixel ({x},{y}) out of bounds");
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Whether the row band `[y, y + rows)` contains any non-transparent pixel.
    pub fn band_has_ink(&self, y: u32, rows: u32) -> bool {
        let end = y.saturating_add(rows).min(self.height);
        (y..end).any(|row| {
            let start = self.index(0, row);
            let stride = self.width as usize * 4;
            self.data[start..start + stride]
                .chunks_exact(4)
                .any(|px| px[3] != 0)
        })
    }

    /// Copy the row band `[y, y + rows)` into a new image of height `rows`.
    /// Rows past the bottom stay transparent.
    pub fn crop_rows(&self, y: u32, rows: u32) -> Result<MinimapImage, RasterError> {
        let mut out = MinimapImage::try_new(self.width, rows)?;
        let start = y.min(self.height);
        let end = y.saturating_add(rows).min(self.height);
        let src = self.index(0, start)..self.index(0, end);
        out.data[..src.len()].copy_from_slice(&self.data[src]);
        Ok(out)
    }

    /// Encode the rows `[0, rows)` as a PNG.
    pub fn encode_png(&self, rows: u32) -> Result<Vec<u8>> {
        let start = Instant::now();
        let rows = rows.min(self.height).max(1);
        let stride = self.width as usize * 4;

        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, rows);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(png::Compression::Fast);

            let mut writer = encoder
                .write_header()
                .map_err(|e| anyhow::anyhow!("PNG header encoding failed: {e}"))?;
            let needed = stride * rows as usize;
            if self.data.len() >= needed {
                writer
                    .write_image_data(&self.data[..needed])
                    .map_err(|e| anyhow::anyhow!("PNG data encoding failed: {e}"))?;
            } else {
                // Zero-height images still need one (transparent) row.
                let blank = vec![0u8; needed];
                writer
                    .write_image_data(&blank)
                    .map_err(|e| anyhow::anyhow!("PNG data encoding failed: {e}"))?;
            }
        }

        debug!(
            "image: encoded {}x{}px PNG, {} bytes in {:.1}ms",
            self.width,
            rows,
            png_data.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(png_data)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}
