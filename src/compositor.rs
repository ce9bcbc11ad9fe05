//! Color type and the single-pixel write used by every render style.

use crate::image::MinimapImage;

/// Normalized RGBA color, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build an opaque color from 8-bit channels.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba8(r, g, b, 255)
    }

    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Parse a 6-digit hex color (`"A0A0A0"`, optional leading `#`).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Write one weighted sample into `image` at `(x, y)`.
///
/// `alpha` in `[0, 1]` replaces the color's alpha (negative values clamp to
/// zero); anything above 1 keeps the color's own alpha. The pixel is
/// overwritten, not blended. Callers guarantee `(x, y)` is in bounds.
pub fn set_pixel(image: &mut MinimapImage, x: u32, y: u32, color: Rgba, alpha: f32) {
    let a = if alpha > 1.0 { color.a } else { alpha.max(0.0) };
    let px = [
        to_channel(color.r),
        to_channel(color.g),
        to_channel(color.b),
        to_channel(a),
    ];
    image.put(x, y, px);
}

/// Composite `color` over the pixel at `(x, y)` (source-over, straight
/// alpha). Used for decorations, which must not erase the glyphs below.
pub fn blend_pixel(image: &mut MinimapImage, x: u32, y: u32, color: Rgba) {
    let Some([dr, dg, db, da]) = image.pixel(x, y) else {
        return;
    };
    let sa = color.a.clamp(0.0, 1.0);
    let da = f32::from(da) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    let mix = |s: f32, d: u8| (s * sa + f32::from(d) / 255.0 * da * (1.0 - sa)) / out_a;
    let px = [
        to_channel(mix(color.r, dr)),
        to_channel(mix(color.g, dg)),
        to_channel(mix(color.b, db)),
        to_channel(out_a),
    ];
    image.put(x, y, px);
}

// `as u8` saturates, so out-of-range channels clamp instead of wrapping.
fn to_channel(v: f32) -> u8 {
    (v * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(Rgba::from_hex("FF0080"), Some(Rgba::from_rgb8(255, 0, 128)));
        assert_eq!(Rgba::from_hex("#a0a0a0"), Some(Rgba::from_rgb8(160, 160, 160)));
        assert_eq!(Rgba::from_hex(""), None);
        assert_eq!(Rgba::from_hex("FFF"), None);
        assert_eq!(Rgba::from_hex("GG0000"), None);
        assert_eq!(Rgba::from_hex("ééé"), None);
    }

    #[test]
    fn alpha_overrides_color_alpha() {
        let mut img = MinimapImage::try_new(2, 2).unwrap();
        let color = Rgba::from_rgba8(255, 128, 0, 200);
        set_pixel(&mut img, 0, 0, color, 0.5);
        assert_eq!(img.pixel(0, 0), Some([255, 128, 0, 128]));
    }

    #[test]
    fn alpha_above_one_keeps_color_alpha() {
        let mut img = MinimapImage::try_new(2, 2).unwrap();
        let color = Rgba::from_rgba8(10, 20, 30, 200);
        set_pixel(&mut img, 1, 1, color, 1.5);
        assert_eq!(img.pixel(1, 1), Some([10, 20, 30, 200]));
    }

    #[test]
    fn blend_over_transparent_and_opaque() {
        let mut img = MinimapImage::try_new(2, 1).unwrap();
        let half_red = Rgba::from_rgba8(255, 0, 0, 128);

        blend_pixel(&mut img, 0, 0, half_red);
        assert_eq!(img.pixel(0, 0), Some([255, 0, 0, 128]));

        set_pixel(&mut img, 1, 0, Rgba::from_rgb8(0, 0, 255), 1.0);
        blend_pixel(&mut img, 1, 0, half_red);
        let [r, g, b, a] = img.pixel(1, 0).unwrap();
        assert_eq!((g, a), (0, 255));
        assert!((126..=129).contains(&r), "r = {r}");
        assert!((126..=129).contains(&b), "b = {b}");

        // Out of bounds is ignored.
        blend_pixel(&mut img, 5, 5, half_red);
    }

    #[test]
    fn negative_alpha_clamps_and_overwrites() {
        let mut img = MinimapImage::try_new(1, 1).unwrap();
        let color = Rgba::from_rgb8(255, 255, 255);
        set_pixel(&mut img, 0, 0, color, 1.0);
        assert_eq!(img.pixel(0, 0), Some([255, 255, 255, 255]));
        set_pixel(&mut img, 0, 0, color, -0.3);
        assert_eq!(img.pixel(0, 0), Some([255, 255, 255, 0]));
    }
}
