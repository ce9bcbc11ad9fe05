//! Glyph ink model: how much of a character's bounding box is inked in the
//! upper and lower half when the glyph is shrunk to a couple of pixel rows.
//!
//! Values are hand-tuned constants for a generic monospace font, not measured
//! at runtime. Full glyph coverage is out of reach at minimap scale anyway.

/// Weight pair for code points outside printable ASCII.
pub const DEFAULT_WEIGHTS: (f32, f32) = (0.4, 0.4);

/// (top, bottom) ink weights for `'!'` (33) through `'~'` (126).
const PRINTABLE_WEIGHTS: [(f32, f32); 94] = [
    // ! " # $ % & ' ( ) * + , - . /
    (0.5, 0.3),
    (0.5, 0.0),
    (0.7, 0.7),
    (0.8, 0.8),
    (0.6, 0.6),
    (0.6, 0.8),
    (0.3, 0.0),
    (0.4, 0.4),
    (0.4, 0.4),
    (0.5, 0.1),
    (0.2, 0.3),
    (0.0, 0.3),
    (0.1, 0.1),
    (0.0, 0.2),
    (0.3, 0.3),
    // 0-9
    (0.8, 0.8),
    (0.5, 0.6),
    (0.6, 0.8),
    (0.7, 0.7),
    (0.6, 0.6),
    (0.8, 0.7),
    (0.6, 0.8),
    (0.7, 0.3),
    (0.8, 0.8),
    (0.8, 0.6),
    // : ; < = > ? @
    (0.2, 0.2),
    (0.2, 0.3),
    (0.3, 0.3),
    (0.3, 0.3),
    (0.3, 0.3),
    (0.6, 0.3),
    (0.9, 0.9),
    // A-Z
    (0.7, 0.7),
    (0.9, 0.9),
    (0.7, 0.7),
    (0.8, 0.8),
    (0.9, 0.9),
    (0.8, 0.5),
    (0.7, 0.8),
    (0.7, 0.7),
    (0.5, 0.5),
    (0.4, 0.7),
    (0.7, 0.7),
    (0.4, 0.8),
    (0.9, 0.8),
    (0.8, 0.8),
    (0.8, 0.8),
    (0.8, 0.4),
    (0.8, 0.9),
    (0.8, 0.8),
    (0.8, 0.8),
    (0.7, 0.3),
    (0.6, 0.8),
    (0.6, 0.5),
    (0.8, 0.8),
    (0.7, 0.7),
    (0.6, 0.4),
    (0.8, 0.8),
    // [ \ ] ^ _ `
    (0.5, 0.5),
    (0.3, 0.3),
    (0.5, 0.5),
    (0.4, 0.0),
    (0.0, 0.6),
    (0.3, 0.0),
    // a-z
    (0.3, 0.7),
    (0.6, 0.8),
    (0.3, 0.6),
    (0.6, 0.8),
    (0.4, 0.7),
    (0.7, 0.4),
    (0.4, 0.9),
    (0.6, 0.7),
    (0.3, 0.5),
    (0.3, 0.7),
    (0.6, 0.7),
    (0.5, 0.5),
    (0.4, 0.8),
    (0.3, 0.6),
    (0.5, 0.5),
    (0.4, 0.8),
    (0.4, 0.8),
    (0.3, 0.4),
    (0.4, 0.6),
    (0.5, 0.5),
    (0.3, 0.6),
    (0.3, 0.5),
    (0.4, 0.7),
    (0.3, 0.6),
    (0.3, 0.8),
    (0.4, 0.6),
    // { | } ~
    (0.5, 0.5),
    (0.5, 0.5),
    (0.5, 0.5),
    (0.3, 0.2),
];

/// Look up the (top, bottom) ink weights for a character code.
///
/// Defined for every `u32`: control characters and space are blank,
/// printable ASCII comes from the table, everything else gets
/// [`DEFAULT_WEIGHTS`].
pub fn weights_for(code: u32) -> (f32, f32) {
    match code {
        0..=32 => (0.0, 0.0),
        33..=126 => PRINTABLE_WEIGHTS[(code - 33) as usize],
        _ => DEFAULT_WEIGHTS,
    }
}

/// Single flat weight used by the clean render style.
pub fn clean_weight(code: u32) -> f32 {
    match code {
        0..=32 => 0.0,
        33..=126 => 0.8,
        _ => 0.4,
    }
}
