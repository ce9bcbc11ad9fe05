use crate::compositor::Rgba;
use crate::highlight::TokenKind;

/// Foreground colors per token class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    /// Identifiers and anything the lexer could not classify.
    pub foreground: Rgba,
    pub comment: Rgba,
    pub string: Rgba,
    pub number: Rgba,
    pub keyword: Rgba,
    pub punctuation: Rgba,
}

impl Theme {
    pub fn color(&self, kind: TokenKind) -> Rgba {
        match kind {
            TokenKind::Comment => self.comment,
            TokenKind::String => self.string,
            TokenKind::Number => self.number,
            TokenKind::Keyword => self.keyword,
            TokenKind::Punctuation => self.punctuation,
            TokenKind::Identifier | TokenKind::Whitespace | TokenKind::Other => self.foreground,
        }
    }
}

const CATPPUCCIN: Theme = Theme {
    foreground: Rgba::from_rgb8(0xcd, 0xd6, 0xf4),
    comment: Rgba::from_rgb8(0x6c, 0x70, 0x86),
    string: Rgba::from_rgb8(0xa6, 0xe3, 0xa1),
    number: Rgba::from_rgb8(0xfa, 0xb3, 0x87),
    keyword: Rgba::from_rgb8(0xcb, 0xa6, 0xf7),
    punctuation: Rgba::from_rgb8(0x93, 0x99, 0xb2),
};

const LATTE: Theme = Theme {
    foreground: Rgba::from_rgb8(0x4c, 0x4f, 0x69),
    comment: Rgba::from_rgb8(0x9c, 0xa0, 0xb0),
    string: Rgba::from_rgb8(0x40, 0xa0, 0x2b),
    number: Rgba::from_rgb8(0xfe, 0x64, 0x0b),
    keyword: Rgba::from_rgb8(0x88, 0x39, 0xef),
    punctuation: Rgba::from_rgb8(0x7c, 0x7f, 0x93),
};

/// Built-in themes.
pub const THEMES: &[(&str, Theme)] = &[("catppuccin", CATPPUCCIN), ("latte", LATTE)];

/// Default theme name.
pub const DEFAULT_THEME: &str = "catppuccin";

/// Look up a built-in theme by name.
pub fn get(name: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|(n, _)| *n == name).map(|(_, t)| t)
}

/// Names of all built-in themes, for error messages.
pub fn names() -> Vec<&'static str> {
    THEMES.iter().map(|(n, _)| *n).collect()
}
