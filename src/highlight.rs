//! Regex token source for plain source files.
//!
//! Not a parser: one leftmost-first regex splits the text into comments,
//! strings, numbers, words and punctuation, which is all a minimap needs to
//! tell code shapes apart by color. The output is gap-free over the whole
//! text, in character offsets.

use std::ops::Range;
use std::sync::LazyLock;

use log::trace;
use regex::Regex;

use crate::source::Token;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Comment,
    String,
    Number,
    Keyword,
    Identifier,
    Punctuation,
    Whitespace,
    /// Anything no rule matched.
    Other,
}

/// Alternatives are tried in order at each position, so comments win over
/// the `/` punctuation rule. Unterminated strings and block comments fall
/// through to punctuation.
static LEXER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        (?P<comment> //[^\n]* | /\*(?s:.*?)\*/ )
      | (?P<string> "(?:[^"\\]|\\.)*" | '(?:[^'\\\n]|\\.)' )
      | (?P<number> [0-9][0-9_]*(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?[A-Za-z0-9_]* )
      | (?P<word> [A-Za-z_][A-Za-z0-9_]* )
      | (?P<space> \s+ )
      | (?P<punct> [^\sA-Za-z0-9_] )
        "#,
    )
    .unwrap()
});

const GROUPS: [(&str, TokenKind); 6] = [
    ("comment", TokenKind::Comment),
    ("string", TokenKind::String),
    ("number", TokenKind::Number),
    ("word", TokenKind::Identifier),
    ("space", TokenKind::Whitespace),
    ("punct", TokenKind::Punctuation),
];

/// Reserved words across the C family, Rust, Python, Go and JavaScript.
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "crate",
    "def", "default", "defer", "do", "dyn", "elif", "else", "enum", "export", "extends", "extern",
    "false", "finally", "fn", "for", "func", "function", "go", "if", "impl", "import", "in",
    "interface", "let", "loop", "match", "mod", "move", "mut", "new", "nil", "None", "null",
    "package", "pub", "raise", "ref", "return", "self", "Self", "static", "struct", "super",
    "switch", "this", "throw", "trait", "True", "False", "true", "try", "type", "typedef", "unsafe",
    "use", "var", "void", "where", "while", "with", "yield",
];

/// Classify `text` into contiguous lexemes covering every character.
pub fn lex(text: &str) -> Vec<(TokenKind, Range<usize>)> {
    let mut out = Vec::new();
    let mut byte_pos = 0;
    let mut char_pos = 0;

    let mut push = |out: &mut Vec<(TokenKind, Range<usize>)>, kind, slice: &str| {
        let n = slice.chars().count();
        out.push((kind, char_pos..char_pos + n));
        char_pos += n;
    };

    for caps in LEXER_RE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if m.start() > byte_pos {
            push(&mut out, TokenKind::Other, &text[byte_pos..m.start()]);
        }
        let kind = GROUPS
            .iter()
            .find(|(name, _)| caps.name(name).is_some())
            .map_or(TokenKind::Other, |(_, kind)| *kind);
        let kind = if kind == TokenKind::Identifier && KEYWORDS.contains(&m.as_str()) {
            TokenKind::Keyword
        } else {
            kind
        };
        push(&mut out, kind, m.as_str());
        byte_pos = m.end();
    }
    if byte_pos < text.len() {
        push(&mut out, TokenKind::Other, &text[byte_pos..]);
    }
    out
}

/// Colored tokens for `text`. Neighbouring lexemes that resolve to the same
/// color are merged.
pub fn tokenize(text: &str, theme: &Theme) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    for (kind, range) in lex(text) {
        let color = theme.color(kind);
        match tokens.last_mut() {
            Some(last) if last.color == color && last.end == range.start => last.end = range.end,
            _ => tokens.push(Token::new(range, color)),
        }
    }
    trace!("highlight: {} tokens", tokens.len());
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    fn kinds(text: &str) -> Vec<(TokenKind, String)> {
        let chars: Vec<char> = text.chars().collect();
        lex(text)
            .into_iter()
            .map(|(k, r)| (k, chars[r].iter().collect()))
            .collect()
    }

    fn assert_gap_free(text: &str) {
        let lexemes = lex(text);
        let mut expected = 0;
        for (_, r) in &lexemes {
            assert_eq!(r.start, expected, "gap in {text:?}");
            assert!(r.end > r.start);
            expected = r.end;
        }
        assert_eq!(expected, text.chars().count());
    }

    #[test]
    fn classifies_rust_line() {
        let k = kinds("let x = 42; // answer");
        assert_eq!(
            k,
            vec![
                (TokenKind::Keyword, "let".into()),
                (TokenKind::Whitespace, " ".into()),
                (TokenKind::Identifier, "x".into()),
                (TokenKind::Whitespace, " ".into()),
                (TokenKind::Punctuation, "=".into()),
                (TokenKind::Whitespace, " ".into()),
                (TokenKind::Number, "42".into()),
                (TokenKind::Punctuation, ";".into()),
                (TokenKind::Whitespace, " ".into()),
                (TokenKind::Comment, "// answer".into()),
            ]
        );
    }

    #[test]
    fn strings_and_block_comments() {
        let k = kinds("s = \"a \\\" b\" /* x\ny */ 'c'");
        assert!(k.contains(&(TokenKind::String, "\"a \\\" b\"".into())));
        assert!(k.contains(&(TokenKind::Comment, "/* x\ny */".into())));
        assert!(k.contains(&(TokenKind::String, "'c'".into())));
    }

    #[test]
    fn unterminated_constructs_stay_gap_free() {
        let k = kinds("\"open");
        assert_eq!(k[0], (TokenKind::Punctuation, "\"".into()));
        let k = kinds("/* open");
        assert_eq!(k[0], (TokenKind::Punctuation, "/".into()));
        // Lifetimes are not char literals.
        let k = kinds("&'a str");
        assert_eq!(k[1], (TokenKind::Punctuation, "'".into()));
        assert_eq!(k[2], (TokenKind::Identifier, "a".into()));
    }

    #[test]
    fn gap_free_over_unicode_and_controls() {
        for text in [
            "",
            "fn main() {\n\tprintln!(\"héllo 漢字\");\n}\n",
            "é1 ٣ 0x1F 1.5e-3\r\n\u{0}\u{7}",
            "/* a */ /* b",
        ] {
            assert_gap_free(text);
        }
    }

    #[test]
    fn tokenize_merges_same_color() {
        let theme = theme::get(theme::DEFAULT_THEME).unwrap();
        let tokens = tokenize("foo bar", theme);
        assert_eq!(tokens, vec![Token::new(0..7, theme.foreground)]);

        let tokens = tokenize("fn foo", theme);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::new(0..2, theme.keyword));
        assert_eq!(tokens[1], Token::new(2..6, theme.foreground));
    }
}
