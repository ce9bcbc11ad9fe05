#![no_main]

use libfuzzer_sys::fuzz_target;
use codeminimap::highlight::{lex, tokenize};
use codeminimap::theme;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let chars = source.chars().count();

    // Lexemes tile the document in char offsets.
    let lexemes = lex(source);
    let mut pos = 0;
    for (kind, range) in &lexemes {
        assert_eq!(range.start, pos, "gap before {kind:?} at {range:?}");
        assert!(range.start < range.end, "empty {kind:?} lexeme at {}", range.start);
        pos = range.end;
    }
    assert_eq!(pos, chars, "lexemes stop short (len={chars})");

    // Merged tokens still tile it, with no two equal colors adjacent.
    let Some(theme) = theme::get(theme::DEFAULT_THEME) else {
        return;
    };
    let tokens = tokenize(source, theme);
    let mut pos = 0;
    for token in &tokens {
        assert_eq!(token.start, pos);
        pos = token.end;
    }
    assert_eq!(pos, chars);
    for pair in tokens.windows(2) {
        assert_ne!(pair[0].color, pair[1].color, "unmerged neighbours at {}", pair[1].start);
    }
});
