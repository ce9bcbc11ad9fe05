// Fixture for the minimap integration tests. Not compiled.

use std::collections::HashMap;

/// Count word frequencies in `text`.
pub fn word_counts(text: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}

fn main() {
	let text = "the quick brown fox jumps over the lazy dog";
	let counts = word_counts(text);
	let mut words: Vec<_> = counts.iter().collect();
	words.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
	for (word, n) in words.iter().take(3) {
		println!("{word:>8} {n}");
	}
	// A long line that is well past the minimap width so clipping and soft wrapping both have something to do here.
	let _escaped = "tab:\t quote:\" unicode: 漢字 é";
}
