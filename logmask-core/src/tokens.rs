//! Tokenizing helpers shared by the masker and the aligner.

use once_cell::sync::Lazy;
use regex::Regex;

/// The miner's generic wildcard token.
pub const WILDCARD: &str = "<*>";

/// Characters the final masking step splits on and drops.
pub const MASK_DELIMITERS: &[char] = &['|', ':', ' ', '(', ')', '[', ']', '\'', '"', '{', '}', ',', '='];

static PLACEHOLDER_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("placeholder pattern is valid"));

/// A piece of a token after bracket-aware sub-splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Literal(&'a str),
    /// Includes the angle brackets, e.g. `<PATH>`.
    Placeholder(&'a str),
}

/// Whitespace tokenization, the same way the miner tokenizes.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Splits a token into literal and `<...>` pieces, left to right. Empty pieces
/// are dropped, so `fleet.cattle.io<PATH>` yields two pieces and `<PATH>` one.
pub fn split_placeholders(token: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut last_end = 0;
    for m in PLACEHOLDER_REF.find_iter(token) {
        if m.start() > last_end {
            pieces.push(Piece::Literal(&token[last_end..m.start()]));
        }
        pieces.push(Piece::Placeholder(m.as_str()));
        last_end = m.end();
    }
    if last_end < token.len() {
        pieces.push(Piece::Literal(&token[last_end..]));
    }
    pieces
}

/// Splits on [`MASK_DELIMITERS`], drops empty pieces and rejoins with single
/// spaces.
pub fn join_on_delimiters(text: &str) -> String {
    text.split(MASK_DELIMITERS)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
