//! Text normalization shared by indexing and querying.
//!
//! The lexical index, the heuristic semantic score, and the placeholder
//! embedder all go through [`tokenize`]. Keeping a single implementation is
//! what makes query tokens line up with indexed tokens.

/// Tokens shorter than this many characters are dropped.
pub const MIN_TOKEN_CHARS: usize = 3;

/// Lowercase `text`, turn every non-word character into whitespace, split,
/// and drop tokens shorter than [`MIN_TOKEN_CHARS`].
///
/// A word character is a Unicode alphanumeric or `_`.
///
/// ```rust
/// use ragrank_core::tokenize::tokenize;
///
/// assert_eq!(
///     tokenize("Machine-learning is a subset of AI!"),
///     vec!["machine", "learning", "subset"]
/// );
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if is_word_char(c) { c } else { ' ' })
        .collect();

    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}


fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
