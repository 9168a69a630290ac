//! Token estimation utilities.
//!
//! Heuristic: a quarter token per character plus one per whitespace-separated
//! word. Cheap, deterministic, and never fails; empty input costs nothing and
//! any non-empty input costs at least one token.

/// Maps text to an approximate token count.
///
/// Any `Fn(&str) -> usize` closure is an estimator, so tests can plug in
/// something trivially predictable.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

impl<F> TokenEstimator for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate(&self, text: &str) -> usize {
        self(text)
    }
}

/// The default estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let chars = text.chars().count();
    let words = text.split_whitespace().count();
    (chars / 4 + words).max(1)
}

/// Trim `text` and cut it to at most `limit` characters, ending in `...`
/// when something was dropped.
pub fn shorten(text: &str, limit: usize) -> String {
    let stripped = text.trim();
    if stripped.chars().count() <= limit {
        return stripped.to_string();
    }
    let kept: String = stripped.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn short_word_costs_at_least_one() {
        // 2 chars / 4 = 0, plus 1 word
        assert_eq!(estimate_tokens("hi"), 1);
    }

    #[test]
    fn whitespace_only_still_costs_one() {
        assert_eq!(estimate_tokens("   "), 1);
    }

    #[test]
    fn chars_and_words_add_up() {
        // 11 chars / 4 = 2, plus 2 words
        assert_eq!(estimate_tokens("hello world"), 4);
        let text = "a".repeat(100);
        assert_eq!(estimate_tokens(&text), 26);
    }

    #[test]
    fn closures_are_estimators() {
        let fixed = |_: &str| 7usize;
        assert_eq!(fixed.estimate("anything"), 7);
        assert_eq!(HeuristicEstimator.estimate("hi"), 1);
    }

    #[test]
    fn shorten_keeps_short_text() {
        assert_eq!(shorten("  hello  ", 120), "hello");
    }

    #[test]
    fn shorten_truncates_with_ellipsis() {
        let text = "word ".repeat(40);
        let short = shorten(&text, 20);
        assert!(short.ends_with("..."));
        assert!(short.chars().count() <= 20);
        assert_eq!(short, "word word word wo...");
    }

    #[test]
    fn shorten_counts_characters_not_bytes() {
        let text = "é".repeat(10);
        assert_eq!(shorten(&text, 10), text);
        assert_eq!(shorten(&text, 5), "éé...");
    }
}
