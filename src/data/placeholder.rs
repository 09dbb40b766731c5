// ============================================================
// Layer 4 — Target Placeholder Substitution
// ============================================================
// The side file stores each sentence with the annotated target
// replaced by a placeholder, e.g.
//
//   "the coffee was great and the $T$ was hot"
//
// An opinion names WHICH occurrence of its target it refers
// to, so the nth match has to be replaced, not the first.
//
// Matching order:
//   1. whole-word matches (regex \b...\b), take the nth
//   2. otherwise a case-insensitive substring search that
//      ignores word boundaries
//   3. otherwise the sentence is returned unchanged
//
// Step 2 can land inside a longer word ("tea" in "steak").
// That behaviour is kept deliberately; see DESIGN.md.

use regex::Regex;

/// Placeholder written in place of the target phrase.
pub const TARGET_PLACEHOLDER: &str = "$T$";

/// Replace the `n`-th (1-based) occurrence of `target` in `sentence`.
pub fn replace_nth_occurrence(sentence: &str, target: &str, replacement: &str, n: usize) -> String {
    if n == 0 || target.is_empty() {
        return sentence.to_string();
    }

    let pattern = format!(r"\b{}\b", regex::escape(target));
    if let Ok(re) = Regex::new(&pattern) {
        if let Some(m) = re.find_iter(sentence).nth(n - 1) {
            return splice(sentence, m.start(), m.end(), replacement);
        }
    }

    replace_nth_substring(sentence, target, replacement, n)
}

/// Case-insensitive, boundary-free fallback.
fn replace_nth_substring(sentence: &str, target: &str, replacement: &str, n: usize) -> String {
    let lowered = sentence.to_lowercase();
    // Lowercasing can change byte lengths outside ASCII; only then
    // does the search and the splice run on the lowered text.
    let base = if lowered.len() == sentence.len() { sentence } else { lowered.as_str() };

    let mut start = 0usize;
    let mut found = 0usize;
    while let Some(offset) = lowered[start..].find(target) {
        let at = start + offset;
        found += 1;
        if found == n {
            return splice(base, at, at + target.len(), replacement);
        }
        start = at + target.len();
    }

    tracing::warn!(
        "Target '{}' does not occur {} times in '{}'; sentence left unchanged",
        target,
        n,
        sentence
    );
    sentence.to_string()
}

fn splice(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_second_occurrence() {
        let out = replace_nth_occurrence(
            "The coffee was great and the coffee was hot",
            "coffee",
            TARGET_PLACEHOLDER,
            2,
        );
        assert_eq!(out, "The coffee was great and the $T$ was hot");
    }

    #[test]
    fn test_whole_word_match_skips_embedded_text() {
        // "tea" inside "steak" is not a whole-word match
        let out = replace_nth_occurrence("steak and tea", "tea", "$T$", 1);
        assert_eq!(out, "steak and $T$");
    }

    #[test]
    fn test_falls_back_to_substring_search() {
        // Only one whole-word "tea", so the second occurrence comes from
        // the boundary-free search and lands inside "teapot".
        let out = replace_nth_occurrence("tea in a teapot", "tea", "$T$", 2);
        assert_eq!(out, "tea in a $T$pot");
    }

    #[test]
    fn test_fallback_is_case_insensitive() {
        let out = replace_nth_occurrence("Wi-Fi was slow", "wi-fi", "$T$", 1);
        assert_eq!(out, "$T$ was slow");
    }

    #[test]
    fn test_missing_target_leaves_sentence_unchanged() {
        let out = replace_nth_occurrence("the room was clean", "pool", "$T$", 1);
        assert_eq!(out, "the room was clean");
    }

    #[test]
    fn test_regex_metacharacters_are_escaped() {
        let out = replace_nth_occurrence("the c++ book", "c++", "$T$", 1);
        assert_eq!(out, "the $T$ book");
    }
}
