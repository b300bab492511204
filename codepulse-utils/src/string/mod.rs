//! String helpers used when logging or displaying LLM-bound text that may
//! be far too large to print whole (the forensic logging the per-chunk
//! analyzer does when an input exceeds 150,000 tokens, per §4.4).

use unicode_segmentation::UnicodeSegmentation;

/// Truncate `text` to at most `max_chars` grapheme clusters for a log line,
/// appending a marker noting how much was cut, so multi-byte UTF-8 content
/// is never sliced mid-codepoint.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max_chars {
        return text.to_string();
    }
    let head: String = graphemes[..max_chars].concat();
    format!("{head}… [truncated, {} more chars]", graphemes.len() - max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_short_text_untouched() {
        assert_eq!(truncate_for_log("hello", 10), "hello");
    }

    #[test]
    fn truncates_long_text_with_marker() {
        let long = "a".repeat(100);
        let truncated = truncate_for_log(&long, 10);
        assert!(truncated.starts_with(&"a".repeat(10)));
        assert!(truncated.contains("truncated"));
    }
}
