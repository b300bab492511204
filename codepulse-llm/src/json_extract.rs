//! Tolerant JSON extraction from raw LLM completions.
//!
//! Providers routinely wrap structured output in a single markdown code
//! fence (```json ... ``` or a bare ```` ``` ````); some prepend a sentence
//! before the fence anyway. This strips at most one such wrapper and
//! returns the remaining text trimmed, without attempting to parse it —
//! callers parse with `serde_json`.

/// Return the JSON object/array text found in `raw`, stripping a single
/// surrounding markdown fence if present. Returns `None` only when `raw`
/// contains no `{` or `[` at all.
pub fn extract_json_object(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    let unfenced = if let Some(stripped) = strip_fence(trimmed) {
        stripped
    } else {
        trimmed.to_string()
    };

    let start = unfenced.find(['{', '['])?;
    let end = unfenced.rfind(['}', ']'])?;
    if end < start {
        return None;
    }
    Some(unfenced[start..=end].to_string())
}

fn strip_fence(text: &str) -> Option<String> {
    let text = text.strip_prefix("```")?;
    let text = text.strip_prefix("json").unwrap_or(text);
    let text = text.strip_prefix('\n').unwrap_or(text);
    let end = text.rfind("```")?;
    Some(text[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_json() {
        assert_eq!(extract_json_object("{\"a\": 1}").unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_and_leading_sentence() {
        let raw = "Here is the plan:\n```\n{\"chunks\": []}\n```";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"chunks\": []}");
    }

    #[test]
    fn returns_none_when_no_braces() {
        assert!(extract_json_object("no json here").is_none());
    }

    #[test]
    fn extracts_array() {
        assert_eq!(extract_json_object("prefix [1, 2, 3] suffix").unwrap(), "[1, 2, 3]");
    }
}
