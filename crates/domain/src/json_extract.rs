//! Tolerant JSON extraction from LLM free-text responses.
//!
//! Gate LLMs are asked to answer with a bare JSON object but routinely wrap
//! it in markdown fences or narrate around it. This extracts the JSON text
//! to hand to `serde_json`, trying progressively looser strategies.

/// Strategy order: a ```json fenced block, then a plain ``` fenced block,
/// then the outermost balanced `{ ... }` substring. Returns `None` if none
/// of the strategies find anything to try parsing.
pub fn extract_json_text(raw: &str) -> Option<String> {
    if let Some(text) = fenced(raw, "```json") {
        return Some(text);
    }
    if let Some(text) = fenced(raw, "```") {
        return Some(text);
    }
    balanced_braces(raw)
}

fn fenced(raw: &str, open_marker: &str) -> Option<String> {
    let start = raw.find(open_marker)? + open_marker.len();
    let rest = &raw[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

/// Extracts the substring from the first `{` to the last `}` in the text.
/// This is deliberately loose (not truly brace-balanced) to match the
/// reference "find first `{`, rfind last `}`" extraction used by the
/// external fact-check gate; a well-formed single JSON object in free text
/// is the only case this needs to handle.
fn balanced_braces(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(raw[start..=end].to_string())
}

/// Parse `raw` as tolerant JSON, returning a `serde_json::Value`.
pub fn parse_tolerant(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    match extract_json_text(raw) {
        Some(text) => serde_json::from_str(&text),
        None => serde_json::from_str(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json() {
        let raw = r#"{"verdict":"pass","reason":"ok"}"#;
        let v = parse_tolerant(raw).unwrap();
        assert_eq!(v["verdict"], "pass");
    }

    #[test]
    fn json_fenced() {
        let raw = "Sure, here you go:\n```json\n{\"verdict\": \"pass\", \"reason\": \"fine\"}\n```\nDone.";
        let v = parse_tolerant(raw).unwrap();
        assert_eq!(v["verdict"], "pass");
    }

    #[test]
    fn plain_fenced() {
        let raw = "```\n{\"verdict\": \"reject\", \"reason\": \"no\"}\n```";
        let v = parse_tolerant(raw).unwrap();
        assert_eq!(v["verdict"], "reject");
    }

    #[test]
    fn bare_braces_in_prose() {
        let raw = "I think the answer is {\"verdict\": \"pass\", \"reason\": \"seems fine\"} based on context.";
        let v = parse_tolerant(raw).unwrap();
        assert_eq!(v["verdict"], "pass");
    }

    #[test]
    fn no_json_at_all() {
        assert!(parse_tolerant("no json here").is_err());
    }
}
