//! Tolerant extraction of structured plans from raw model text.
//!
//! Models wrap their JSON in prose, markdown fences or trailing commentary.
//! Rather than demanding a clean document, we locate the first balanced JSON
//! object in the text and decode only that slice.

use crate::error::{PlannerError, PlannerResult};
use crate::types::ParsedResponse;

/// Find the first balanced `{ ... }` object in `text`.
///
/// The scan is string-aware: braces inside JSON string literals (including
/// escaped quotes) do not affect nesting depth. Returns `None` when no
/// opening brace exists or the object never closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode one model reply into a [`ParsedResponse`].
///
/// The reply must contain a JSON object with `reasoning`, `plan` and `tasks`
/// keys; surrounding prose and code fences are ignored. Prose sometimes
/// carries its own brace pairs before the real object, so when an extracted
/// candidate fails to decode the scan resumes from the next opening brace.
/// A reply with no decodable object anywhere is a parse error, never a
/// silently empty plan.
pub fn parse_response(raw: &str) -> PlannerResult<ParsedResponse> {
    let mut remaining = raw;
    let mut first_failure: Option<String> = None;

    while let Some(json) = extract_json_object(remaining) {
        match serde_json::from_str(json) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                if first_failure.is_none() {
                    first_failure = Some(format!(
                        "{e} in extracted object: {}",
                        snippet(json)
                    ));
                }
                // step past this candidate's opening brace and rescan
                match remaining.find('{') {
                    Some(start) => remaining = &remaining[start + 1..],
                    None => break,
                }
            }
        }
    }

    Err(PlannerError::Parse(first_failure.unwrap_or_else(|| {
        format!("no JSON object found in response: {}", snippet(raw))
    })))
}

fn snippet(text: &str) -> String {
    const MAX: usize = 120;
    let trimmed = text.trim();
    if trimmed.len() <= MAX {
        return trimmed.to_string();
    }
    let mut end = MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_object_from_markdown_fence() {
        let raw = "Sure! Here's the plan:\n```json\n{\"reasoning\": \"r\", \"plan\": \"p\", \"tasks\": []}\n```\nLet me know!";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.reasoning, "r");
        assert_eq!(parsed.plan, "p");
        assert!(parsed.tasks.is_empty());
    }

    #[test]
    fn extracts_first_balanced_object_with_nesting() {
        let text = r#"noise {"a": {"b": 1}, "c": [2]} trailing {"d": 3}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": 1}, "c": [2]}"#));
    }

    #[test]
    fn braces_inside_strings_do_not_affect_depth() {
        let text = r#"{"note": "use } and { freely", "n": 1}"#;
        assert_eq!(extract_json_object(text), Some(text));

        let escaped = r#"{"note": "quote \" then }", "n": 2}"#;
        assert_eq!(extract_json_object(escaped), Some(escaped));
    }

    #[test]
    fn stray_brace_pair_in_prose_does_not_mask_the_plan() {
        let raw = r#"Use {this format}: {"reasoning": "r", "plan": "p", "tasks": []}"#;
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.reasoning, "r");
        assert_eq!(parsed.plan, "p");
    }

    #[test]
    fn unterminated_object_yields_none() {
        assert_eq!(extract_json_object(r#"{"open": true"#), None);
        assert_eq!(extract_json_object("no braces here"), None);
    }

    #[test]
    fn parses_tasks_with_parameters() {
        let raw = r#"{
            "reasoning": "the player asked for iron",
            "plan": "mine 5 iron ore",
            "tasks": [
                {"action": "mine", "parameters": {"block": "iron_ore", "quantity": 5}}
            ]
        }"#;
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.tasks.len(), 1);
        assert_eq!(parsed.tasks[0].action, "mine");
        assert_eq!(
            parsed.tasks[0].parameter("quantity"),
            Some(&ParamValue::Number(5.0))
        );
    }

    #[test]
    fn missing_required_key_is_a_parse_error() {
        let raw = r#"{"reasoning": "r", "tasks": []}"#;
        assert!(matches!(
            parse_response(raw),
            Err(PlannerError::Parse(_))
        ));
    }

    #[test]
    fn prose_without_json_is_a_parse_error() {
        let err = parse_response("I cannot help with that.").unwrap_err();
        assert!(matches!(err, PlannerError::Parse(_)));
    }

    #[test]
    fn tasks_default_empty_parameters() {
        let raw = r#"{"reasoning": "r", "plan": "p", "tasks": [{"action": "follow"}]}"#;
        let parsed = parse_response(raw).unwrap();
        assert!(parsed.tasks[0].parameters.is_empty());
    }
}
