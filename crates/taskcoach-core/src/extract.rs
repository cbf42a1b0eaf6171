//! Structured-output extraction from generated text.
//!
//! Generated text is never trusted. Every stage that consumes model output
//! goes through [`extract`], which returns a typed record or an
//! [`ExtractError`]; callers decide their own fallback.
//!
//! Recovery order:
//! 1. the whole text parsed directly (the expected case when the backend
//!    honors a JSON response format),
//! 2. fences stripped, then the slice from the first `{` to the last `}`,
//! 3. every balanced `{...}` object in the cleaned text, first match wins.
//!    Objects nested inside an earlier closed candidate are not rescanned.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ExtractError;

/// Extract a `T` from raw generated text.
///
/// `required_keys` must all be present on the top-level object; a payload
/// missing one is rejected even if `T` could default it.
pub fn extract<T: DeserializeOwned>(
    raw_text: &str,
    required_keys: &[&str],
) -> Result<T, ExtractError> {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::EmptyOutput);
    }

    let mut best = match parse_candidate(trimmed, required_keys) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let cleaned = strip_fences(trimmed);

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            match parse_candidate(&cleaned[start..=end], required_keys) {
                Ok(value) => {
                    tracing::debug!("recovered JSON payload from surrounding text");
                    return Ok(value);
                }
                Err(e) => best = more_specific(best, e),
            }
        }
    }

    for candidate in balanced_objects(&cleaned) {
        match parse_candidate(candidate, required_keys) {
            Ok(value) => {
                tracing::debug!("recovered balanced JSON object from generated text");
                return Ok(value);
            }
            Err(e) => best = more_specific(best, e),
        }
    }

    Err(best)
}

/// Remove markdown code-fence markers, keeping the fenced content.
pub fn strip_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn parse_candidate<T: DeserializeOwned>(
    text: &str,
    required_keys: &[&str],
) -> Result<T, ExtractError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ExtractError::UnrecoverableOutput(e.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(ExtractError::InvalidShape("expected a JSON object".into()));
    };
    if let Some(missing) = required_keys.iter().find(|k| !object.contains_key(**k)) {
        return Err(ExtractError::MissingKey((*missing).to_string()));
    }

    serde_json::from_value(value).map_err(|e| ExtractError::InvalidShape(e.to_string()))
}

/// A parse that got as far as a JSON object says more than a syntax error.
fn more_specific(current: ExtractError, next: ExtractError) -> ExtractError {
    match (&current, &next) {
        (ExtractError::UnrecoverableOutput(_), ExtractError::MissingKey(_))
        | (ExtractError::UnrecoverableOutput(_), ExtractError::InvalidShape(_)) => next,
        _ => current,
    }
}

/// String-aware balanced `{...}` substrings, in order of opening brace.
///
/// Scanning resumes after each closed object, so the text is walked once
/// unless an opening brace never closes.
fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    let mut resume = 0;
    text.char_indices().filter_map(move |(start, ch)| {
        if ch != '{' || start < resume {
            return None;
        }
        let end = start + find_object_end(&text[start..])?;
        resume = end;
        Some(&text[start..end])
    })
}

/// Byte length of the balanced object at the start of `s`, if it closes.
fn find_object_end(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        summary: String,
        steps: Vec<String>,
    }

    const KEYS: &[&str] = &["summary", "steps"];

    #[test]
    fn empty_and_whitespace_are_empty_output() {
        assert!(matches!(
            extract::<Payload>("", KEYS),
            Err(ExtractError::EmptyOutput)
        ));
        assert!(matches!(
            extract::<Payload>("  \n\t ", KEYS),
            Err(ExtractError::EmptyOutput)
        ));
    }

    #[test]
    fn direct_json_fast_path() {
        let p: Payload = extract(r#"{"summary": "s", "steps": ["a"]}"#, KEYS).unwrap();
        assert_eq!(p.summary, "s");
        assert_eq!(p.steps, vec!["a"]);
    }

    #[test]
    fn fenced_json_is_recovered() {
        let raw = "```json\n{\"summary\": \"fenced\", \"steps\": []}\n```";
        let p: Payload = extract(raw, KEYS).unwrap();
        assert_eq!(p.summary, "fenced");
    }

    #[test]
    fn prose_around_payload_is_recovered() {
        let raw = "Sure! Here is your help:\n{\"summary\": \"x\", \"steps\": [\"one\", \"two\"]}\nGood luck.";
        let p: Payload = extract(raw, KEYS).unwrap();
        assert_eq!(p.steps.len(), 2);
    }

    #[test]
    fn stray_brace_in_trailing_prose_is_recovered() {
        let raw = "{\"summary\": \"x\", \"steps\": []} note: ignore this } brace";
        let p: Payload = extract(raw, KEYS).unwrap();
        assert_eq!(p.summary, "x");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_scan() {
        let raw = "noise { {\"summary\": \"use {braces}\", \"steps\": [\"}\"]}";
        let p: Payload = extract(raw, KEYS).unwrap();
        assert_eq!(p.summary, "use {braces}");
        assert_eq!(p.steps, vec!["}"]);
    }

    #[test]
    fn no_braces_is_unrecoverable() {
        assert!(matches!(
            extract::<Payload>("I cannot help with that.", KEYS),
            Err(ExtractError::UnrecoverableOutput(_))
        ));
    }

    #[test]
    fn missing_key_is_reported() {
        let err = extract::<Payload>(r#"{"summary": "only"}"#, KEYS).unwrap_err();
        assert!(matches!(err, ExtractError::MissingKey(ref k) if k == "steps"));
    }

    #[test]
    fn wrong_field_type_is_invalid_shape() {
        let err = extract::<Payload>(r#"{"summary": 3, "steps": []}"#, KEYS).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidShape(_)));
    }

    #[test]
    fn object_inside_top_level_array_is_recovered() {
        // The array fails the fast path; the inner object is then recovered.
        let p: Payload = extract(r#"[{"summary": "x", "steps": []}]"#, KEYS).unwrap();
        assert_eq!(p.summary, "x");
    }

    #[test]
    fn scan_moves_past_a_rejected_object() {
        let raw = r#"{"wrapper": {"summary": "inner", "steps": []}} then {"summary": "next", "steps": []}"#;
        let p: Payload = extract(raw, KEYS).unwrap();
        assert_eq!(p.summary, "next");
    }

    #[test]
    fn deeply_nested_braces_are_scanned_once() {
        let depth = 20_000;
        let text = format!("{}{} tail", "{".repeat(depth), "}".repeat(depth));
        let objects: Vec<&str> = balanced_objects(&text).collect();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].len(), 2 * depth);
    }

    #[test]
    fn unclosed_brace_does_not_hide_later_objects() {
        let objects: Vec<&str> = balanced_objects("{ open {\"a\": 1} and {}").collect();
        assert_eq!(objects, vec![r#"{"a": 1}"#, "{}"]);
    }

    #[test]
    fn strip_fences_removes_markers() {
        assert_eq!(strip_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_fences("```\n{}\n```"), "{}");
    }

    proptest! {
        #[test]
        fn payload_is_recovered_from_any_brace_free_prose(
            before in "[a-zA-Z0-9 .,:\n]{0,40}",
            after in "[a-zA-Z0-9 .,:\n]{0,40}",
            summary in "[a-zA-Z0-9 {}.,]{0,20}",
            steps in proptest::collection::vec("[a-zA-Z0-9 ]{0,10}", 0..4),
            fenced in any::<bool>(),
        ) {
            let body = serde_json::json!({ "summary": summary, "steps": steps }).to_string();
            let body = if fenced { format!("```json\n{body}\n```") } else { body };
            let raw = format!("{before}{body}{after}");

            let p: Payload = extract(&raw, KEYS).unwrap();
            prop_assert_eq!(p.summary, summary);
            prop_assert_eq!(p.steps, steps);
        }
    }
}
