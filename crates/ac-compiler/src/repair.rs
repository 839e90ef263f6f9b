//! Best-effort cleanup of LLM output before JSON parsing.
//!
//! Models wrap JSON in code fences, add prose around it, or double up the
//! braces of `{{var}}` references. These fixes are applied before the
//! attempt is declared malformed; parsing may still fail afterwards.

/// Apply all repairs and return the best candidate JSON string.
pub fn repair_json(raw: &str) -> String {
    let stripped = strip_code_fences(raw);
    let mut text = extract_json_object(&stripped).unwrap_or(stripped);

    // Quadruple braces around variable references ({{{{var}}}}).
    if text.contains("{{{{") || text.contains("}}}}") {
        text = text.replace("{{{{", "{{").replace("}}}}", "}}");
    }
    // Accidentally escaped braces.
    if text.contains("\\{") || text.contains("\\}") {
        text = text.replace("\\{", "{").replace("\\}", "}");
    }
    text
}

/// Remove a surrounding ``` or ```json fence if present.
fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches(['\r', '\n']);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim().to_string();
        }
        return rest.trim().to_string();
    }
    trimmed.to_string()
}

/// Extract the outermost `{ ... }` object, dropping prose before/after.
/// Brace counting ignores braces inside string literals.
fn extract_json_object(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
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

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(repair_json(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(repair_json(raw), "{\"a\": 1}");
    }

    #[test]
    fn extracts_object_from_prose() {
        let raw = "Here is the workflow:\n{\"a\": {\"b\": 2}}\nHope that helps!";
        assert_eq!(repair_json(raw), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn collapses_quadruple_braces() {
        let raw = r#"{"parameters": {"id": "{{{{customer_id}}}}"}}"#;
        assert_eq!(
            repair_json(raw),
            r#"{"parameters": {"id": "{{customer_id}}"}}"#
        );
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let raw = r#"{"note": "a } inside"} trailing"#;
        assert_eq!(repair_json(raw), r#"{"note": "a } inside"}"#);
    }

    #[test]
    fn passthrough_when_no_object() {
        assert_eq!(repair_json("no json here"), "no json here");
    }
}
