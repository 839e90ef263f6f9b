//! Identifier rules — naming, reserved tools, credential detection,
//! variable-reference extraction.

use regex::Regex;
use std::sync::LazyLock;

/// Substrings that mark an input parameter as a credential.
pub const CREDENTIAL_MARKERS: &[&str] = &[
    "api_key",
    "apikey",
    "token",
    "password",
    "secret",
    "database_url",
    "db_url",
    "connection_string",
    "auth",
    "bearer",
    "private_key",
];

/// Tool names reserved for the compiler's own control-flow constructs.
pub const RESERVED_TOOL_NAMES: &[&str] =
    &["conditional_route", "parallel_execute", "orchestrator_route"];

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("identifier regex"));

/// `{{ name }}` with a plain identifier inside.
static VAR_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([a-z_][a-z0-9_]*)\s*\}\}").expect("var ref regex"));

/// Any `{{ ... }}` occurrence, used to detect malformed or dotted references.
static ANY_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("any ref regex"));

/// True when `s` is a valid snake_case identifier of at most 64 chars.
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.len() <= 64 && IDENT_RE.is_match(s)
}

/// True when `name` matches a credential marker (case-insensitive).
pub fn is_credential_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn is_reserved_tool(name: &str) -> bool {
    RESERVED_TOOL_NAMES.contains(&name)
}

/// Extract all well-formed `{{identifier}}` references from `text`.
pub fn variable_refs(text: &str) -> Vec<String> {
    VAR_REF_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Find `{{...}}` occurrences that are NOT plain identifiers, e.g. the
/// dotted form `{{order.total}}` or stray uppercase. Returns the offending
/// inner text of each.
pub fn malformed_refs(text: &str) -> Vec<String> {
    ANY_REF_RE
        .captures_iter(text)
        .filter(|c| !IDENT_RE.is_match(&c[1]))
        .map(|c| c[1].to_string())
        .collect()
}
