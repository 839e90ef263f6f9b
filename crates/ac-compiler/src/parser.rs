//! Parser — extract labeled sections from a free-text workflow spec.
//!
//! Recognizes `Workflow:`, `Description:`, `Inputs:`, `Steps:`, `Outputs:`
//! case-insensitively. Produces soft diagnostics only; the Reasoner works
//! with whichever sections were found.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(workflow|description|inputs|steps|outputs):\s*(.*)$").expect("label regex")
});

static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[.)]\s+(.*)$").expect("step regex"));

static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-*]\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\(([^)]*)\))?\s*(?::\s*(.*))?$")
        .expect("param regex")
});

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedSections {
    pub name: Option<String>,
    pub description: Option<String>,
    pub inputs: Vec<ParamEntry>,
    pub steps: Vec<String>,
    pub outputs: Vec<ParamEntry>,
}

/// One `- name (type): description` line from Inputs/Outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamEntry {
    pub name: String,
    pub type_name: Option<String>,
    pub description: String,
}

impl fmt::Display for ParamEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(t) = &self.type_name {
            write!(f, " ({t})")?;
        }
        if !self.description.is_empty() {
            write!(f, ": {}", self.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    pub section: String,
    pub message: String,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.section, self.message)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Workflow,
    Description,
    Inputs,
    Steps,
    Outputs,
}

/// Line-oriented extraction of the labeled blocks.
pub fn parse_sections(raw_spec: &str) -> (ParsedSections, Vec<ParseDiagnostic>) {
    let mut sections = ParsedSections::default();
    let mut diagnostics = Vec::new();
    let mut seen: Vec<Section> = Vec::new();
    let mut current = Section::None;

    for line in raw_spec.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            // Blank lines close the current section.
            current = Section::None;
            continue;
        }

        if let Some(caps) = LABEL_RE.captures(trimmed) {
            let label = match caps[1].to_ascii_lowercase().as_str() {
                "workflow" => Section::Workflow,
                "description" => Section::Description,
                "inputs" => Section::Inputs,
                "steps" => Section::Steps,
                _ => Section::Outputs,
            };
            if seen.contains(&label) {
                diagnostics.push(ParseDiagnostic {
                    section: section_name(label).into(),
                    message: "duplicate section, keeping the first occurrence".into(),
                });
                current = Section::None;
                continue;
            }
            seen.push(label);
            current = label;

            let rest = normalize_ws(&caps[2]);
            match label {
                Section::Workflow if !rest.is_empty() => sections.name = Some(rest),
                Section::Description if !rest.is_empty() => sections.description = Some(rest),
                _ => {}
            }
            continue;
        }

        match current {
            Section::None => {}
            Section::Workflow => {
                if sections.name.is_none() {
                    sections.name = Some(normalize_ws(trimmed));
                }
            }
            Section::Description => {
                let joined = match sections.description.take() {
                    Some(prev) => format!("{prev} {}", normalize_ws(trimmed)),
                    None => normalize_ws(trimmed),
                };
                sections.description = Some(joined);
            }
            Section::Inputs => parse_param_line(trimmed, &mut sections.inputs, &mut diagnostics, "Inputs"),
            Section::Outputs => parse_param_line(trimmed, &mut sections.outputs, &mut diagnostics, "Outputs"),
            Section::Steps => {
                if let Some(caps) = STEP_RE.captures(trimmed) {
                    sections.steps.push(normalize_ws(&caps[2]));
                } else if let Some(last) = sections.steps.last_mut() {
                    // Continuation of the previous numbered step.
                    last.push(' ');
                    last.push_str(&normalize_ws(trimmed));
                }
            }
        }
    }

    if sections.name.is_none() {
        diagnostics.push(ParseDiagnostic {
            section: "Workflow".into(),
            message: "missing 'Workflow:' section".into(),
        });
    }
    if sections.description.is_none() {
        diagnostics.push(ParseDiagnostic {
            section: "Description".into(),
            message: "missing 'Description:' section".into(),
        });
    }
    if !seen.contains(&Section::Steps) {
        diagnostics.push(ParseDiagnostic {
            section: "Steps".into(),
            message: "missing 'Steps:' section".into(),
        });
    } else if sections.steps.is_empty() {
        diagnostics.push(ParseDiagnostic {
            section: "Steps".into(),
            message: "section contains no numbered steps".into(),
        });
    }

    (sections, diagnostics)
}

fn parse_param_line(
    line: &str,
    entries: &mut Vec<ParamEntry>,
    diagnostics: &mut Vec<ParseDiagnostic>,
    section: &str,
) {
    if line.starts_with('-') || line.starts_with('*') {
        if let Some(caps) = PARAM_RE.captures(line) {
            let type_name = caps.get(2).map(|m| normalize_ws(m.as_str()));
            match &type_name {
                None => diagnostics.push(ParseDiagnostic {
                    section: section.into(),
                    message: format!("entry '{}' has no type, assuming string", &caps[1]),
                }),
                Some(t) if ac_core::ast::ParamType::parse_loose(t).is_none() => {
                    diagnostics.push(ParseDiagnostic {
                        section: section.into(),
                        message: format!("entry '{}' has unrecognized type '{t}'", &caps[1]),
                    });
                }
                Some(_) => {}
            }
            entries.push(ParamEntry {
                name: caps[1].to_string(),
                type_name,
                description: caps
                    .get(3)
                    .map(|m| normalize_ws(m.as_str()))
                    .unwrap_or_default(),
            });
        } else {
            diagnostics.push(ParseDiagnostic {
                section: section.into(),
                message: format!("unparseable entry: {line}"),
            });
        }
    } else if let Some(last) = entries.last_mut() {
        // Wrapped description line.
        if !last.description.is_empty() {
            last.description.push(' ');
        }
        last.description.push_str(&normalize_ws(line));
    }
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn section_name(s: Section) -> &'static str {
    match s {
        Section::None => "",
        Section::Workflow => "Workflow",
        Section::Description => "Description",
        Section::Inputs => "Inputs",
        Section::Steps => "Steps",
        Section::Outputs => "Outputs",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = "\
Workflow: data_processing_pipeline
Description: Process customer data end to end

Inputs:
- customer_id (string): The customer ID to process
- database_url (string): Postgres DSN

Steps:
1. Fetch customer data from database using customer_id
2. Validate customer data format
   including nested address records
3. Calculate lifetime value

Outputs:
- result (string): Processing summary
";

    #[test]
    fn extracts_all_sections() {
        let (sections, diagnostics) = parse_sections(SPEC);
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        assert_eq!(sections.name.as_deref(), Some("data_processing_pipeline"));
        assert_eq!(
            sections.description.as_deref(),
            Some("Process customer data end to end")
        );
        assert_eq!(sections.inputs.len(), 2);
        assert_eq!(sections.inputs[1].name, "database_url");
        assert_eq!(sections.outputs.len(), 1);
        assert_eq!(sections.steps.len(), 3);
    }

    #[test]
    fn joins_step_continuation_lines() {
        let (sections, _) = parse_sections(SPEC);
        assert_eq!(
            sections.steps[1],
            "Validate customer data format including nested address records"
        );
    }

    #[test]
    fn missing_sections_are_soft() {
        let (sections, diagnostics) = parse_sections("Steps:\n1. Do the thing\n");
        assert_eq!(sections.steps.len(), 1);
        let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("Workflow")));
        assert!(messages.iter().any(|m| m.contains("Description")));
    }

    #[test]
    fn duplicate_section_keeps_first() {
        let input = "Workflow: first\n\nWorkflow: second\n\nSteps:\n1. X\n";
        let (sections, diagnostics) = parse_sections(input);
        assert_eq!(sections.name.as_deref(), Some("first"));
        assert!(diagnostics.iter().any(|d| d.message.contains("duplicate")));
    }

    #[test]
    fn empty_steps_is_diagnosed() {
        let (_, diagnostics) = parse_sections("Workflow: x\nDescription: y\nSteps:\n");
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("no numbered steps")));
    }

    #[test]
    fn unrecognized_param_type_is_diagnosed() {
        let (sections, diagnostics) =
            parse_sections("Workflow: x\nDescription: y\nInputs:\n- payload (tensor): blob\nSteps:\n1. X\n");
        assert_eq!(sections.inputs[0].type_name.as_deref(), Some("tensor"));
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("unrecognized type 'tensor'")));
    }

    #[test]
    fn untyped_param_defaults_to_string() {
        let (sections, diagnostics) =
            parse_sections("Workflow: x\nDescription: y\nInputs:\n- order_id: some order\nSteps:\n1. X\n");
        assert_eq!(sections.inputs[0].type_name, None);
        assert!(diagnostics.iter().any(|d| d.message.contains("no type")));
    }
}
