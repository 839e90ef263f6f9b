//! Workflow IR — the typed AST that phase 1 produces and phase 2 consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// WorkflowSpec — top-level envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    /// Workflow identifier (snake_case, 1-64 chars).
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// Semantic version of the workflow definition.
    #[serde(default = "default_version")]
    pub version: String,

    /// Input parameters, in declaration order.
    #[serde(default)]
    pub inputs: Vec<Parameter>,

    /// Output parameters, in declaration order.
    #[serde(default)]
    pub outputs: Vec<Parameter>,

    /// Root node of the workflow body.
    pub workflow: Node,

    /// Free-form metadata carried through the pipeline untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

fn default_version() -> String {
    "1.0.0".into()
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    #[serde(rename = "type")]
    pub param_type: ParamType,

    #[serde(default)]
    pub description: String,

    /// Set automatically when the name matches a credential marker.
    /// Outputs never carry this flag.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_credential: bool,

    #[serde(default = "default_true")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Float,
    Boolean,
    Date,
    Text,
    Email,
    Object,
}

impl ParamType {
    /// Parse the loose type names that appear in `- name (type): ...` lines.
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Some(ParamType::String),
            "number" => Some(ParamType::Number),
            "integer" | "int" => Some(ParamType::Integer),
            "float" => Some(ParamType::Float),
            "boolean" | "bool" => Some(ParamType::Boolean),
            "date" => Some(ParamType::Date),
            "text" => Some(ParamType::Text),
            "email" => Some(ParamType::Email),
            "object" | "dict" => Some(ParamType::Object),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node — polymorphic via tagged enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    ToolCall(ToolCall),
    Sequential(Sequential),
    Conditional(Conditional),
    Parallel(Parallel),
    Orchestrator(Orchestrator),
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::ToolCall(_) => "tool_call",
            Node::Sequential(_) => "sequential",
            Node::Conditional(_) => "conditional",
            Node::Parallel(_) => "parallel",
            Node::Orchestrator(_) => "orchestrator",
        }
    }
}

// ---------------------------------------------------------------------------
// Tool call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool function name (snake_case).
    pub tool_name: String,

    /// Parameter name → expression. String values may embed `{{var}}`
    /// references; other JSON values are passed through as constants.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,

    /// Variable under which the result is bound in the current scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigns_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Sequential
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequential {
    /// Steps executed in order; each step sees bindings from earlier steps.
    pub steps: Vec<Node>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Conditional
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    /// Guarded expression string, e.g. `"{{amount}} > 500"`.
    pub condition: String,

    pub if_branch: Box<Node>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_branch: Option<Box<Node>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Parallel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parallel {
    /// Concurrent branches (2..=10). Branches are isolated from each other.
    pub branches: Vec<Node>,

    /// When true, bindings from all branches are visible after the join.
    /// When false, no post-join bindings exist.
    #[serde(default = "default_true")]
    pub wait_for_all: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orchestrator {
    /// Named sub-workflows available for routing.
    pub sub_workflows: BTreeMap<String, Node>,

    /// Evaluated top to bottom; first matching rule wins.
    pub routing_rules: Vec<RoutingRule>,

    /// Fallback when no rule matches. Must be a key of `sub_workflows`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_workflow: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub condition: String,
    pub workflow_name: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> WorkflowSpec {
        WorkflowSpec {
            name: "expense_approval".into(),
            description: "Approve expenses with manager escalation".into(),
            version: "1.0.0".into(),
            inputs: vec![Parameter {
                name: "expense_id".into(),
                param_type: ParamType::String,
                description: "Expense to process".into(),
                is_credential: false,
                required: true,
                default: None,
            }],
            outputs: vec![Parameter {
                name: "approval_result".into(),
                param_type: ParamType::Object,
                description: "Decision details".into(),
                is_credential: false,
                required: true,
                default: None,
            }],
            workflow: Node::Sequential(Sequential {
                steps: vec![Node::ToolCall(ToolCall {
                    tool_name: "fetch_expense".into(),
                    parameters: [("expense_id".to_string(), "{{expense_id}}".into())]
                        .into_iter()
                        .collect(),
                    assigns_to: Some("expense".into()),
                    description: None,
                })],
                description: None,
            }),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn round_trip_workflow_spec() {
        let spec = sample_spec();
        let json = serde_json::to_string_pretty(&spec).unwrap();
        let back: WorkflowSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn node_tagged_serde() {
        let node = Node::ToolCall(ToolCall {
            tool_name: "send_email".into(),
            parameters: BTreeMap::new(),
            assigns_to: None,
            description: None,
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "tool_call");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), "tool_call");
    }

    #[test]
    fn version_defaults_when_missing() {
        let json = r#"{
            "name": "t",
            "description": "d",
            "workflow": {"type": "tool_call", "tool_name": "noop"}
        }"#;
        let spec: WorkflowSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.version, "1.0.0");
        assert!(spec.inputs.is_empty());
    }

    #[test]
    fn credential_flag_omitted_when_false() {
        let spec = sample_spec();
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json["inputs"][0].get("is_credential").is_none());
    }

    #[test]
    fn unknown_node_type_rejected() {
        let json = r#"{"type": "loop", "body": []}"#;
        assert!(serde_json::from_str::<Node>(json).is_err());
    }

    #[test]
    fn unknown_param_type_rejected() {
        let json = r#"{"name": "x", "type": "tensor"}"#;
        assert!(serde_json::from_str::<Parameter>(json).is_err());
    }
}
