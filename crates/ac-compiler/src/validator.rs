//! Validator — enforce the IR schema, referential integrity, and safety.
//!
//! One depth-first traversal of the node tree carrying the scope
//! environment (the set of variable names visible at the current program
//! point). Scope composition:
//!
//! - sequential: each step's `assigns_to` extends the environment for
//!   later steps;
//! - conditional: branches get private frames; only names assigned in
//!   BOTH branches merge into the outer scope;
//! - parallel: branches get isolated copies of the pre-split environment;
//!   with `wait_for_all` the union of branch bindings (conflicts are
//!   errors) becomes visible after the join, otherwise nothing does;
//! - orchestrator: sub-workflows validate in the pre-call environment and
//!   leak nothing to siblings or the caller.

use ac_core::ast::{Node, Parameter, WorkflowSpec};
use ac_core::condition::{check_condition, ConditionError, Token};
use ac_core::ident::{is_credential_name, is_reserved_tool, is_valid_identifier, malformed_refs, variable_refs};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

static SEMVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("semver regex"));

/// Identifier-like tokens allowed in conditions without being in scope.
const CONDITION_LITERALS: &[&str] = &["true", "false", "none", "null"];

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    Schema,
    InvalidIdentifier,
    DuplicateName,
    UnknownVariable,
    NestedAccess,
    UnsafeCondition,
    ReservedTool,
    UnknownWorkflow,
    EmptySteps,
    BranchCount,
    ScopeConflict,
    CredentialLiteral,
    BadVersion,
    EmptyDescription,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueCode::Schema => "SCHEMA",
            IssueCode::InvalidIdentifier => "INVALID_IDENTIFIER",
            IssueCode::DuplicateName => "DUPLICATE_NAME",
            IssueCode::UnknownVariable => "UNKNOWN_VARIABLE",
            IssueCode::NestedAccess => "NESTED_ACCESS",
            IssueCode::UnsafeCondition => "UNSAFE_CONDITION",
            IssueCode::ReservedTool => "RESERVED_TOOL",
            IssueCode::UnknownWorkflow => "UNKNOWN_WORKFLOW",
            IssueCode::EmptySteps => "EMPTY_STEPS",
            IssueCode::BranchCount => "BRANCH_COUNT",
            IssueCode::ScopeConflict => "SCOPE_CONFLICT",
            IssueCode::CredentialLiteral => "CREDENTIAL_LITERAL",
            IssueCode::BadVersion => "BAD_VERSION",
            IssueCode::EmptyDescription => "EMPTY_DESCRIPTION",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Slash-joined location, e.g. `workflow/steps/2/condition`.
    pub path: String,
    pub code: IssueCode,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.path, self.code, self.message)
    }
}

/// A validated spec plus non-fatal warnings.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub spec: WorkflowSpec,
    pub warnings: Vec<ValidationIssue>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Validate a candidate IR value. Returns the typed spec (with credential
/// flags applied) or the ordered list of violations.
pub fn validate(candidate: &serde_json::Value) -> Result<ValidationOutcome, Vec<ValidationIssue>> {
    let mut spec: WorkflowSpec = match serde_json::from_value(candidate.clone()) {
        Ok(spec) => spec,
        Err(e) => {
            return Err(vec![ValidationIssue {
                path: "$".into(),
                code: IssueCode::Schema,
                message: format!("candidate does not match the IR schema: {e}"),
            }])
        }
    };

    // Credential auto-detection runs before any other input check so the
    // literal-default rule sees the final flags.
    for input in &mut spec.inputs {
        if !input.is_credential && is_credential_name(&input.name) {
            input.is_credential = true;
        }
    }

    let mut walker = Walker::default();
    walker.check_envelope(&spec);

    let mut env: BTreeSet<String> = spec.inputs.iter().map(|p| p.name.clone()).collect();
    walker.walk(&spec.workflow, "workflow", &mut env);

    if walker.issues.is_empty() {
        Ok(ValidationOutcome {
            spec,
            warnings: walker.warnings,
        })
    } else {
        Err(walker.issues)
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Walker {
    issues: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Walker {
    fn issue(&mut self, path: &str, code: IssueCode, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            code,
            message: message.into(),
        });
    }

    fn warning(&mut self, path: &str, code: IssueCode, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            code,
            message: message.into(),
        });
    }

    // -- envelope ----------------------------------------------------------

    fn check_envelope(&mut self, spec: &WorkflowSpec) {
        if !is_valid_identifier(&spec.name) {
            self.issue(
                "name",
                IssueCode::InvalidIdentifier,
                format!("workflow name '{}' must be snake_case (1-64 chars)", spec.name),
            );
        }
        if spec.description.trim().is_empty() {
            self.issue(
                "description",
                IssueCode::EmptyDescription,
                "description must be non-empty",
            );
        }
        if !SEMVER_RE.is_match(&spec.version) {
            self.issue(
                "version",
                IssueCode::BadVersion,
                format!("'{}' is not a semantic version", spec.version),
            );
        }

        self.check_parameters(&spec.inputs, "inputs", true);
        self.check_parameters(&spec.outputs, "outputs", false);
    }

    fn check_parameters(&mut self, params: &[Parameter], section: &str, allow_credential: bool) {
        let mut seen = BTreeSet::new();
        for (i, param) in params.iter().enumerate() {
            let path = format!("{section}/{i}/name");
            if !is_valid_identifier(&param.name) {
                self.issue(
                    &path,
                    IssueCode::InvalidIdentifier,
                    format!("parameter name '{}' must be snake_case", param.name),
                );
            }
            if !seen.insert(param.name.clone()) {
                self.issue(
                    &path,
                    IssueCode::DuplicateName,
                    format!("duplicate {section} name '{}'", param.name),
                );
            }
            if allow_credential {
                if param.is_credential && param.default.is_some() {
                    self.issue(
                        &format!("{section}/{i}/default"),
                        IssueCode::CredentialLiteral,
                        format!(
                            "credential parameter '{}' must not carry a literal default",
                            param.name
                        ),
                    );
                }
            } else if param.is_credential {
                self.issue(
                    &format!("{section}/{i}"),
                    IssueCode::Schema,
                    "outputs must not carry is_credential",
                );
            }
        }
    }

    // -- node tree ---------------------------------------------------------

    fn walk(&mut self, node: &Node, path: &str, env: &mut BTreeSet<String>) {
        match node {
            Node::ToolCall(call) => self.walk_tool_call(call, path, env),
            Node::Sequential(seq) => {
                if seq.steps.is_empty() {
                    self.issue(
                        &format!("{path}/steps"),
                        IssueCode::EmptySteps,
                        "sequential node must have at least one step",
                    );
                }
                for (i, step) in seq.steps.iter().enumerate() {
                    self.walk(step, &format!("{path}/steps/{i}"), env);
                }
            }
            Node::Conditional(cond) => {
                self.check_condition_str(&cond.condition, &format!("{path}/condition"), env);

                let mut if_env = env.clone();
                self.walk(&cond.if_branch, &format!("{path}/if_branch"), &mut if_env);

                if let Some(else_branch) = &cond.else_branch {
                    let mut else_env = env.clone();
                    self.walk(else_branch, &format!("{path}/else_branch"), &mut else_env);

                    // Names assigned in both branches are guaranteed after
                    // the conditional; everything else stays private.
                    let if_new: BTreeSet<_> = if_env.difference(env).cloned().collect();
                    let else_new: BTreeSet<_> = else_env.difference(env).cloned().collect();
                    env.extend(if_new.intersection(&else_new).cloned());
                }
            }
            Node::Parallel(par) => {
                if par.branches.len() < 2 || par.branches.len() > 10 {
                    self.issue(
                        &format!("{path}/branches"),
                        IssueCode::BranchCount,
                        format!("parallel node needs 2-10 branches, found {}", par.branches.len()),
                    );
                }

                let pre = env.clone();
                let mut per_branch: Vec<BTreeSet<String>> = Vec::new();
                for (i, branch) in par.branches.iter().enumerate() {
                    let mut branch_env = pre.clone();
                    self.walk(branch, &format!("{path}/branches/{i}"), &mut branch_env);
                    per_branch.push(branch_env.difference(&pre).cloned().collect());
                }

                if par.wait_for_all {
                    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                    for new in &per_branch {
                        for name in new {
                            *counts.entry(name.as_str()).or_default() += 1;
                        }
                    }
                    for (name, count) in counts {
                        if count > 1 {
                            self.issue(
                                &format!("{path}/branches"),
                                IssueCode::ScopeConflict,
                                format!("variable '{name}' is assigned in {count} parallel branches"),
                            );
                        } else {
                            env.insert(name.to_string());
                        }
                    }
                } else {
                    for (i, new) in per_branch.iter().enumerate() {
                        for name in new {
                            self.warning(
                                &format!("{path}/branches/{i}"),
                                IssueCode::ScopeConflict,
                                format!(
                                    "'{name}' assigned in a fire-and-forget branch is not visible after the join"
                                ),
                            );
                        }
                    }
                }
            }
            Node::Orchestrator(orch) => {
                if orch.sub_workflows.is_empty() {
                    self.issue(
                        &format!("{path}/sub_workflows"),
                        IssueCode::Schema,
                        "orchestrator must have at least one sub-workflow",
                    );
                }
                for name in orch.sub_workflows.keys() {
                    if !is_valid_identifier(name) {
                        self.issue(
                            &format!("{path}/sub_workflows/{name}"),
                            IssueCode::InvalidIdentifier,
                            format!("sub-workflow name '{name}' must be snake_case"),
                        );
                    }
                }

                for (i, rule) in orch.routing_rules.iter().enumerate() {
                    self.check_condition_str(
                        &rule.condition,
                        &format!("{path}/routing_rules/{i}/condition"),
                        env,
                    );
                    if !orch.sub_workflows.contains_key(&rule.workflow_name) {
                        self.issue(
                            &format!("{path}/routing_rules/{i}/workflow_name"),
                            IssueCode::UnknownWorkflow,
                            format!(
                                "routing rule targets undefined sub-workflow '{}'",
                                rule.workflow_name
                            ),
                        );
                    }
                }
                if let Some(default) = &orch.default_workflow {
                    if !orch.sub_workflows.contains_key(default) {
                        self.issue(
                            &format!("{path}/default_workflow"),
                            IssueCode::UnknownWorkflow,
                            format!("default workflow '{default}' not found in sub_workflows"),
                        );
                    }
                }

                // Sub-workflows run in the pre-call environment; their
                // bindings never escape.
                for (name, sub) in &orch.sub_workflows {
                    let mut sub_env = env.clone();
                    self.walk(sub, &format!("{path}/sub_workflows/{name}"), &mut sub_env);
                }
            }
        }
    }

    fn walk_tool_call(&mut self, call: &ac_core::ast::ToolCall, path: &str, env: &mut BTreeSet<String>) {
        if !is_valid_identifier(&call.tool_name) {
            self.issue(
                &format!("{path}/tool_name"),
                IssueCode::InvalidIdentifier,
                format!("tool name '{}' must be snake_case", call.tool_name),
            );
        }
        if is_reserved_tool(&call.tool_name) {
            self.issue(
                &format!("{path}/tool_name"),
                IssueCode::ReservedTool,
                format!("'{}' is reserved for compiler control flow", call.tool_name),
            );
        }

        for (key, value) in &call.parameters {
            let param_path = format!("{path}/parameters/{key}");
            if !is_valid_identifier(key) {
                self.issue(
                    &param_path,
                    IssueCode::InvalidIdentifier,
                    format!("parameter key '{key}' must be snake_case"),
                );
            }
            match value {
                serde_json::Value::String(s) => self.check_value_refs(s, &param_path, env),
                serde_json::Value::Number(_)
                | serde_json::Value::Bool(_)
                | serde_json::Value::Null => {}
                _ => self.issue(
                    &param_path,
                    IssueCode::Schema,
                    "parameter value must be a scalar constant or a string with {{var}} references",
                ),
            }
        }

        if let Some(assigns_to) = &call.assigns_to {
            if !is_valid_identifier(assigns_to) {
                self.issue(
                    &format!("{path}/assigns_to"),
                    IssueCode::InvalidIdentifier,
                    format!("assigns_to '{assigns_to}' must be snake_case"),
                );
            }
            env.insert(assigns_to.clone());
        }
    }

    // -- expressions -------------------------------------------------------

    fn check_value_refs(&mut self, value: &str, path: &str, env: &BTreeSet<String>) {
        for bad in malformed_refs(value) {
            if bad.contains('.') {
                self.issue(
                    path,
                    IssueCode::NestedAccess,
                    format!("nested access '{{{{{bad}}}}}' is forbidden; bind the value first"),
                );
            } else {
                self.issue(
                    path,
                    IssueCode::InvalidIdentifier,
                    format!("malformed variable reference '{{{{{bad}}}}}'"),
                );
            }
        }
        for name in variable_refs(value) {
            if !env.contains(&name) {
                self.issue(
                    path,
                    IssueCode::UnknownVariable,
                    format!(
                        "'{{{{{name}}}}}' is not in scope; available: {}",
                        available(env)
                    ),
                );
            }
        }
    }

    fn check_condition_str(&mut self, condition: &str, path: &str, env: &BTreeSet<String>) {
        let tokens = match check_condition(condition) {
            Ok(tokens) => tokens,
            Err(ConditionError::BadReference(inner)) if inner.contains('.') => {
                self.issue(
                    path,
                    IssueCode::NestedAccess,
                    format!("nested access '{{{{{inner}}}}}' is forbidden in conditions"),
                );
                return;
            }
            Err(e) => {
                self.issue(path, IssueCode::UnsafeCondition, e.to_string());
                return;
            }
        };

        for token in tokens {
            let name = match token {
                Token::VarRef(name) => name,
                Token::Ident(name) if !CONDITION_LITERALS.contains(&name.as_str()) => name,
                _ => continue,
            };
            if !env.contains(&name) {
                self.issue(
                    path,
                    IssueCode::UnknownVariable,
                    format!("condition references '{name}' which is not in scope; available: {}", available(env)),
                );
            }
        }
    }
}

fn available(env: &BTreeSet<String>) -> String {
    if env.is_empty() {
        "(nothing)".to_string()
    } else {
        env.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_spec(workflow: serde_json::Value) -> serde_json::Value {
        json!({
            "name": "test_flow",
            "description": "test workflow",
            "inputs": [{"name": "customer_id", "type": "string", "description": "id"}],
            "outputs": [{"name": "result", "type": "string", "description": "out"}],
            "workflow": workflow
        })
    }

    fn tool(name: &str, params: serde_json::Value, assigns_to: Option<&str>) -> serde_json::Value {
        let mut node = json!({"type": "tool_call", "tool_name": name, "parameters": params});
        if let Some(var) = assigns_to {
            node["assigns_to"] = json!(var);
        }
        node
    }

    fn codes(errs: &[ValidationIssue]) -> Vec<IssueCode> {
        errs.iter().map(|e| e.code).collect()
    }

    #[test]
    fn accepts_sequential_with_chained_scope() {
        let spec = base_spec(json!({
            "type": "sequential",
            "steps": [
                tool("fetch_data", json!({"id": "{{customer_id}}"}), Some("data")),
                tool("validate_data", json!({"payload": "{{data}}"}), Some("checked")),
                tool("store_result", json!({"value": "{{checked}}"}), None),
            ]
        }));
        let outcome = validate(&spec).unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.spec.name, "test_flow");
    }

    #[test]
    fn rejects_out_of_scope_reference() {
        let spec = base_spec(json!({
            "type": "sequential",
            "steps": [
                tool("use_data", json!({"payload": "{{data}}"}), None),
                tool("fetch_data", json!({}), Some("data")),
            ]
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::UnknownVariable]);
        assert_eq!(errs[0].path, "workflow/steps/0/parameters/payload");
    }

    #[test]
    fn rejects_reserved_tool_names() {
        for reserved in ["conditional_route", "parallel_execute", "orchestrator_route"] {
            let spec = base_spec(tool(reserved, json!({}), None));
            let errs = validate(&spec).unwrap_err();
            assert!(codes(&errs).contains(&IssueCode::ReservedTool), "{reserved}");
        }
    }

    #[test]
    fn rejects_unsafe_condition() {
        let spec = base_spec(json!({
            "type": "conditional",
            "condition": "__import__('os')",
            "if_branch": tool("noop", json!({}), None)
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::UnsafeCondition]);
        assert_eq!(errs[0].path, "workflow/condition");
    }

    #[test]
    fn rejects_dotted_access_in_condition() {
        let spec = base_spec(json!({
            "type": "conditional",
            "condition": "{{order.total}} > 10",
            "if_branch": tool("noop", json!({}), None)
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::NestedAccess]);
    }

    #[test]
    fn conditional_merges_only_common_bindings() {
        // `summary` is assigned in both branches, `extra` only in one.
        let spec = base_spec(json!({
            "type": "sequential",
            "steps": [
                {
                    "type": "conditional",
                    "condition": "{{customer_id}} == 'vip'",
                    "if_branch": {
                        "type": "sequential",
                        "steps": [
                            tool("handle_vip", json!({}), Some("summary")),
                            tool("log_vip", json!({}), Some("extra")),
                        ]
                    },
                    "else_branch": tool("handle_default", json!({}), Some("summary"))
                },
                tool("send_summary", json!({"body": "{{summary}}"}), None),
            ]
        }));
        assert!(validate(&spec).is_ok());

        let spec = base_spec(json!({
            "type": "sequential",
            "steps": [
                {
                    "type": "conditional",
                    "condition": "{{customer_id}} == 'vip'",
                    "if_branch": tool("handle_vip", json!({}), Some("extra")),
                    "else_branch": tool("handle_default", json!({}), Some("summary"))
                },
                tool("use_extra", json!({"body": "{{extra}}"}), None),
            ]
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::UnknownVariable]);
    }

    #[test]
    fn if_only_branch_leaks_nothing() {
        let spec = base_spec(json!({
            "type": "sequential",
            "steps": [
                {
                    "type": "conditional",
                    "condition": "{{customer_id}} == 'vip'",
                    "if_branch": tool("handle_vip", json!({}), Some("summary"))
                },
                tool("send_summary", json!({"body": "{{summary}}"}), None),
            ]
        }));
        assert!(validate(&spec).is_err());
    }

    #[test]
    fn parallel_siblings_are_isolated() {
        let spec = base_spec(json!({
            "type": "parallel",
            "branches": [
                tool("check_inventory", json!({}), Some("inventory")),
                tool("check_pricing", json!({"context": "{{inventory}}"}), None),
            ]
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::UnknownVariable]);
        assert_eq!(errs[0].path, "workflow/branches/1/parameters/context");
    }

    #[test]
    fn parallel_join_exposes_branch_bindings() {
        let spec = base_spec(json!({
            "type": "sequential",
            "steps": [
                {
                    "type": "parallel",
                    "branches": [
                        tool("check_inventory", json!({}), Some("inventory")),
                        tool("check_pricing", json!({}), Some("pricing")),
                    ]
                },
                tool("combine_results", json!({"a": "{{inventory}}", "b": "{{pricing}}"}), None),
            ]
        }));
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn parallel_conflicting_bindings_rejected() {
        let spec = base_spec(json!({
            "type": "parallel",
            "branches": [
                tool("check_a", json!({}), Some("result_data")),
                tool("check_b", json!({}), Some("result_data")),
            ]
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::ScopeConflict]);
    }

    #[test]
    fn fire_and_forget_bindings_warn_and_stay_private() {
        let spec = base_spec(json!({
            "type": "sequential",
            "steps": [
                {
                    "type": "parallel",
                    "wait_for_all": false,
                    "branches": [
                        tool("notify_a", json!({}), Some("ack_a")),
                        tool("notify_b", json!({}), None),
                    ]
                },
                tool("use_ack", json!({"ack": "{{ack_a}}"}), None),
            ]
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::UnknownVariable]);

        // Without the downstream use it validates, with a warning.
        let spec = base_spec(json!({
            "type": "parallel",
            "wait_for_all": false,
            "branches": [
                tool("notify_a", json!({}), Some("ack_a")),
                tool("notify_b", json!({}), None),
            ]
        }));
        let outcome = validate(&spec).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].message.contains("ack_a"));
    }

    #[test]
    fn branch_count_bounds() {
        let spec = base_spec(json!({
            "type": "parallel",
            "branches": [tool("only_one", json!({}), None)]
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::BranchCount]);
    }

    #[test]
    fn orchestrator_routing_references_checked() {
        let spec = base_spec(json!({
            "type": "orchestrator",
            "sub_workflows": {
                "high_priority": tool("expedite", json!({}), None),
                "standard": tool("process", json!({}), None)
            },
            "routing_rules": [
                {"condition": "{{customer_id}} == 'vip'", "workflow_name": "high_priority"},
                {"condition": "{{customer_id}} != 'vip'", "workflow_name": "missing"}
            ],
            "default_workflow": "standard"
        }));
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::UnknownWorkflow]);
        assert_eq!(errs[0].path, "workflow/routing_rules/1/workflow_name");
    }

    #[test]
    fn orchestrator_bindings_do_not_escape() {
        let spec = base_spec(json!({
            "type": "sequential",
            "steps": [
                {
                    "type": "orchestrator",
                    "sub_workflows": {
                        "standard": tool("process", json!({}), Some("routed"))
                    },
                    "routing_rules": [
                        {"condition": "{{customer_id}} == 'x'", "workflow_name": "standard"}
                    ],
                    "default_workflow": "standard"
                },
                tool("use_routed", json!({"r": "{{routed}}"}), None),
            ]
        }));
        assert!(validate(&spec).is_err());
    }

    #[test]
    fn credential_autodetection_and_literal_rejection() {
        let mut spec = base_spec(tool("connect", json!({"dsn": "{{database_url}}"}), None));
        spec["inputs"] = json!([
            {"name": "database_url", "type": "string", "description": "Postgres DSN"}
        ]);
        let outcome = validate(&spec).unwrap();
        assert!(outcome.spec.inputs[0].is_credential);

        spec["inputs"][0]["default"] = json!("postgres://user:pw@host/db");
        let errs = validate(&spec).unwrap_err();
        assert_eq!(codes(&errs), vec![IssueCode::CredentialLiteral]);
    }

    #[test]
    fn duplicate_input_names_rejected() {
        let mut spec = base_spec(tool("noop", json!({}), None));
        spec["inputs"] = json!([
            {"name": "x", "type": "string"},
            {"name": "x", "type": "string"}
        ]);
        let errs = validate(&spec).unwrap_err();
        assert!(codes(&errs).contains(&IssueCode::DuplicateName));
    }

    #[test]
    fn schema_mismatch_reported_with_path() {
        let errs = validate(&json!({"name": "x"})).unwrap_err();
        assert_eq!(errs[0].code, IssueCode::Schema);
        assert_eq!(errs[0].path, "$");
    }

    #[test]
    fn bad_version_and_identifiers() {
        let mut spec = base_spec(tool("noop", json!({}), None));
        spec["name"] = json!("Not Snake");
        spec["version"] = json!("v1");
        let errs = validate(&spec).unwrap_err();
        assert!(codes(&errs).contains(&IssueCode::InvalidIdentifier));
        assert!(codes(&errs).contains(&IssueCode::BadVersion));
    }
}
