//! Generator — emit a self-contained Python agent from a validated spec.
//!
//! Emission is fully deterministic: tool methods appear in first-seen
//! order, keyword parameters are the sorted superset across call sites,
//! and the output carries no timestamps. Compiling the same spec twice
//! yields byte-identical code.

use crate::CompilerError;
use ac_core::ast::{Node, Parameter, ToolCall, WorkflowSpec};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static FULL_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{\s*([a-z_][a-z0-9_]*)\s*\}\}$").expect("full ref regex"));

/// Generated agent source plus its provenance record.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedArtifact {
    pub workflow_name: String,
    pub code: String,
    pub code_size: usize,
    /// Content hash of `code`; stable across runs for the same spec.
    pub sha256: String,
    pub generated_at: DateTime<Utc>,
    pub confidence: f64,
}

/// Compile the validated spec into agent source.
pub fn generate(spec: &WorkflowSpec, confidence: f64) -> Result<GeneratedArtifact, CompilerError> {
    let tools = collect_tools(spec);
    let credentials: Vec<&Parameter> = spec.inputs.iter().filter(|p| p.is_credential).collect();

    let mut emitter = Emitter::default();
    emit_docstring(&mut emitter, spec, &credentials);
    emit_imports(&mut emitter, spec, &credentials);
    emit_constants(&mut emitter, &credentials);
    if !credentials.is_empty() {
        emit_credential_store(&mut emitter, &credentials);
    }
    emit_agent_class(&mut emitter, spec, &tools, &credentials)?;
    emit_main_block(&mut emitter, spec);

    let code = emitter.finish();
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());

    Ok(GeneratedArtifact {
        workflow_name: spec.name.clone(),
        code_size: code.len(),
        sha256: hex::encode(hasher.finalize()),
        generated_at: Utc::now(),
        confidence,
        code,
    })
}

// ---------------------------------------------------------------------------
// Tool collection
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ToolInfo {
    name: String,
    /// Superset of parameter names across all call sites.
    params: BTreeSet<String>,
    description: Option<String>,
}

/// First-seen order over a depth-first traversal; sub-workflows visit in
/// key order (the IR map is ordered).
fn collect_tools(spec: &WorkflowSpec) -> Vec<ToolInfo> {
    let mut tools: Vec<ToolInfo> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    visit_tools(&spec.workflow, &mut tools, &mut index);
    tools
}

fn visit_tools(node: &Node, tools: &mut Vec<ToolInfo>, index: &mut BTreeMap<String, usize>) {
    match node {
        Node::ToolCall(call) => {
            let i = *index.entry(call.tool_name.clone()).or_insert_with(|| {
                tools.push(ToolInfo {
                    name: call.tool_name.clone(),
                    params: BTreeSet::new(),
                    description: call.description.clone(),
                });
                tools.len() - 1
            });
            tools[i].params.extend(call.parameters.keys().cloned());
            if tools[i].description.is_none() {
                tools[i].description = call.description.clone();
            }
        }
        Node::Sequential(seq) => {
            for step in &seq.steps {
                visit_tools(step, tools, index);
            }
        }
        Node::Conditional(cond) => {
            visit_tools(&cond.if_branch, tools, index);
            if let Some(else_branch) = &cond.else_branch {
                visit_tools(else_branch, tools, index);
            }
        }
        Node::Parallel(par) => {
            for branch in &par.branches {
                visit_tools(branch, tools, index);
            }
        }
        Node::Orchestrator(orch) => {
            for sub in orch.sub_workflows.values() {
                visit_tools(sub, tools, index);
            }
        }
    }
}

fn has_parallel(node: &Node) -> bool {
    match node {
        Node::ToolCall(_) => false,
        Node::Sequential(seq) => seq.steps.iter().any(has_parallel),
        Node::Conditional(cond) => {
            has_parallel(&cond.if_branch)
                || cond.else_branch.as_deref().is_some_and(has_parallel)
        }
        Node::Parallel(_) => true,
        Node::Orchestrator(orch) => orch.sub_workflows.values().any(has_parallel),
    }
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Emitter {
    lines: Vec<String>,
    parallel_counter: usize,
}

impl Emitter {
    fn push(&mut self, indent: usize, text: &str) {
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", "    ".repeat(indent), text));
        }
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn finish(self) -> String {
        let mut code = self.lines.join("\n");
        code.push('\n');
        code
    }
}

fn emit_docstring(e: &mut Emitter, spec: &WorkflowSpec, credentials: &[&Parameter]) {
    e.push(0, "\"\"\"");
    e.push(0, &format!("Auto-generated agent: {}", spec.name));
    e.blank();
    e.push(0, &format!("Description: {}", spec.description));
    if !credentials.is_empty() {
        e.blank();
        e.push(0, "SETUP INSTRUCTIONS:");
        e.push(0, &"=".repeat(50));
        e.push(0, "This agent requires the following environment variables:");
        e.blank();
        for cred in credentials {
            let env_var = cred.name.to_uppercase();
            let desc = if cred.description.is_empty() {
                "Authentication credential"
            } else {
                cred.description.as_str()
            };
            e.push(0, &format!("- {env_var}: {desc}"));
            e.push(0, &format!("  Setup: export {env_var}=<your-value-here>"));
        }
    }
    e.blank();
    e.push(0, &format!("Version: {}", spec.version));
    e.push(0, "\"\"\"");
    e.blank();
}

fn emit_imports(e: &mut Emitter, spec: &WorkflowSpec, credentials: &[&Parameter]) {
    if has_parallel(&spec.workflow) {
        e.push(0, "import asyncio");
    }
    if !credentials.is_empty() {
        e.push(0, "import os");
    }
    e.push(0, "import re");
    e.push(0, "from typing import Any, Dict");
    e.blank();
}

fn emit_constants(e: &mut Emitter, credentials: &[&Parameter]) {
    let names: Vec<String> = credentials.iter().map(|c| py_str(&c.name)).collect();
    if names.is_empty() {
        e.push(0, "_CREDENTIAL_INPUTS = frozenset()");
    } else {
        e.push(0, &format!("_CREDENTIAL_INPUTS = frozenset({{{}}})", names.join(", ")));
    }
    e.blank();
    e.push(0, r#"_VAR_RE = re.compile(r"\{\{\s*([a-z_][a-z0-9_]*)\s*\}\}")"#);
    e.blank();
    e.push(0, "_TOKEN_RE = re.compile(");
    e.push(
        1,
        r#"r"\s*(\{\{\s*[a-z_][a-z0-9_]*\s*\}\}|>=|<=|==|!=|[<>(),]""#,
    );
    e.push(1, r#"r"|'[^']*'|\"[^\"]*\"|\d+(?:\.\d+)?|[a-z_][a-z0-9_]*)""#);
    e.push(0, ")");
    e.blank();
    e.blank();
}

fn emit_credential_store(e: &mut Emitter, credentials: &[&Parameter]) {
    e.push(0, "class CredentialStore:");
    e.push(1, "\"\"\"Loads credential inputs from the environment.\"\"\"");
    e.blank();
    e.push(1, "def __init__(self):");
    for cred in credentials {
        e.push(
            2,
            &format!("self.{} = self._require({})", cred.name, py_str(&cred.name.to_uppercase())),
        );
    }
    e.blank();
    e.push(1, "@staticmethod");
    e.push(1, "def _require(env_var):");
    e.push(2, "value = os.getenv(env_var)");
    e.push(2, "if not value:");
    e.push(3, "raise ValueError(");
    e.push(4, "f\"Missing {env_var} environment variable\\n\"");
    e.push(4, "f\"Setup: export {env_var}=<your-value-here>\"");
    e.push(3, ")");
    e.push(2, "return value");
    e.blank();
    e.blank();
}

fn emit_agent_class(
    e: &mut Emitter,
    spec: &WorkflowSpec,
    tools: &[ToolInfo],
    credentials: &[&Parameter],
) -> Result<(), CompilerError> {
    let class_name = to_class_name(&spec.name);
    e.push(0, &format!("class {class_name}:"));
    e.push(
        1,
        &format!("\"\"\"Executable agent for the {} workflow.\"\"\"", spec.name),
    );
    e.blank();

    // __init__
    e.push(1, "def __init__(self):");
    e.push(2, "self.context: Dict[str, Any] = {}");
    if !credentials.is_empty() {
        e.push(2, "credentials = CredentialStore()");
        for cred in credentials {
            e.push(
                2,
                &format!("self.context[{}] = credentials.{}", py_str(&cred.name), cred.name),
            );
        }
    }
    e.blank();

    emit_execute_method(e, spec)?;

    for tool in tools {
        emit_tool_method(e, tool);
    }

    emit_expression_helpers(e);
    Ok(())
}

fn emit_execute_method(e: &mut Emitter, spec: &WorkflowSpec) -> Result<(), CompilerError> {
    e.push(1, "def execute(self, **inputs) -> Dict[str, Any]:");
    e.push(2, "\"\"\"Run the workflow and return its declared outputs.\"\"\"");

    for input in &spec.inputs {
        if input.is_credential {
            continue;
        }
        if let Some(default) = &input.default {
            e.push(
                2,
                &format!("inputs.setdefault({}, {})", py_str(&input.name), py_value(default)),
            );
        } else if input.required {
            e.push(2, &format!("if {} not in inputs:", py_str(&input.name)));
            e.push(
                3,
                &format!("raise ValueError({})", py_str(&format!("Missing required input: {}", input.name))),
            );
        }
    }

    e.push(2, "for key, value in inputs.items():");
    e.push(3, "if key in _CREDENTIAL_INPUTS:");
    e.push(4, "continue  # credentials come from the store only");
    e.push(3, "self.context[key] = value");
    e.blank();

    emit_node(e, &spec.workflow, 2)?;
    e.blank();

    if spec.outputs.is_empty() {
        e.push(2, "return dict(self.context)");
    } else {
        let pairs: Vec<String> = spec
            .outputs
            .iter()
            .map(|out| format!("{0}: self.context.get({0})", py_str(&out.name)))
            .collect();
        e.push(2, &format!("return {{{}}}", pairs.join(", ")));
    }
    e.blank();
    Ok(())
}

fn emit_tool_method(e: &mut Emitter, tool: &ToolInfo) {
    if let Some(desc) = &tool.description {
        e.push(1, &format!("# {desc}"));
    }
    let params: Vec<String> = tool.params.iter().map(|p| format!("{p}=None")).collect();
    let signature = if params.is_empty() {
        format!("def {}(self):", tool.name)
    } else {
        format!("def {}(self, {}):", tool.name, params.join(", "))
    };
    e.push(1, &signature);
    e.push(2, &format!("\"\"\"Tool stub: {}\"\"\"", tool.name));
    let data: Vec<String> = tool
        .params
        .iter()
        .map(|p| format!("{}: {p}", py_str(p)))
        .collect();
    e.push(
        2,
        &format!(
            "return {{\"status\": \"not_implemented\", \"data\": {{{}}}}}",
            data.join(", ")
        ),
    );
    e.blank();
}

// ---------------------------------------------------------------------------
// Node compilation
// ---------------------------------------------------------------------------

fn emit_node(e: &mut Emitter, node: &Node, indent: usize) -> Result<(), CompilerError> {
    match node {
        Node::ToolCall(call) => emit_tool_call(e, call, indent),
        Node::Sequential(seq) => {
            if let Some(desc) = &seq.description {
                e.push(indent, &format!("# {desc}"));
            }
            for step in &seq.steps {
                emit_node(e, step, indent)?;
            }
            Ok(())
        }
        Node::Conditional(cond) => {
            if let Some(desc) = &cond.description {
                e.push(indent, &format!("# {desc}"));
            }
            e.push(
                indent,
                &format!("if self._eval_condition({}):", py_str(&cond.condition)),
            );
            emit_node(e, &cond.if_branch, indent + 1)?;
            if let Some(else_branch) = &cond.else_branch {
                e.push(indent, "else:");
                emit_node(e, else_branch, indent + 1)?;
            }
            Ok(())
        }
        Node::Parallel(par) => emit_parallel(e, par, indent),
        Node::Orchestrator(orch) => emit_orchestrator(e, orch, indent),
    }
}

fn emit_tool_call(e: &mut Emitter, call: &ToolCall, indent: usize) -> Result<(), CompilerError> {
    if let Some(desc) = &call.description {
        e.push(indent, &format!("# {desc}"));
    }
    let args: Vec<String> = call
        .parameters
        .iter()
        .map(|(key, value)| format!("{key}={}", py_expr(value)))
        .collect();
    let invocation = format!("self.{}({})", call.tool_name, args.join(", "));
    match &call.assigns_to {
        Some(var) => e.push(indent, &format!("self.context[{}] = {invocation}", py_str(var))),
        None => e.push(indent, &invocation),
    }
    Ok(())
}

fn emit_parallel(
    e: &mut Emitter,
    par: &ac_core::ast::Parallel,
    indent: usize,
) -> Result<(), CompilerError> {
    e.parallel_counter += 1;
    let pid = e.parallel_counter;

    if let Some(desc) = &par.description {
        e.push(indent, &format!("# {desc}"));
    }
    for (i, branch) in par.branches.iter().enumerate() {
        e.push(indent, &format!("async def _branch_{pid}_{}():", i + 1));
        emit_node(e, branch, indent + 1)?;
        e.blank();
    }

    e.push(indent, &format!("async def _parallel_{pid}():"));
    let calls: Vec<String> = (1..=par.branches.len())
        .map(|i| format!("_branch_{pid}_{i}()"))
        .collect();
    if par.wait_for_all {
        e.push(indent + 1, "# All branches complete before the join.");
        e.push(indent + 1, &format!("await asyncio.gather({})", calls.join(", ")));
    } else {
        e.push(indent + 1, "# Fire and forget: nothing after the join depends on these.");
        let tasks: Vec<String> = calls.iter().map(|c| format!("asyncio.ensure_future({c})")).collect();
        e.push(indent + 1, &format!("tasks = [{}]", tasks.join(", ")));
        e.push(
            indent + 1,
            "await asyncio.wait(tasks, return_when=asyncio.FIRST_COMPLETED)",
        );
        e.push(indent + 1, "for task in tasks:");
        e.push(indent + 2, "task.cancel()");
    }
    e.blank();
    e.push(indent, &format!("asyncio.run(_parallel_{pid}())"));
    Ok(())
}

fn emit_orchestrator(
    e: &mut Emitter,
    orch: &ac_core::ast::Orchestrator,
    indent: usize,
) -> Result<(), CompilerError> {
    if let Some(desc) = &orch.description {
        e.push(indent, &format!("# {desc}"));
    }

    let default = match &orch.default_workflow {
        Some(name) => Some(
            orch.sub_workflows
                .get(name)
                .ok_or_else(|| CompilerError::Generate(format!("default workflow '{name}' missing")))?,
        ),
        None => None,
    };

    if orch.routing_rules.is_empty() {
        return match default {
            Some(node) => emit_node(e, node, indent),
            None => {
                e.push(
                    indent,
                    "raise RuntimeError(\"no routing rule matched and no default workflow\")",
                );
                Ok(())
            }
        };
    }

    for (i, rule) in orch.routing_rules.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { "elif" };
        e.push(
            indent,
            &format!("{keyword} self._eval_condition({}):", py_str(&rule.condition)),
        );
        let target = orch.sub_workflows.get(&rule.workflow_name).ok_or_else(|| {
            CompilerError::Generate(format!("routing target '{}' missing", rule.workflow_name))
        })?;
        emit_node(e, target, indent + 1)?;
    }

    e.push(indent, "else:");
    match default {
        Some(node) => emit_node(e, node, indent + 1)?,
        None => e.push(
            indent + 1,
            "raise RuntimeError(\"no routing rule matched and no default workflow\")",
        ),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Expression helpers (emitted into the agent)
// ---------------------------------------------------------------------------

fn emit_expression_helpers(e: &mut Emitter) {
    const HELPERS: &str = r#"    def _interpolate(self, template):
        """Replace {{var}} references with values from the context."""
        def lookup(match):
            name = match.group(1)
            if name not in self.context:
                raise KeyError(f"undefined variable: {name}")
            return str(self.context[name])
        return _VAR_RE.sub(lookup, template)

    def _eval_condition(self, condition):
        """Evaluate a guard expression with a restricted interpreter."""
        tokens = self._tokenize_condition(condition.strip())
        value, rest = self._parse_or(tokens)
        if rest:
            raise ValueError(f"unexpected trailing tokens: {rest}")
        return bool(value)

    def _tokenize_condition(self, condition):
        tokens = []
        pos = 0
        while pos < len(condition):
            match = _TOKEN_RE.match(condition, pos)
            if not match:
                raise ValueError(f"bad token in condition at offset {pos}")
            tokens.append(match.group(1))
            pos = match.end()
        return tokens

    def _parse_or(self, tokens):
        value, rest = self._parse_and(tokens)
        while rest and rest[0] == "or":
            right, rest = self._parse_and(rest[1:])
            value = bool(value) or bool(right)
        return value, rest

    def _parse_and(self, tokens):
        value, rest = self._parse_not(tokens)
        while rest and rest[0] == "and":
            right, rest = self._parse_not(rest[1:])
            value = bool(value) and bool(right)
        return value, rest

    def _parse_not(self, tokens):
        if tokens and tokens[0] == "not":
            value, rest = self._parse_not(tokens[1:])
            return (not bool(value)), rest
        return self._parse_comparison(tokens)

    def _parse_comparison(self, tokens):
        left, rest = self._parse_atom(tokens)
        while rest and rest[0] in (">", "<", ">=", "<=", "==", "!=", "in", "is"):
            op = rest[0]
            right, rest = self._parse_atom(rest[1:])
            left = self._apply_operator(op, left, right)
        return left, rest

    @staticmethod
    def _apply_operator(op, left, right):
        if op == ">":
            return left > right
        if op == "<":
            return left < right
        if op == ">=":
            return left >= right
        if op == "<=":
            return left <= right
        if op == "==":
            return left == right
        if op == "!=":
            return left != right
        if op == "in":
            return left in right
        return left is right

    def _parse_atom(self, tokens):
        if not tokens:
            raise ValueError("unexpected end of condition")
        token, rest = tokens[0], tokens[1:]
        if token == "(":
            value, rest = self._parse_or(rest)
            if rest and rest[0] == ",":
                items = [value]
                while rest and rest[0] == ",":
                    item, rest = self._parse_or(rest[1:])
                    items.append(item)
                value = tuple(items)
            if not rest or rest[0] != ")":
                raise ValueError("unbalanced parentheses in condition")
            return value, rest[1:]
        if token.startswith("{{"):
            name = token[2:-2].strip()
            if name not in self.context:
                raise KeyError(f"undefined variable: {name}")
            return self.context[name], rest
        if token.startswith(("'", '"')):
            return token[1:-1], rest
        if token == "true":
            return True, rest
        if token == "false":
            return False, rest
        if token in ("none", "null"):
            return None, rest
        try:
            return (float(token) if "." in token else int(token)), rest
        except ValueError:
            return self.context.get(token), rest"#;
    for line in HELPERS.lines() {
        e.lines.push(line.to_string());
    }
    e.blank();
}

fn emit_main_block(e: &mut Emitter, spec: &WorkflowSpec) {
    e.blank();
    e.push(0, "if __name__ == \"__main__\":");
    e.push(1, &format!("agent = {}()", to_class_name(&spec.name)));
    e.push(1, "inputs = {");
    for input in &spec.inputs {
        if input.is_credential {
            continue;
        }
        e.push(
            2,
            &format!("{}: {},", py_str(&input.name), py_str(&format!("example_{}", input.name))),
        );
    }
    e.push(1, "}");
    e.push(1, "result = agent.execute(**inputs)");
    e.push(1, "print(result)");
}

// ---------------------------------------------------------------------------
// Python rendering helpers
// ---------------------------------------------------------------------------

fn to_class_name(snake_case: &str) -> String {
    let pascal: String = snake_case
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    format!("{pascal}Agent")
}

/// Render a parameter expression: a full `{{var}}` reference becomes a
/// context lookup, a string with embedded references goes through the
/// runtime interpolator, everything else is a literal.
fn py_expr(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => {
            if let Some(caps) = FULL_REF_RE.captures(s) {
                format!("self.context[{}]", py_str(&caps[1]))
            } else if !ac_core::ident::variable_refs(s).is_empty() {
                format!("self._interpolate({})", py_str(s))
            } else {
                py_str(s)
            }
        }
        other => py_value(other),
    }
}

/// Render a JSON constant as a Python literal.
fn py_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "None".into(),
        serde_json::Value::Bool(true) => "True".into(),
        serde_json::Value::Bool(false) => "False".into(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => py_str(s),
        // Non-scalar constants never survive validation.
        other => py_str(&other.to_string()),
    }
}

/// Double-quoted Python string literal with escaping.
fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
