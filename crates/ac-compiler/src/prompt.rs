//! Versioned system prompts for the Reasoner.
//!
//! The prompt instructs the model to emit a single JSON object matching the
//! IR schema. Selecting an unknown version falls back to the latest with a
//! warning so older callers keep working.

pub const LATEST_VERSION: &str = "2.0.0";

const PROMPT_V1: &str = r#"You are a workflow parser. Convert the specification into a single JSON object.

The object must have: name, description, version, inputs, outputs, workflow.
The workflow field is a node object whose "type" is one of: tool_call,
sequential, conditional, parallel, orchestrator.

Return ONLY valid JSON. No explanations. No markdown. No code fences."#;

const PROMPT_V2: &str = r#"You are a workflow compiler front-end. Convert specifications into JSON with ZERO tolerance for errors.

OUTPUT STRUCTURE:
{
  "name": "workflow_name_from_spec",
  "description": "copy from the spec Description field",
  "version": "1.0.0",
  "inputs": [
    {"name": "input_name", "type": "string", "description": "from spec"}
  ],
  "outputs": [
    {"name": "output_name", "type": "string", "description": "from spec"}
  ],
  "workflow": {
    "type": "sequential",
    "steps": [
      {
        "type": "tool_call",
        "tool_name": "action_verb_noun",
        "parameters": {"key": "{{variable_name}}"},
        "assigns_to": "output_variable"
      }
    ]
  }
}

NODE KINDS:
- tool_call: tool_name (snake_case), parameters (name to value), optional assigns_to
- sequential: steps (ordered list of nodes)
- conditional: condition (e.g. "{{amount}} > 500"), if_branch, optional else_branch
- parallel: branches (2 to 10 nodes), wait_for_all (boolean, default true)
- orchestrator: sub_workflows (name to node), routing_rules (list of
  {"condition": ..., "workflow_name": ...}), optional default_workflow

MANDATORY RULES:
1. Count the numbered steps in the specification and create EXACTLY that many
   steps at the top level. A step describing a branch becomes one conditional
   node; a step describing concurrent work becomes one parallel node.
2. All names are snake_case identifiers. Never invent a tool named
   conditional_route, parallel_execute, or orchestrator_route.
3. Reference earlier results only through {{variable_name}}. A reference must
   name an input or a prior assigns_to that is still in scope. No dotted
   access like {{order.total}}.
4. Conditions use only comparison operators (> < == != >= <=), and/or/not,
   in/is, literals, and {{variable}} references.
5. Parameters whose names look like credentials (api_key, token, password,
   database_url, ...) keep their names; never inline credential values.

Return ONLY valid JSON. No explanations. No markdown. No code fences."#;

/// Resolve a prompt version tag to (effective version, prompt text).
pub fn system_prompt(version: &str) -> (&'static str, &'static str) {
    match version {
        "1.0.0" => ("1.0.0", PROMPT_V1),
        "2.0.0" => ("2.0.0", PROMPT_V2),
        other => {
            tracing::warn!(requested = other, "unknown prompt version, using latest");
            (LATEST_VERSION, PROMPT_V2)
        }
    }
}
