//! Randomized structural tests for scope soundness and canonical
//! serialization, driven by a seeded generator so failures reproduce.

use ac_compiler::serializer::to_canonical_json;
use ac_compiler::validator::{validate, IssueCode};
use ac_core::ast::WorkflowSpec;
use serde_json::{json, Value};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Deterministic RNG (64-bit LCG)
// ---------------------------------------------------------------------------

struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Rng(seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493))
    }

    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next() % 100 < percent
    }
}

// ---------------------------------------------------------------------------
// Random well-scoped IR generation
// ---------------------------------------------------------------------------

struct SpecGen {
    rng: Rng,
    fresh_counter: usize,
    /// Every `{{ref}}` emitted while generating, for mutation tests.
    refs_used: Vec<String>,
}

impl SpecGen {
    fn new(seed: u64) -> Self {
        Self {
            rng: Rng::new(seed),
            fresh_counter: 0,
            refs_used: Vec::new(),
        }
    }

    fn fresh_name(&mut self) -> String {
        self.fresh_counter += 1;
        format!("var_{}", self.fresh_counter)
    }

    fn pick_ref(&mut self, scope: &BTreeSet<String>) -> Option<String> {
        if scope.is_empty() {
            return None;
        }
        let names: Vec<&String> = scope.iter().collect();
        let name = names[self.rng.below(names.len())].clone();
        self.refs_used.push(name.clone());
        Some(name)
    }

    fn gen_spec(&mut self) -> Value {
        let input_count = 1 + self.rng.below(3);
        let mut scope = BTreeSet::new();
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let name = self.fresh_name();
            inputs.push(json!({"name": name, "type": "string", "description": "generated"}));
            scope.insert(name);
        }

        let workflow = self.gen_node(&mut scope, 3);
        json!({
            "name": "generated_flow",
            "description": "randomly generated workflow",
            "version": "1.0.0",
            "inputs": inputs,
            "outputs": [{"name": "final_result", "type": "object", "description": "out"}],
            "workflow": workflow
        })
    }

    /// Generate a node whose references are all in scope, mirroring the
    /// validator's composition rules exactly.
    fn gen_node(&mut self, scope: &mut BTreeSet<String>, depth: usize) -> Value {
        let kind = if depth == 0 { 0 } else { self.rng.below(5) };
        match kind {
            1 => {
                let steps: Vec<Value> = (0..1 + self.rng.below(3))
                    .map(|_| self.gen_node(scope, depth - 1))
                    .collect();
                json!({"type": "sequential", "steps": steps})
            }
            2 => {
                let condition = self.gen_condition(scope);
                let mut if_scope = scope.clone();
                let if_branch = self.gen_node(&mut if_scope, depth - 1);
                if self.rng.chance(60) {
                    let mut else_scope = scope.clone();
                    let else_branch = self.gen_node(&mut else_scope, depth - 1);
                    // Fresh names are globally unique, so the two branches
                    // never assign the same name: nothing merges outward.
                    json!({
                        "type": "conditional", "condition": condition,
                        "if_branch": if_branch, "else_branch": else_branch
                    })
                } else {
                    json!({"type": "conditional", "condition": condition, "if_branch": if_branch})
                }
            }
            3 => {
                let pre = scope.clone();
                let mut branches = Vec::new();
                for _ in 0..2 + self.rng.below(2) {
                    let mut branch_scope = pre.clone();
                    branches.push(self.gen_node(&mut branch_scope, depth - 1));
                    // wait_for_all=true: the union of branch bindings joins
                    // the outer scope (names are unique, so no conflicts).
                    scope.extend(branch_scope.difference(&pre).cloned());
                }
                json!({"type": "parallel", "branches": branches, "wait_for_all": true})
            }
            4 => {
                let mut subs = serde_json::Map::new();
                let mut names = Vec::new();
                for _ in 0..1 + self.rng.below(2) {
                    let name = self.fresh_name();
                    let mut sub_scope = scope.clone();
                    subs.insert(name.clone(), self.gen_node(&mut sub_scope, depth - 1));
                    names.push(name);
                }
                let rules: Vec<Value> = names
                    .iter()
                    .map(|name| json!({"condition": self.gen_condition(scope), "workflow_name": name}))
                    .collect();
                json!({
                    "type": "orchestrator",
                    "sub_workflows": Value::Object(subs),
                    "routing_rules": rules,
                    "default_workflow": names[0]
                })
            }
            _ => {
                let mut parameters = serde_json::Map::new();
                if let Some(reference) = self.pick_ref(scope) {
                    parameters.insert("payload".into(), json!(format!("{{{{{reference}}}}}")));
                }
                if self.rng.chance(50) {
                    parameters.insert("limit".into(), json!(10));
                }
                let mut node = json!({
                    "type": "tool_call",
                    "tool_name": format!("tool_{}", self.rng.below(8)),
                    "parameters": Value::Object(parameters)
                });
                if self.rng.chance(70) {
                    let name = self.fresh_name();
                    node["assigns_to"] = json!(name);
                    scope.insert(name);
                }
                node
            }
        }
    }

    fn gen_condition(&mut self, scope: &BTreeSet<String>) -> String {
        match self.pick_ref(scope) {
            Some(name) if self.rng.chance(50) => format!("{{{{{name}}}}} > {}", self.rng.below(100)),
            Some(name) => format!("{{{{{name}}}}} == 'expected' or {{{{{name}}}}} != 'other'"),
            None => "1 < 2".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn well_scoped_random_irs_validate() {
    for seed in 0..200 {
        let mut spec_gen = SpecGen::new(seed);
        let candidate = spec_gen.gen_spec();
        let outcome = validate(&candidate);
        assert!(
            outcome.is_ok(),
            "seed {seed} produced a rejected well-scoped IR: {:?}\n{candidate}",
            outcome.err()
        );
    }
}

#[test]
fn unknown_reference_mutation_is_rejected() {
    let mut checked = 0;
    for seed in 0..200 {
        let mut spec_gen = SpecGen::new(seed);
        let candidate = spec_gen.gen_spec();
        let Some(victim) = spec_gen.refs_used.first() else {
            continue;
        };

        let mutated_text = candidate
            .to_string()
            .replace(&format!("{{{{{victim}}}}}"), "{{ghost_variable}}");
        let mutated: Value = serde_json::from_str(&mutated_text).unwrap();

        let errs = validate(&mutated).expect_err(&format!("seed {seed} accepted a ghost reference"));
        assert!(
            errs.iter().any(|e| e.code == IssueCode::UnknownVariable),
            "seed {seed}: {errs:?}"
        );
        checked += 1;
    }
    assert!(checked > 100, "mutation coverage too thin: {checked}");
}

#[test]
fn canonical_serialization_round_trips_random_irs() {
    for seed in 0..200 {
        let mut spec_gen = SpecGen::new(seed);
        let candidate = spec_gen.gen_spec();
        let spec = validate(&candidate).unwrap().spec;

        let canonical = to_canonical_json(&spec).unwrap();
        let back: WorkflowSpec = serde_json::from_str(&canonical).unwrap();
        assert_eq!(back, spec, "seed {seed}");

        // Key order of the incoming JSON must not affect the output.
        let pretty = serde_json::to_string_pretty(&serde_json::from_str::<Value>(&canonical).unwrap()).unwrap();
        let reparsed: WorkflowSpec = serde_json::from_str(&pretty).unwrap();
        assert_eq!(to_canonical_json(&reparsed).unwrap(), canonical, "seed {seed}");
    }
}
