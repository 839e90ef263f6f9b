//! Pipeline controller — drives Parser → Reasoner ⇄ Validator →
//! Serializer → Generator, persisting a snapshot after every node.
//!
//! The controller owns no policy: retry/escalation decisions live in the
//! state transition function. It enforces the wall-clock budget, races
//! LLM calls against cancellation, and never silently recovers from
//! generation, serialization, or configuration failures.

use crate::checkpoint::CheckpointSink;
use crate::state::{
    escalation_report, transition, ErrorKind, Event, ExecutionStatus, PipelineState,
};
use ac_compiler::generator::{generate, GeneratedArtifact};
use ac_compiler::parser::parse_sections;
use ac_compiler::reasoner::Reasoner;
use ac_compiler::serializer::to_canonical_json;
use ac_compiler::validator::validate;
use ac_compiler::CompilerError;
use ac_llm::LlmProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

pub struct Controller {
    provider: Arc<dyn LlmProvider>,
    prompt_version: String,
    checkpoint: Arc<dyn CheckpointSink>,
    total_budget: Duration,
    cancel: Option<watch::Receiver<bool>>,
}

/// Final state of one run plus the generation record when it completed.
pub struct PipelineRun {
    pub state: PipelineState,
    pub artifact: Option<GeneratedArtifact>,
}

impl Controller {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        prompt_version: String,
        checkpoint: Arc<dyn CheckpointSink>,
        total_budget: Duration,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Self {
        Self {
            provider,
            prompt_version,
            checkpoint,
            total_budget,
            cancel,
        }
    }

    pub async fn run(&self, raw_spec: &str) -> PipelineRun {
        let deadline = Instant::now() + self.total_budget;
        let mut state = PipelineState::new(raw_spec.to_string());
        state.execution_status = ExecutionStatus::Parsing;
        tracing::info!(execution_id = %state.execution_id, "pipeline started");
        self.save(&state);

        // Parser (soft diagnostics only).
        let (sections, diagnostics) = parse_sections(&state.raw_spec);
        state = transition(
            state,
            Event::ParseDone {
                sections,
                diagnostics,
            },
        );
        self.save(&state);

        let reasoner = Reasoner::new(self.provider.clone(), &self.prompt_version);

        // Reason ⇄ validate loop; the transition function decides between
        // retry-with-feedback and escalation.
        while state.execution_status == ExecutionStatus::Reasoning {
            if self.is_cancelled() {
                state = transition(state, Event::Cancelled);
                break;
            }
            let Some(remaining) = remaining_budget(deadline) else {
                state = transition(state, budget_exceeded());
                break;
            };

            let sections = state.parsed_sections.clone().unwrap_or_default();
            let feedback = state.feedback_messages.clone();
            let diagnostics = state.parse_diagnostics.clone();
            let infer = reasoner.infer(&sections, &feedback, state.retry_count, &diagnostics);

            let inferred = tokio::select! {
                result = tokio::time::timeout(remaining, infer) => result,
                _ = wait_for_cancel(self.cancel.clone()) => {
                    state = transition(state, Event::Cancelled);
                    break;
                }
            };

            let event = match inferred {
                Err(_) => budget_exceeded(),
                Ok(Ok(output)) => Event::ReasonDone {
                    candidate: output.candidate,
                    confidence: output.confidence,
                },
                Ok(Err(CompilerError::MalformedResponse(message))) => Event::ReasonFailed {
                    message: format!("model returned malformed JSON: {message}"),
                },
                Ok(Err(CompilerError::Provider(e))) => Event::Fatal {
                    kind: if e.is_configuration() {
                        ErrorKind::ConfigurationError
                    } else {
                        ErrorKind::ProviderError
                    },
                    stage: "reasoner".into(),
                    message: e.to_string(),
                },
                Ok(Err(other)) => Event::Fatal {
                    kind: ErrorKind::GenerationError,
                    stage: "reasoner".into(),
                    message: other.to_string(),
                },
            };
            state = transition(state, event);
            self.save(&state);

            if state.execution_status == ExecutionStatus::Validating {
                let candidate = state.candidate_ir.clone().unwrap_or_default();
                let event = match validate(&candidate) {
                    Ok(outcome) => Event::ValidateDone {
                        spec: outcome.spec,
                        warnings: outcome.warnings,
                    },
                    Err(issues) => {
                        tracing::warn!(
                            count = issues.len(),
                            retry = state.retry_count,
                            "validation failed"
                        );
                        Event::ValidateFailed { issues }
                    }
                };
                state = transition(state, event);
                self.save(&state);
            }
        }

        // Phase 2: serialize then generate. Failures here are implementer
        // bugs and terminate the run.
        let mut artifact = None;
        if state.execution_status == ExecutionStatus::Generating {
            if self.is_cancelled() {
                state = transition(state, Event::Cancelled);
            } else {
                let spec = state
                    .validated_spec
                    .clone()
                    .expect("generating status implies a validated spec");
                match to_canonical_json(&spec) {
                    Ok(json) => {
                        state = transition(state, Event::SerializeDone { json });
                        self.save(&state);
                        match generate(&spec, state.confidence_score) {
                            Ok(generated) => {
                                state = transition(
                                    state,
                                    Event::GenerateDone {
                                        code: generated.code.clone(),
                                    },
                                );
                                artifact = Some(generated);
                            }
                            Err(e) => {
                                state = transition(
                                    state,
                                    Event::Fatal {
                                        kind: ErrorKind::GenerationError,
                                        stage: "generator".into(),
                                        message: e.to_string(),
                                    },
                                );
                            }
                        }
                    }
                    Err(e) => {
                        state = transition(
                            state,
                            Event::Fatal {
                                kind: ErrorKind::SerializationError,
                                stage: "serializer".into(),
                                message: e.to_string(),
                            },
                        );
                    }
                }
            }
        }

        self.save(&state);
        match state.execution_status {
            ExecutionStatus::Complete => {
                tracing::info!(execution_id = %state.execution_id, "pipeline complete")
            }
            ExecutionStatus::Escalated => {
                tracing::warn!("\n{}", escalation_report(&state));
            }
            _ => tracing::error!(
                execution_id = %state.execution_id,
                status = ?state.execution_status,
                "pipeline did not complete"
            ),
        }

        PipelineRun { state, artifact }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn save(&self, state: &PipelineState) {
        if let Err(e) = self.checkpoint.save(state.execution_id, state) {
            tracing::warn!(error = %e, "checkpoint write failed");
        }
    }
}

fn remaining_budget(deadline: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        None
    } else {
        Some(remaining)
    }
}

fn budget_exceeded() -> Event {
    Event::Fatal {
        kind: ErrorKind::ProviderError,
        stage: "controller".into(),
        message: "pipeline wall-clock budget exceeded".into(),
    }
}

/// Resolves when the cancel flag flips to true; never resolves without one.
async fn wait_for_cancel(rx: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = rx {
        if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}
