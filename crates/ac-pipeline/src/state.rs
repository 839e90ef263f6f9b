//! Pipeline state and its pure transition function.
//!
//! The controller is a thin driver that feeds [`Event`]s into
//! [`transition`]; all retry/escalation policy lives here so it can be
//! tested without LLM calls. A run's state is discarded when it
//! terminates in `complete`, `escalated`, or `failed`.

use ac_compiler::parser::{ParseDiagnostic, ParsedSections};
use ac_compiler::validator::ValidationIssue;
use ac_core::ast::WorkflowSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation retries before the run escalates to human review.
pub const MAX_RETRIES: u32 = 3;

/// Confidence below this after a successful validation escalates.
pub const CONFIDENCE_THRESHOLD: f64 = 0.8;

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// User-visible error taxonomy; variant names are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    ParsingError,
    ProviderError,
    GenerationError,
    SerializationError,
    ConfigurationError,
    EscalationRequired,
}

// ---------------------------------------------------------------------------
// Status and state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Initial,
    Parsing,
    Reasoning,
    Validating,
    Generating,
    Complete,
    Escalated,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Complete | ExecutionStatus::Escalated | ExecutionStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Which stage produced the error (parser, reasoner, validator, ...).
    pub stage: String,
    pub error_type: ErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot persisted to the checkpoint sink after every node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub execution_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub raw_spec: String,
    pub parsed_sections: Option<ParsedSections>,
    pub parse_diagnostics: Vec<ParseDiagnostic>,
    pub candidate_ir: Option<serde_json::Value>,
    pub validated_spec: Option<WorkflowSpec>,
    pub validation_warnings: Vec<ValidationIssue>,
    pub serialized_json: Option<String>,
    pub generated_code: Option<String>,
    pub retry_count: u32,
    pub error_history: Vec<ErrorRecord>,
    /// Consumed by the Reasoner on the next attempt.
    pub feedback_messages: Vec<String>,
    pub confidence_score: f64,
    pub execution_status: ExecutionStatus,
}

impl PipelineState {
    pub fn new(raw_spec: String) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            raw_spec,
            parsed_sections: None,
            parse_diagnostics: Vec::new(),
            candidate_ir: None,
            validated_spec: None,
            validation_warnings: Vec::new(),
            serialized_json: None,
            generated_code: None,
            retry_count: 0,
            error_history: Vec::new(),
            feedback_messages: Vec::new(),
            confidence_score: 0.0,
            execution_status: ExecutionStatus::Initial,
        }
    }

    fn record_error(&mut self, stage: &str, error_type: ErrorKind, message: String) {
        self.error_history.push(ErrorRecord {
            stage: stage.into(),
            error_type,
            message,
            timestamp: Utc::now(),
        });
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Event {
    ParseDone {
        sections: ParsedSections,
        diagnostics: Vec<ParseDiagnostic>,
    },
    ReasonDone {
        candidate: serde_json::Value,
        confidence: f64,
    },
    /// The model produced non-IR output (malformed JSON). Retryable.
    ReasonFailed {
        message: String,
    },
    ValidateDone {
        spec: WorkflowSpec,
        warnings: Vec<ValidationIssue>,
    },
    /// IR violated invariants. Retryable with feedback.
    ValidateFailed {
        issues: Vec<ValidationIssue>,
    },
    SerializeDone {
        json: String,
    },
    GenerateDone {
        code: String,
    },
    /// Unrecoverable failure (generation, serialization, provider, budget).
    Fatal {
        kind: ErrorKind,
        stage: String,
        message: String,
    },
    Cancelled,
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Apply one event to the state. Total ordering of transitions within a
/// run is guaranteed by the single-threaded controller.
pub fn transition(mut state: PipelineState, event: Event) -> PipelineState {
    match event {
        Event::ParseDone {
            sections,
            diagnostics,
        } => {
            state.parsed_sections = Some(sections);
            state.parse_diagnostics = diagnostics;
            state.execution_status = ExecutionStatus::Reasoning;
        }
        Event::ReasonDone {
            candidate,
            confidence,
        } => {
            state.candidate_ir = Some(candidate);
            state.confidence_score = confidence;
            state.feedback_messages.clear();
            state.execution_status = ExecutionStatus::Validating;
        }
        Event::ReasonFailed { message } => {
            state.confidence_score = 0.0;
            state.record_error("reasoner", ErrorKind::ParsingError, message.clone());
            state.retry_count += 1;
            if state.retry_count >= MAX_RETRIES {
                state.execution_status = ExecutionStatus::Escalated;
            } else {
                state.feedback_messages = vec![message];
                state.execution_status = ExecutionStatus::Reasoning;
            }
        }
        Event::ValidateDone { spec, warnings } => {
            state.validated_spec = Some(spec);
            state.validation_warnings = warnings;
            if state.confidence_score < CONFIDENCE_THRESHOLD {
                state.record_error(
                    "validator",
                    ErrorKind::EscalationRequired,
                    format!(
                        "confidence {:.2} below threshold {CONFIDENCE_THRESHOLD}",
                        state.confidence_score
                    ),
                );
                state.execution_status = ExecutionStatus::Escalated;
            } else {
                state.execution_status = ExecutionStatus::Generating;
            }
        }
        Event::ValidateFailed { issues } => {
            let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
            for message in &messages {
                state.record_error("validator", ErrorKind::ValidationError, message.clone());
            }
            state.retry_count += 1;
            if state.retry_count >= MAX_RETRIES {
                state.execution_status = ExecutionStatus::Escalated;
            } else {
                // Every error message is fed back to the next attempt.
                state.feedback_messages = messages;
                state.execution_status = ExecutionStatus::Reasoning;
            }
        }
        Event::SerializeDone { json } => {
            state.serialized_json = Some(json);
        }
        Event::GenerateDone { code } => {
            state.generated_code = Some(code);
            state.execution_status = ExecutionStatus::Complete;
        }
        Event::Fatal {
            kind,
            stage,
            message,
        } => {
            state.record_error(&stage, kind, message);
            state.execution_status = ExecutionStatus::Failed;
        }
        Event::Cancelled => {
            state.record_error("controller", ErrorKind::ProviderError, "run cancelled".into());
            state.execution_status = ExecutionStatus::Failed;
        }
    }
    state
}

// ---------------------------------------------------------------------------
// Escalation report
// ---------------------------------------------------------------------------

/// Human-readable report handed to the reviewer on escalation.
pub fn escalation_report(state: &PipelineState) -> String {
    let mut lines = vec![
        "=== ESCALATION REQUIRED ===".to_string(),
        format!("Execution ID: {}", state.execution_id),
        format!("Confidence Score: {:.2}", state.confidence_score),
        format!("Retry Count: {}", state.retry_count),
    ];

    if let Some(sections) = &state.parsed_sections {
        lines.push(String::new());
        lines.push("Parsed Sections:".to_string());
        lines.push(format!("  workflow: {}", sections.name.as_deref().unwrap_or("-")));
        lines.push(format!(
            "  description: {}",
            sections.description.as_deref().unwrap_or("-")
        ));
        lines.push(format!("  steps: {}", sections.steps.len()));
    }

    if !state.parse_diagnostics.is_empty() {
        lines.push(String::new());
        lines.push("Parse Diagnostics:".to_string());
        for diag in &state.parse_diagnostics {
            lines.push(format!("  - {diag}"));
        }
    }

    if !state.error_history.is_empty() {
        lines.push(String::new());
        lines.push("Errors:".to_string());
        for record in &state.error_history {
            lines.push(format!("  - [{}] {}", record.stage, record.message));
        }
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
