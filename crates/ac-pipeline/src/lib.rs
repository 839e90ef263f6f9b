//! ac-pipeline: the compile entry point consumed by CLI, HTTP, and chat
//! collaborators.
//!
//! `compile()` resolves the provider from configuration (failing before
//! the run starts), drives the pipeline graph, and shapes the outcome
//! into a `CompileResult` with the user-visible error taxonomy.

pub mod checkpoint;
pub mod controller;
pub mod state;

pub use checkpoint::{CheckpointError, CheckpointSink, FileSink, MemorySink};
pub use controller::{Controller, PipelineRun};
pub use state::{ErrorKind, ExecutionStatus, PipelineState};

use ac_compiler::prompt;
use ac_compiler::validator::ValidationIssue;
use ac_llm::LlmProvider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CompileOptions {
    /// Provider selector: `claude`, `aimlapi`, or `gemini`.
    pub provider: String,
    pub model_version: Option<String>,
    pub prompt_version: String,
    /// Defaults to an in-memory sink when unset.
    pub checkpoint: Option<Arc<dyn CheckpointSink>>,
    /// Whole-pipeline wall-clock budget.
    pub total_budget: Duration,
    /// Flips to true to cancel the run between nodes (in-flight LLM calls
    /// are aborted best-effort).
    pub cancel: Option<watch::Receiver<bool>>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            provider: "claude".into(),
            model_version: None,
            prompt_version: prompt::LATEST_VERSION.into(),
            checkpoint: None,
            total_budget: Duration::from_secs(120),
            cancel: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CompileResult {
    pub status: ExecutionStatus,
    pub workflow_name: Option<String>,
    pub generated_code: Option<String>,
    pub serialized_ir: Option<String>,
    pub metadata: CompileMetadata,
    pub errors: Vec<ErrorEnvelope>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompileMetadata {
    pub execution_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub prompt_version: String,
    pub retry_count: u32,
    pub code_size: Option<usize>,
    pub code_sha256: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub validation_warnings: Vec<ValidationIssue>,
}

/// One entry of the error envelope handed to external collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub error_type: ErrorKind,
    pub details: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Compile a raw workflow spec into a generated agent.
///
/// Configuration problems (unknown provider, missing API key) fail here,
/// before any pipeline state exists. Every other outcome, including
/// escalation and failure, is reported inside the `CompileResult`.
pub async fn compile(
    raw_spec: &str,
    options: CompileOptions,
) -> Result<CompileResult, PipelineError> {
    let provider = ac_llm::create_provider(&options.provider, options.model_version.as_deref())
        .map_err(|e| PipelineError::Configuration(e.to_string()))?;
    Ok(compile_with_provider(raw_spec, provider, options).await)
}

/// Compile with an explicit provider instance. This is the seam the tests
/// (and embedded callers with custom transports) use.
pub async fn compile_with_provider(
    raw_spec: &str,
    provider: Arc<dyn LlmProvider>,
    options: CompileOptions,
) -> CompileResult {
    let model = provider.model_name();
    let checkpoint = options
        .checkpoint
        .unwrap_or_else(|| Arc::new(MemorySink::new()));
    let controller = Controller::new(
        provider,
        options.prompt_version.clone(),
        checkpoint,
        options.total_budget,
        options.cancel,
    );

    let run = controller.run(raw_spec).await;
    build_result(run, model, options.prompt_version)
}

fn build_result(run: PipelineRun, model: String, prompt_version: String) -> CompileResult {
    let PipelineRun { state, artifact } = run;

    let mut errors: Vec<ErrorEnvelope> = state
        .error_history
        .iter()
        .map(|record| ErrorEnvelope {
            error: record.message.clone(),
            error_type: record.error_type,
            details: serde_json::json!({
                "stage": record.stage,
                "timestamp": record.timestamp,
            }),
        })
        .collect();

    if state.execution_status == ExecutionStatus::Escalated {
        // The reviewer gets the partial IR and the full report.
        errors.push(ErrorEnvelope {
            error: "run requires human review".into(),
            error_type: ErrorKind::EscalationRequired,
            details: serde_json::json!({
                "report": state::escalation_report(&state),
                "candidate_ir": state.candidate_ir,
                "retry_count": state.retry_count,
            }),
        });
    }

    CompileResult {
        status: state.execution_status,
        workflow_name: state.validated_spec.as_ref().map(|s| s.name.clone()),
        generated_code: state.generated_code.clone(),
        serialized_ir: state.serialized_json.clone(),
        confidence: state.confidence_score,
        metadata: CompileMetadata {
            execution_id: state.execution_id,
            timestamp: state.timestamp,
            model,
            prompt_version,
            retry_count: state.retry_count,
            code_size: artifact.as_ref().map(|a| a.code_size),
            code_sha256: artifact.as_ref().map(|a| a.sha256.clone()),
            generated_at: artifact.as_ref().map(|a| a.generated_at),
            validation_warnings: state.validation_warnings.clone(),
        },
        errors,
    }
}
