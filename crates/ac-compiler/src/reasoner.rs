//! Reasoner — LLM inference of the candidate IR from parsed sections.
//!
//! Owns the network retry loop (transport failures only); validation
//! retries are the pipeline controller's job and arrive here as feedback
//! strings appended to the user prompt.

use crate::parser::{ParseDiagnostic, ParsedSections};
use crate::prompt;
use crate::repair::repair_json;
use crate::CompilerError;
use ac_llm::{GenerationConfig, LlmProvider, NetworkRetryPolicy};
use std::sync::Arc;

/// Candidate IR plus the Reasoner's self-assessment.
#[derive(Debug, Clone)]
pub struct ReasonerOutput {
    /// Pre-validation candidate; the Validator decides whether it is an IR.
    pub candidate: serde_json::Value,
    /// Confidence in [0, 1]; values below the escalation threshold are the
    /// controller's signal to hand off for human review.
    pub confidence: f64,
    pub trace: Vec<String>,
}

pub struct Reasoner {
    provider: Arc<dyn LlmProvider>,
    config: GenerationConfig,
    retry_policy: NetworkRetryPolicy,
    prompt_version: String,
}

impl Reasoner {
    pub fn new(provider: Arc<dyn LlmProvider>, prompt_version: &str) -> Self {
        Self {
            provider,
            config: GenerationConfig::default(),
            retry_policy: NetworkRetryPolicy::default(),
            prompt_version: prompt_version.to_string(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// One inference attempt. `retry_count` is the pipeline retry counter
    /// (for the confidence penalty), not the network retry counter.
    pub async fn infer(
        &self,
        sections: &ParsedSections,
        feedback: &[String],
        retry_count: u32,
        diagnostics: &[ParseDiagnostic],
    ) -> Result<ReasonerOutput, CompilerError> {
        let (prompt_version, system_prompt) = prompt::system_prompt(&self.prompt_version);
        let user_prompt = build_user_prompt(sections, feedback);

        let response = self.complete_with_retries(system_prompt, &user_prompt).await?;

        let repaired = repair_json(&response);
        let candidate: serde_json::Value = serde_json::from_str(&repaired).map_err(|e| {
            tracing::warn!(error = %e, "reasoner produced malformed JSON");
            CompilerError::MalformedResponse(format!(
                "{e}; response head: {}",
                truncate(&repaired, 200)
            ))
        })?;

        let confidence = score_confidence(retry_count, diagnostics.len());
        tracing::info!(
            model = %self.provider.model_name(),
            confidence,
            "reasoner inference complete"
        );

        Ok(ReasonerOutput {
            candidate,
            confidence,
            trace: vec![format!(
                "inferred candidate via {} (prompt {prompt_version}, attempt {})",
                self.provider.model_name(),
                retry_count + 1
            )],
        })
    }

    async fn complete_with_retries(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompilerError> {
        let mut attempt = 0u32;
        loop {
            match self
                .provider
                .complete(system_prompt, user_prompt, &self.config)
                .await
            {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && self.retry_policy.allows(attempt) => {
                    let delay = self.retry_policy.delay_for(attempt, &e);
                    tracing::warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "transport failure, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Confidence policy: start at 1.0, subtract 0.1 per prior pipeline retry
/// and 0.1 per parse diagnostic (capped at 0.3).
pub fn score_confidence(retry_count: u32, diagnostic_count: usize) -> f64 {
    let retry_penalty = 0.1 * f64::from(retry_count);
    let parse_penalty = (0.1 * diagnostic_count as f64).min(0.3);
    (1.0 - retry_penalty - parse_penalty).clamp(0.0, 1.0)
}

fn build_user_prompt(sections: &ParsedSections, feedback: &[String]) -> String {
    let mut parts = vec![
        "Convert this workflow specification to JSON:".to_string(),
        String::new(),
        format!("Workflow: {}", sections.name.as_deref().unwrap_or("N/A")),
        format!(
            "Description: {}",
            sections.description.as_deref().unwrap_or("N/A")
        ),
        String::new(),
        "Inputs:".to_string(),
    ];
    for input in &sections.inputs {
        parts.push(format!("  - {input}"));
    }
    parts.push(String::new());
    parts.push("Steps:".to_string());
    for (i, step) in sections.steps.iter().enumerate() {
        parts.push(format!("  {}. {step}", i + 1));
    }
    parts.push(String::new());
    parts.push("Outputs:".to_string());
    for output in &sections.outputs {
        parts.push(format!("  - {output}"));
    }

    if !feedback.is_empty() {
        parts.push(String::new());
        parts.push("Previous attempt had these issues:".to_string());
        for msg in feedback {
            parts.push(format!("  - {msg}"));
        }
    }

    parts.join("\n")
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
