//! ac-compiler: spec text → validated IR → generated agent code.
//!
//! Phase 1: Parser (regex section extraction) → Reasoner (LLM inference)
//! → Validator (schema, scope, safety). Phase 2: Serializer (canonical
//! JSON) → Generator (deterministic agent source emission). The pipeline
//! controller in ac-pipeline drives the phases and owns retries.

pub mod generator;
pub mod parser;
pub mod prompt;
pub mod reasoner;
pub mod repair;
pub mod serializer;
pub mod validator;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("LLM output is not valid JSON: {0}")]
    MalformedResponse(String),
    #[error("provider error: {0}")]
    Provider(#[from] ac_llm::ProviderError),
    #[error("canonical JSON does not round-trip for workflow '{0}'")]
    RoundTrip(String),
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error("code generation failed: {0}")]
    Generate(String),
}
