//! Generation settings passed to every provider call.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model identifier; each provider supplies its own default.
    pub model: String,
    /// Kept low to favor deterministic IR output.
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-attempt network timeout.
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.1,
            max_tokens: 4096,
            timeout: Duration::from_secs(60),
        }
    }
}

impl GenerationConfig {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}
