//! Single best-effort generation calls shared by every producing stage.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::GenerationError;
use crate::extract::extract;
use crate::traits::{GenerateRequest, LlmProvider, DEFAULT_SYSTEM_PROMPT};

/// Model parameters applied to every generation call.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens per response.
    pub max_tokens: u32,
    /// Upper bound on a single provider call.
    pub timeout: Duration,
    /// Optional system prompt override.
    pub system_prompt: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.0,
            max_tokens: 2048,
            timeout: Duration::from_secs(60),
            system_prompt: None,
        }
    }
}

/// A provider plus the settings to call it with.
///
/// Issues exactly one call per request; there are no retries.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl Generator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Call the provider once and return its raw text.
    ///
    /// A timeout is reported like any other failure.
    pub async fn generate_text(
        &self,
        stage: &'static str,
        prompt: String,
        schema_hint: Option<serde_json::Value>,
    ) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: self.settings.model.clone(),
            prompt,
            system_prompt: Some(
                self.settings
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            schema_hint,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let response = tokio::time::timeout(self.settings.timeout, self.provider.generate(&request))
            .await
            .map_err(|_| GenerationError::Timeout(self.settings.timeout.as_secs()))?
            .map_err(GenerationError::Provider)?;

        tracing::debug!(
            stage,
            provider = self.provider.name(),
            model = %response.model,
            latency_ms = response.latency_ms,
            total_tokens = response.token_usage.total_tokens,
            "generation complete"
        );

        Ok(response.content)
    }

    /// Call the provider once and extract a `T` from the response.
    pub async fn generate_record<T: DeserializeOwned>(
        &self,
        stage: &'static str,
        prompt: String,
        schema_hint: serde_json::Value,
        required_keys: &[&str],
    ) -> Result<T, GenerationError> {
        let raw = self.generate_text(stage, prompt, Some(schema_hint)).await?;
        Ok(extract(&raw, required_keys)?)
    }
}
