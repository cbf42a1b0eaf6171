//! Core trait definitions for generative providers and durable stores.
//!
//! `LlmProvider` is implemented by the `taskcoach-providers` crate;
//! `DurableStore` implementations live in [`crate::store`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for generative backends that turn a prompt into raw text.
///
/// The returned text is untrusted; it is only ever consumed through
/// [`crate::extract`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate text from a prompt.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List available models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to generate text from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gemini-2.0-flash").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// JSON schema the response should follow, for backends that support
    /// constrained output.
    #[serde(default)]
    pub schema_hint: Option<serde_json::Value>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from an LLM generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response text.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
}

// ---------------------------------------------------------------------------
// Durable store trait
// ---------------------------------------------------------------------------

/// Key/value persistence for JSON documents.
///
/// `load` returns `Ok(None)` when nothing has been saved under `key` yet.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Default system prompt
// ---------------------------------------------------------------------------

/// Default system prompt for every generation stage.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a study and productivity assistant. Respond ONLY with a single valid JSON object matching the requested schema. Do not wrap it in markdown and do not add explanations.";
