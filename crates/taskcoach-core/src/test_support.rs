//! Scripted provider used by the core's unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage};

/// Replies chosen by prompt substring, falling back to a default.
pub(crate) struct ScriptedProvider {
    routes: Vec<(String, Result<String, String>)>,
    default: Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn fixed(text: &str) -> Self {
        Self {
            routes: Vec::new(),
            default: Ok(text.to_string()),
            delay: None,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            default: Err(message.to_string()),
            ..Self::fixed("")
        }
    }

    /// Reply with `text` when the prompt contains `needle`.
    pub(crate) fn on(mut self, needle: &str, text: &str) -> Self {
        self.routes.push((needle.to_string(), Ok(text.to_string())));
        self
    }

    /// Fail when the prompt contains `needle`.
    pub(crate) fn fail_on(mut self, needle: &str) -> Self {
        self.routes
            .push((needle.to_string(), Err(format!("scripted failure for '{needle}'"))));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .routes
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone());

        let content = reply.map_err(|e| anyhow::anyhow!(e))?;
        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage::default(),
            latency_ms: 0,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![]
    }
}
