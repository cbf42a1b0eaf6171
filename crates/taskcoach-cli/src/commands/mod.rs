//! Subcommand implementations.

pub mod init;
pub mod list_models;
pub mod mastery;
pub mod process;
pub mod recommend;
pub mod submit;
pub mod verify;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;

use taskcoach_core::mastery::DEFAULT_STORE_KEY;
use taskcoach_core::store::JsonFileStore;
use taskcoach_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo};
use taskcoach_core::{Generator, MasteryTracker, ProcessOutcome};
use taskcoach_providers::config::load_config_from;
use taskcoach_providers::TaskcoachConfig;

use crate::CommonArgs;

/// Config, mastery store and (lazily) a generator for one invocation.
pub struct Context {
    pub config: TaskcoachConfig,
    pub tracker: Arc<MasteryTracker>,
    provider: Option<String>,
}

impl Context {
    pub async fn open(common: CommonArgs) -> Result<Self> {
        let config = load_config_from(common.config.as_deref())?;
        let data_dir = common.data_dir.unwrap_or_else(|| config.data_dir.clone());
        let store = Arc::new(JsonFileStore::new(data_dir));
        let tracker = Arc::new(MasteryTracker::open(store, DEFAULT_STORE_KEY).await);

        Ok(Self {
            config,
            tracker,
            provider: common.provider,
        })
    }

    pub fn generator(&self) -> Result<Generator> {
        let provider = self.config.provider(self.provider.as_deref())?;
        Ok(Generator::new(provider, self.config.generation_settings()))
    }

    /// A generator whose provider problems only show up if it is called.
    ///
    /// For commands that may finish without generating anything; a call
    /// through an unconfigured provider fails and takes the stage's fallback.
    pub fn deferred_generator(&self) -> Generator {
        match self.generator() {
            Ok(generator) => generator,
            Err(e) => Generator::new(
                Arc::new(Unconfigured {
                    reason: format!("{e:#}"),
                }),
                self.config.generation_settings(),
            ),
        }
    }
}

/// Read a session file written by `process --save`.
pub fn read_session(path: &Path) -> Result<ProcessOutcome> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse session: {}", path.display()))
}

/// Provider that fails every call with the reason it could not be built.
struct Unconfigured {
    reason: String,
}

#[async_trait]
impl LlmProvider for Unconfigured {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse> {
        anyhow::bail!("{}", self.reason)
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        Vec::new()
    }
}
