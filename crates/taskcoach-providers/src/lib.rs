//! taskcoach-providers: generative model integrations.
//!
//! Implements the `LlmProvider` trait for Google Gemini and Ollama, plus a
//! scripted mock for tests, and the configuration layer that builds them.

pub mod config;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod ollama;

pub use config::{create_provider, load_config, ProviderConfig, TaskcoachConfig};
pub use error::ProviderError;
