//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use taskcoach_core::generation::GenerationSettings;
use taskcoach_core::traits::LlmProvider;

use crate::error::ProviderError;
use crate::gemini::GeminiProvider;
use crate::ollama::OllamaProvider;

/// Name under which environment-supplied Gemini keys are registered.
pub const GEMINI: &str = "gemini";

/// Configuration for a single generative provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Top-level taskcoach configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskcoachConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default provider to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Default model to use.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Default temperature (0.0 keeps structured output stable).
    #[serde(default)]
    pub default_temperature: f64,
    /// Max tokens per generation call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on a single generation call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Directory holding the mastery store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_provider() -> String {
    GEMINI.to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./taskcoach-data")
}

impl Default for TaskcoachConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: 0.0,
            max_tokens: default_max_tokens(),
            generation_timeout_secs: default_timeout_secs(),
            data_dir: default_data_dir(),
        }
    }
}

impl TaskcoachConfig {
    /// Model parameters for the pipeline's generation calls.
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.default_model.clone(),
            temperature: self.default_temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.generation_timeout_secs),
            system_prompt: None,
        }
    }

    /// Build the named provider, or the default one.
    pub fn provider(&self, name: Option<&str>) -> Result<Arc<dyn LlmProvider>> {
        let name = name.unwrap_or(self.default_provider.as_str());
        let provider_config = self.providers.get(name).with_context(|| {
            format!(
                "provider '{name}' is not configured. Set GOOGLE_API_KEY or run `taskcoach init`"
            )
        })?;
        Ok(Arc::from(create_provider(name, provider_config)?))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
    }
}

/// Install `key` as the Gemini API key, registering the provider if needed.
fn apply_gemini_key(config: &mut TaskcoachConfig, key: String) {
    let entry = config
        .providers
        .entry(GEMINI.into())
        .or_insert(ProviderConfig::Gemini {
            api_key: String::new(),
            base_url: None,
        });
    if let ProviderConfig::Gemini { api_key, .. } = entry {
        *api_key = key;
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `taskcoach.toml` in the current directory
/// 2. `~/.config/taskcoach/config.toml`
///
/// Environment variable overrides: `TASKCOACH_GEMINI_KEY`, then `GOOGLE_API_KEY`.
pub fn load_config() -> Result<TaskcoachConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<TaskcoachConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("taskcoach.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<TaskcoachConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => TaskcoachConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) =
        std::env::var("TASKCOACH_GEMINI_KEY").or_else(|_| std::env::var("GOOGLE_API_KEY"))
    {
        apply_gemini_key(&mut config, key);
    }

    // Resolve env vars in all provider configs
    let resolved: HashMap<String, ProviderConfig> = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.providers = resolved;

    tracing::debug!(
        path = ?config_path,
        providers = config.providers.len(),
        "configuration loaded"
    );
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("taskcoach"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => {
            if api_key.trim().is_empty() {
                return Err(ProviderError::Misconfigured(format!(
                    "provider '{name}' has no API key"
                ))
                .into());
            }
            Ok(Box::new(GeminiProvider::new(api_key, base_url.clone())))
        }
        ProviderConfig::Ollama { base_url } => Ok(Box::new(OllamaProvider::new(base_url))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_TASKCOACH_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_TASKCOACH_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_TASKCOACH_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_TASKCOACH_UNSET_VAR}"), "");
        std::env::remove_var("_TASKCOACH_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = TaskcoachConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.default_model, "gemini-2.0-flash");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.data_dir, PathBuf::from("./taskcoach-data"));

        let settings = config.generation_settings();
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.temperature, 0.0);
    }

    #[test]
    fn parse_provider_config() {
        let toml_str = r#"
default_provider = "ollama"
default_model = "llama3.1:8b"
generation_timeout_secs = 120

[providers.gemini]
type = "gemini"
api_key = "test-key"

[providers.ollama]
type = "ollama"
"#;
        let config: TaskcoachConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.generation_settings().timeout, Duration::from_secs(120));
        assert!(matches!(
            config.providers.get("ollama"),
            Some(ProviderConfig::Ollama { base_url }) if base_url == "http://localhost:11434"
        ));
    }

    #[test]
    fn debug_masks_api_key() {
        let config = ProviderConfig::Gemini {
            api_key: "super-secret".into(),
            base_url: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn gemini_key_override_registers_provider() {
        let mut config = TaskcoachConfig::default();
        apply_gemini_key(&mut config, "from-env".into());
        assert!(matches!(
            config.providers.get(GEMINI),
            Some(ProviderConfig::Gemini { api_key, .. }) if api_key == "from-env"
        ));
    }

    #[test]
    fn load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_provider = \"ollama\"\ndata_dir = \"/tmp/coach\"\n\n\
             [providers.ollama]\ntype = \"ollama\"\nbase_url = \"http://127.0.0.1:9\""
        )
        .unwrap();

        let config = load_config_from(Some(file.path())).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/coach"));
        let provider = config.provider(None).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/taskcoach.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn empty_gemini_key_is_rejected() {
        let config = ProviderConfig::Gemini {
            api_key: "  ".into(),
            base_url: None,
        };
        let err = create_provider(GEMINI, &config).err().unwrap();
        assert!(err.to_string().contains("no API key"));
    }

    #[test]
    fn unconfigured_provider_is_reported() {
        let config = TaskcoachConfig::default();
        let err = config.provider(Some("ollama")).err().unwrap();
        assert!(err.to_string().contains("'ollama' is not configured"));
    }
}
