//! The `taskcoach list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use taskcoach_providers::config::{load_config_from, ProviderConfig};
use taskcoach_providers::create_provider;
use taskcoach_providers::ollama::OllamaProvider;

pub async fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();

    let mut found_any = false;

    for name in names {
        if let Some(filter) = &provider_filter {
            if name != filter {
                continue;
            }
        }

        let provider_config = &config.providers[name];
        let listed = match provider_config {
            ProviderConfig::Ollama { base_url } => {
                OllamaProvider::new(base_url).list_models_async().await
            }
            _ => create_provider(name, provider_config).map(|p| p.available_models()),
        };
        let models = match listed {
            Ok(models) => models,
            Err(e) => {
                eprintln!("Provider {name}: {e:#}");
                continue;
            }
        };

        if !models.is_empty() {
            found_any = true;
            println!("Provider: {name}");
            for model in &models {
                if model.max_context > 0 {
                    println!(
                        "  {} - {} ({}K context)",
                        model.id,
                        model.name,
                        model.max_context / 1000
                    );
                } else {
                    println!("  {} - {}", model.id, model.name);
                }
            }
            println!();
        }
    }

    if !found_any {
        println!("No providers configured. Run `taskcoach init` to create a config file.");
    }

    Ok(())
}
