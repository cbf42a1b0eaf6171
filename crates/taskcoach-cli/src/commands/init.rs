//! The `taskcoach init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("taskcoach.toml").exists() {
        println!("taskcoach.toml already exists, skipping.");
    } else {
        std::fs::write("taskcoach.toml", SAMPLE_CONFIG)?;
        println!("Created taskcoach.toml");
    }

    println!("\nNext steps:");
    println!("  1. Export GOOGLE_API_KEY, or point default_provider at a local Ollama");
    println!("  2. Run: taskcoach process --title \"Loops\" --category CS --save session.json");
    println!("  3. Run: taskcoach submit --session session.json --answers 0,1,2,3,0");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# taskcoach configuration

default_provider = "gemini"
default_model = "gemini-2.0-flash"
default_temperature = 0.0
max_tokens = 2048
generation_timeout_secs = 60
data_dir = "./taskcoach-data"

[providers.gemini]
type = "gemini"
api_key = "${GOOGLE_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
"#;
