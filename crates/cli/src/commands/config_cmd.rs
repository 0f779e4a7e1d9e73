//! `shopassist config`: configuration management commands.

use shopassist_config::{AppConfig, ModelProvider};

/// Settings that load fine but will bite at the first turn.
fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match config.resolve_model_provider(None) {
        Ok(provider) => {
            if config.provider_api_key(provider).is_none() {
                warnings.push(format!(
                    "No API key for {provider} (set api_key, [providers.{provider}] or its env var)"
                ));
            }
        }
        Err(e) => warnings.push(format!("model_provider: {e}")),
    }

    if config.search.endpoint.is_some() {
        if config.search.api_key.is_none() {
            warnings.push("Search endpoint set without search.api_key (AZURE_SEARCH_KEY)".into());
        }
        if !config.search.embedding_model.is_empty()
            && config.provider_api_key(ModelProvider::OpenAi).is_none()
        {
            warnings.push("Vector queries need an OpenAI key; searching by keyword only".into());
        }
    }

    warnings
}

pub fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   OK  Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   OK  All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   !!  {w}");
                }
            }

            println!();
            println!(
                "   Provider:  {}",
                config.model_provider.as_deref().unwrap_or("anthropic (default)")
            );
            println!("   Retailer:  {}", config.retailer_name);
            println!(
                "   Search:    {}",
                config.search.endpoint.as_deref().unwrap_or("demo catalog")
            );
            println!("   Max tool iterations: {}", config.max_tool_iterations);
        }
        Err(e) => {
            println!("   ERR Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Print the resolved config. `Debug` redacts every secret.
pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{config:#?}");
    Ok(())
}

pub fn print_default() {
    println!("{}", AppConfig::default_toml());
}

pub fn path() {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
}
