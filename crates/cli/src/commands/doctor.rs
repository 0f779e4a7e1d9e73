//! `shopassist doctor`: diagnose provider and search setup.

use shopassist_config::{AppConfig, ModelProvider};
use shopassist_providers::build_provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("shopassist doctor: system diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  OK  Config file found at {}", config_path.display());
    } else {
        println!("  --  No config file, using defaults and environment");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  OK  Configuration valid");
            config
        }
        Err(e) => {
            println!("  ERR Configuration invalid: {e}");
            println!("\n  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    match config.resolve_model_provider(None) {
        Ok(provider) => println!("  OK  Default provider: {provider}"),
        Err(e) => {
            println!("  ERR {e}");
            issues += 1;
        }
    }

    for provider in [ModelProvider::Anthropic, ModelProvider::OpenAi] {
        if config.provider_api_key(provider).is_none() {
            println!("  --  {provider}: no API key");
            continue;
        }
        let model = config.provider_model(provider);
        match build_provider(&config, provider) {
            Ok(client) => match client.health_check().await {
                Ok(true) => println!("  OK  {provider}: reachable ({model})"),
                Ok(false) => {
                    println!("  !!  {provider}: responded but reported unhealthy");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ERR {provider}: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ERR {provider}: {e}");
                issues += 1;
            }
        }
    }

    match &config.search.endpoint {
        Some(endpoint) => {
            println!("  OK  Search index: {} at {endpoint}", config.search.index);
            if config.search.api_key.is_none() {
                println!("  !!  No search API key (set AZURE_SEARCH_KEY)");
                issues += 1;
            }
        }
        None => println!("  --  Search: built-in demo catalog"),
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
