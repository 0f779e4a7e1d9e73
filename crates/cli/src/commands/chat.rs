//! `shopassist chat`: interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use shopassist_agent::{ShoppingAgent, TurnConfig, TurnOutcome};
use shopassist_config::{AppConfig, ModelProvider};
use shopassist_core::state::AgentState;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Inputs that leave interactive mode.
const EXIT_WORDS: [&str; 3] = ["exit", "quit", "bye"];

fn is_exit(line: &str) -> bool {
    EXIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
}

fn api_key_env(provider: ModelProvider) -> &'static str {
    match provider {
        ModelProvider::Anthropic => "ANTHROPIC_API_KEY",
        ModelProvider::OpenAi => "OPENAI_API_KEY",
    }
}

fn print_replies(outcome: &TurnOutcome) {
    println!();
    for reply in &outcome.replies {
        if reply.content.is_empty() {
            continue;
        }
        for line in reply.content.lines() {
            println!("  Assistant > {line}");
        }
    }
    println!();
}

pub async fn run(
    message: Option<String>,
    provider: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail on a bad provider key or a missing API key before the first turn
    let selected = config.resolve_model_provider(provider.as_deref())?;
    if config.provider_api_key(selected).is_none() {
        eprintln!();
        eprintln!("  ERROR: No API key configured for {selected}!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    {}", api_key_env(selected));
        eprintln!("    SHOPASSIST_API_KEY   (shared by all providers)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err(format!("No API key found for {selected}").into());
    }

    let model = config.provider_model(selected);
    let search = match &config.search.endpoint {
        Some(endpoint) => format!("{} ({endpoint})", config.search.index),
        None => "built-in demo catalog".to_string(),
    };
    let config = Arc::new(config);
    let agent = ShoppingAgent::from_config(config.clone());

    let mut turn = TurnConfig::new();
    if let Some(key) = provider {
        turn = turn.with_model_provider(key);
    }
    let mut state = AgentState::new();

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let outcome = agent.run_turn(&state, &msg, &turn).await;
        eprint!("\r              \r");
        let outcome = outcome?;
        println!("{}", outcome.reply());
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        shopassist: Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Retailer:  {}", config.retailer_name);
    println!("  Provider:  {selected}");
    println!("  Model:     {model}");
    println!("  Search:    {search}");
    println!();
    println!("  Tell me what you are shopping for and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if is_exit(line) {
            break;
        }
        if line.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        eprint!("  ...");
        match agent.run_turn(&state, line, &turn).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                print_replies(&outcome);
                state = outcome.state;
            }
            Err(e) => {
                // The failed turn left `state` untouched, so the shopper can retry
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
