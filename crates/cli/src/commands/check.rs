//! `steward check`: one minimal completion against the configured endpoint.

use super::{CliResult, build_provider, load_config};

pub async fn run() -> CliResult {
    let config = load_config()?;
    let provider = build_provider(&config)?;

    println!("Endpoint: {}", config.provider.api_url);
    println!("Model:    {}", config.provider.model);
    if !config.has_api_key() {
        println!("API key:  not set (fine for local servers)");
    }

    match provider.health_check().await {
        Ok(()) => {
            println!("LLM connection OK.");
            Ok(())
        }
        Err(e) => {
            println!("LLM connection failed: {e}");
            Err(e.into())
        }
    }
}
