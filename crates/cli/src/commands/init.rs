//! `steward init`: write the default configuration file.

use steward_config::AppConfig;

use super::CliResult;

pub fn run(force: bool) -> CliResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() && !force {
        println!("Config already exists: {}", config_path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote {}", config_path.display());
    println!();
    println!("Environment overrides: OPENAI_API_URL, OPENAI_MODEL, STEWARD_API_KEY / OPENAI_API_KEY,");
    println!("LLM_CHAIN_LIMIT, LLM_TOOL_ITERATIONS, LLM_AGENT_STEP_RETRIES, LLM_DEBUG_METRICS.");
    Ok(())
}
