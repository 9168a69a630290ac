//! Steward CLI, the main entry point.
//!
//! Commands:
//! - `serve`     Run the session over stdin/stdout (the default)
//! - `plan-only` Print a plan for one request and exit
//! - `check`     Ping the configured LLM endpoint
//! - `init`      Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "steward", about = "Steward, an LLM coding agent for editor hosts", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the line-delimited JSON protocol on stdin/stdout
    Serve,

    /// Produce a plan for a request without executing it
    #[command(name = "plan-only", alias = "planOnly")]
    PlanOnly {
        /// The request to plan
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Check that the LLM endpoint answers
    Check,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::run().await?,
        Commands::PlanOnly { message } => commands::plan_only::run(message.join(" ")).await?,
        Commands::Check => commands::check::run().await?,
        Commands::Init { force } => commands::init::run(force)?,
    }

    Ok(())
}
