//! studentdesk CLI, the main entry point.
//!
//! Commands:
//! - `serve`      Start the HTTP API server
//! - `ask`        One question, or an interactive session
//! - `config`     Print the default or the loaded configuration
//! - `analytics`  Summarize conversation logs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "studentdesk",
    about = "studentdesk: answers student questions from FAQs, documents and course data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.studentdesk/config.toml)
    #[arg(short, long, global = true, env = "STUDENTDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a question
    Ask {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Conversation to continue
        #[arg(short, long, default_value = "cli")]
        session: String,
    },

    /// Print configuration
    Config {
        /// Show the loaded configuration instead of the defaults
        #[arg(long)]
        show: bool,
    },

    /// Summarize logged conversations
    Analytics {
        /// Look-back window in days
        #[arg(short, long, default_value_t = 7)]
        days: u32,

        /// Also write every session log plus 30-day analytics to this file
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Ask { message, session } => commands::ask::run(config_path, message, &session).await?,
        Commands::Config { show } => commands::config_cmd::run(config_path, show)?,
        Commands::Analytics { days, export } => commands::analytics::run(config_path, days, export.as_deref())?,
    }

    Ok(())
}
