//! appointment-agent CLI entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appointment_agent::cli::{expand_path, init_config, load_config, redacted, Overrides, DEFAULT_CONFIG_PATH};
use appointment_agent::Gateway;

/// Conversational appointment-booking assistant.
#[derive(Parser)]
#[command(name = "appointment-agent")]
#[command(about = "Check availability and book appointments by chatting.")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Calendar to read and write
    #[arg(long, env = "CALENDAR_ID", global = true)]
    calendar_id: Option<String>,

    /// Google OAuth access token
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to
        #[arg(long, env = "APPOINTMENT_AGENT_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "APPOINTMENT_AGENT_PORT")]
        port: Option<u16>,
    },

    /// Print free slots for a date (YYYY-MM-DD, today or tomorrow)
    Availability {
        date: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current config
    Show,

    /// Validate config
    Validate,

    /// Write a default config file
    Init {
        /// Where to write it (defaults to --config)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over the configured level
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        load_config(&cli.config, &Overrides::default())
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut overrides = Overrides {
        api_key: cli.api_key.clone(),
        calendar_id: cli.calendar_id.clone(),
        access_token: cli.access_token.clone(),
        ..Default::default()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            overrides.host = host;
            overrides.port = port;
            let config = load_config(&cli.config, &overrides)
                .with_context(|| format!("loading {}", cli.config.display()))?;

            let gateway = Gateway::from_config(config).context("building gateway")?;
            tracing::info!(
                "{} {} serving on {}",
                appointment_agent::NAME,
                appointment_agent::VERSION,
                gateway.config().server_addr()
            );
            gateway.run().await?;
        }

        Commands::Availability { date } => {
            let config = load_config(&cli.config, &overrides)
                .with_context(|| format!("loading {}", cli.config.display()))?;
            let gateway = Gateway::from_config(config).context("building gateway")?;
            println!("{}", gateway.availability(&date).await);
        }

        Commands::Config { action } => match action {
            ConfigCommands::Show => {
                let config = load_config(&cli.config, &overrides)?;
                println!("Config path: {}", expand_path(&cli.config).display());
                println!("{}", redacted(&config)?);
            }
            ConfigCommands::Validate => {
                let config = load_config(&cli.config, &overrides)?;
                match config.validate() {
                    Ok(()) => println!("✓ Configuration is valid"),
                    Err(e) => {
                        println!("✗ {}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigCommands::Init { path } => {
                let path = path.unwrap_or_else(|| cli.config.clone());
                let written = init_config(&path)?;
                println!("Wrote default config to {}", written.display());
                println!();
                println!("Next steps:");
                println!("  1. Set model.api_key (or GEMINI_API_KEY)");
                println!("  2. Set calendar.access_token (or GOOGLE_ACCESS_TOKEN)");
                println!("  3. Run: appointment-agent serve");
            }
        },
    }

    Ok(())
}
