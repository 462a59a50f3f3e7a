mod config;

use clap::{Parser, Subcommand};
use config::MindfulConfig;
use mindful_agent::ChatRunner;
use mindful_gateway::{GatewayConfig, GatewayServer, PRESET_PROMPTS};
use mindful_session::SessionRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mindful", about = "Mindful: a supportive wellness chat companion")]
struct Cli {
    /// Path to config file [default: mindful.toml, optional]
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the preset conversation starters
    Prompts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A local .env may carry the provider key.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let mut config = MindfulConfig::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            config.model.resolve_api_key();
            match config.model.credential() {
                Ok(_) => info!(
                    provider = ?config.model.provider,
                    model = %config.model.model_id,
                    "Completion provider configured"
                ),
                // The page still serves and shows the blocking message.
                Err(e) => error!(error = %e, "Completion provider unavailable"),
            }

            let runner = Arc::new(ChatRunner::new(config.model));
            let sessions = Arc::new(SessionRegistry::new());
            let max_idle = Duration::from_secs(config.server.session_idle_secs);
            GatewayServer::spawn_session_reaper(sessions.clone(), max_idle);

            let app = GatewayServer::build_with_config(
                runner,
                sessions,
                GatewayConfig {
                    max_message_length: config.server.max_message_length,
                },
            );

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Mindful listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Prompts => {
            println!("Conversation starters:");
            for (index, prompt) in PRESET_PROMPTS.iter().enumerate() {
                println!("  [{index}] {prompt}");
            }
        }
    }

    Ok(())
}
