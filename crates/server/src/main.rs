use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod config;
mod email;
mod services;

#[cfg(test)]
mod test_support;

use config::{AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "selfservice")]
#[command(about = "Self-service stage configuration and demo resource server", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "selfservice.toml")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Mail server password, overrides `emailserver.password`
    #[arg(long, env = "EMAILSERVER_PASSWORD", hide_env_values = true)]
    email_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "selfservice=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::info!("Starting self-service server");
    tracing::info!("Configuration file: {}", args.config.display());

    // Load configuration
    let mut config = ServerConfig::load(&args.config)?;
    if let Some(password) = args.email_password {
        config.emailserver.password = Some(password);
    }
    tracing::debug!("Mail server: {:?}", config.emailserver);

    let state = AppState::new(&config).await?;

    // Start API server
    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting API server on {}", addr);

    api::serve(&addr, state).await?;

    Ok(())
}
