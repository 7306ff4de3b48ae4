//! ragchat web server.

use anyhow::{Context, Result};
use clap::Parser;
use ragchat_web::{routes, AppState, Config};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ragchat-web")]
#[command(about = "Chat server answering from a local document corpus")]
struct Cli {
    /// Path to ragchat.toml (default: search current and parent directories)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", Config::default_toml()?);
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let addr = config.addr();

    info!(
        model = %config.ollama.model,
        embed_model = %config.ollama.embed_model,
        ollama_url = %config.ollama.url,
        context_dir = %config.rag.context_dir.display(),
        "starting ragchat"
    );

    let state = AppState::from_config(config)?;
    state.initialize().await;

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
