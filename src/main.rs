use anyhow::Result;
use clap::{arg, command, Parser};
use eos_account_explorer::application::app::App;
use eos_account_explorer::config::load_config;
use eos_account_explorer::service;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "EOS account explorer backend with REST API"
)]
struct ExplorerProgram {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chain RPC endpoint, overrides the configuration file
    #[arg(short, long)]
    rpc_endpoint: Option<String>,

    /// Account index endpoint, overrides the configuration file
    #[arg(short, long)]
    index_endpoint: Option<String>,

    /// Listen port REST API, overrides the configuration file
    #[arg(short, long)]
    listen_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = ExplorerProgram::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(rpc_endpoint) = args.rpc_endpoint {
        config.services.chain_rpc_url = rpc_endpoint;
    }
    if let Some(index_endpoint) = args.index_endpoint {
        config.services.account_index_url = index_endpoint;
    }
    if let Some(listen_port) = args.listen_port {
        config.listen_port = listen_port;
    }
    tracing::info!("Using chain RPC at {}", config.services.chain_rpc_url);

    // Create a shutdown channel
    let (shutdown_sender, _) = broadcast::channel(1);

    let app = Arc::new(App::from_config(&config));
    let mut server_handle = tokio::spawn(service::api::start_server(
        shutdown_sender.clone(),
        app,
        config.listen_port,
    ));

    let server_result = tokio::select! {
        signal_result = signal::ctrl_c() => {
            signal_result?;
            tracing::warn!("Received Ctrl+C, shutting down...");
            // The server may already be gone, in which case nobody is listening.
            let _ = shutdown_sender.send(());
            (&mut server_handle).await?
        }
        joined = &mut server_handle => joined?,
    };

    if let Err(e) = server_result {
        tracing::error!("API server error: {:?}", e);
        return Err(e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
