mod common;
mod config;
mod network;
mod ui;

use clap::Parser;
use dotenvy::dotenv;
use network::{ApiClient, ChatClient};
use tokio::sync::mpsc;
use ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "rust_dm_chat",
    version,
    about = "Desktop client for one-to-one chat over HTTP and WebSocket"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Backend base URL, e.g. http://localhost:8082 (overrides config and env)
    #[arg(long, value_name = "URL")]
    server: Option<String>,
    /// Socket base URL, e.g. ws://localhost:8082 (derived from the server URL by default)
    #[arg(long, value_name = "URL")]
    socket: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config)
        .with_env_overrides()
        .with_overrides(cli.server, cli.socket);
    let endpoints = app_config.endpoints()?;
    log::info!("Using backend {}", app_config.server_url);

    run_client(ApiClient::new(endpoints)).await?;
    Ok(())
}

async fn run_client(api: ApiClient) -> Result<(), eframe::Error> {
    // UI -> Network
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Network -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    tokio::spawn(async move {
        let client = ChatClient::new(api, event_tx, cmd_rx);
        if let Err(err) = client.run().await {
            log::error!("Network client terminated: {err}");
        }
    });

    // The UI owns the main thread.
    let options = eframe::NativeOptions::default();
    let mut event_rx = Some(event_rx);

    eframe::run_native(
        "Rust DM Chat",
        options,
        Box::new(move |cc| {
            let event_receiver = event_rx
                .take()
                .expect("ChatApp should only be initialized once");

            log::info!("Chat client started");

            Ok(Box::new(ChatApp::new(cc, cmd_tx.clone(), event_receiver)))
        }),
    )
}
