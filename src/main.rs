use anyhow::Context;
use bluesky_bridge::config::Config;
use bluesky_bridge::store::{FileStore, LoginStore};
use bluesky_bridge::types::events::RemoteEvent;
use bluesky_bridge::types::state::BridgeState;
use bluesky_bridge::{BlueskyClient, BlueskyConnector};
use bluesky_bridge_ureq_http_client::UreqHttpClient;
use chrono::Local;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

// Mirrors Bluesky chats into the log.
//
// Usage:
//   BSKY_PASSWORD=... cargo run -- login --domain bsky.social --identifier alice.bsky.social
//   cargo run -- run                                # resume every stored login
//   cargo run -- --store ./state --config bridge.json run

#[derive(Parser)]
#[command(name = "bluesky-bridge")]
#[command(about = "Bluesky chat bridge session and sync engine")]
struct Cli {
    /// JSON config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "./bluesky_store")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a password read from BSKY_PASSWORD, then keep syncing.
    Login {
        #[arg(long, default_value = "bsky.social")]
        domain: String,
        #[arg(long)]
        identifier: String,
    },
    /// Connect every stored login.
    Run,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_slice(&data).context("failed to parse config")
        }
        None => Ok(Config::default()),
    }
}

fn log_event(event: RemoteEvent) {
    match &event {
        RemoteEvent::ChatResync(resync) => info!(
            target: "Bridge/Events",
            "Chat resync {} ({} members, latest message {:?})",
            resync.meta.portal_key.id,
            resync.chat_info.members.total_member_count,
            resync.latest_message_ts
        ),
        RemoteEvent::Message(msg) => {
            let body = msg
                .data
                .parts
                .iter()
                .map(|part| part.content.body.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let sender = msg
                .meta
                .sender
                .as_ref()
                .map(|s| s.sender.to_string())
                .unwrap_or_default();
            info!(target: "Bridge/Events", "[{}] {}: {}", msg.meta.portal_key.id, sender, body);
        }
    }
}

fn log_state(state: BridgeState) {
    match &state.error {
        Some(error) => warn!(target: "Bridge/State", "{:?} ({error})", state.state_event),
        None => info!(target: "Bridge/State", "{:?}", state.state_event),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    rt.block_on(async move {
        let store: Arc<dyn LoginStore> = Arc::new(
            FileStore::new(&cli.store)
                .await
                .with_context(|| format!("failed to open store {}", cli.store.display()))?,
        );
        let connector = BlueskyConnector::new(config, Arc::new(UreqHttpClient::new()))?;
        let events = Arc::new(log_event);
        let states = Arc::new(log_state);

        let clients: Vec<Arc<BlueskyClient>> = match cli.command {
            Commands::Login { domain, identifier } => {
                let password = std::env::var("BSKY_PASSWORD")
                    .context("BSKY_PASSWORD must be set to log in")?;
                let complete = connector
                    .create_login(store.clone(), events.clone(), states.clone())
                    .submit(&domain, &identifier, &password)
                    .await?;
                info!("{}", complete.instructions);
                vec![complete.client]
            }
            Commands::Run => {
                let logins = store.list().await?;
                if logins.is_empty() {
                    warn!("No stored logins in {}", cli.store.display());
                }
                let mut clients = Vec::with_capacity(logins.len());
                for login in logins {
                    info!("Connecting {} ({})", login.remote_name, login.id);
                    let client = connector.load_user_login(
                        login,
                        store.clone(),
                        events.clone(),
                        states.clone(),
                    );
                    client.connect().await;
                    clients.push(client);
                }
                clients
            }
        };

        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        for client in &clients {
            client.disconnect().await;
        }
        Ok(())
    })
}
