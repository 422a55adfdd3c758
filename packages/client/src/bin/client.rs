//! Terminal room chat client with automatic reconnection.
//!
//! Connects to `{url}/ws/chat/{room}` and shows the room's message list,
//! re-rendering it whenever the server pushes a new snapshot. Dropped
//! connections are retried every few seconds until the client exits.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomchat-client -- --room default-room --username Alice
//! cargo run --bin roomchat-client -- -u ws://127.0.0.1:8000 -r lobby
//! ```

use std::time::Duration;

use clap::Parser;

use roomchat_client::{
    ClientConfig, RoomIdentity, config::DEFAULT_SERVER_URL, config::RECONNECT_INTERVAL_SECS,
    domain::DEFAULT_ROOM_ID, domain::default_username,
};
use roomchat_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "roomchat-client")]
#[command(about = "Realtime room chat client with automatic reconnection", long_about = None)]
struct Args {
    /// Chat server base URL
    #[arg(short = 'u', long, default_value = DEFAULT_SERVER_URL)]
    url: String,

    /// Room to join
    #[arg(short = 'r', long, default_value = DEFAULT_ROOM_ID)]
    room: String,

    /// Display name attached to every message (random `User-<n>` if omitted)
    #[arg(short = 'n', long)]
    username: Option<String>,

    /// Seconds to wait before reconnecting after a dropped connection
    #[arg(long, default_value_t = RECONNECT_INTERVAL_SECS)]
    reconnect_delay_secs: u64,

    /// Give up after this many consecutive failed connection attempts
    #[arg(long)]
    max_reconnect_attempts: Option<u32>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let mut config = match ClientConfig::new(args.url) {
        Ok(config) => config.with_reconnect_delay(Duration::from_secs(args.reconnect_delay_secs)),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };
    if let Some(max_attempts) = args.max_reconnect_attempts {
        config = config.with_max_reconnect_attempts(max_attempts);
    }

    let username = args
        .username
        .unwrap_or_else(|| default_username(uuid::Uuid::new_v4().as_u128()));
    let identity = RoomIdentity::new(args.room, username);

    // Run the client
    if let Err(e) = roomchat_client::run_client(config, identity).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
