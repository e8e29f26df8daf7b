//! porchlight chat client.
//!
//! Opens one booking's chat, shows notifications and live location pushed
//! to the user, and sends messages typed on stdin. Reconnects on
//! disconnection (max 5 attempts with 1 second interval) and re-joins its
//! rooms each time.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin porchlight-client -- --token <jwt> --user client-1 --booking b1
//! ```

use clap::Parser;

use porchlight_client::{ClientConfig, run_client};
use porchlight_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "porchlight-client")]
#[command(about = "Chat client for the porchlight real-time hub", long_about = None)]
struct Args {
    /// Access token (JWT) issued for the user
    #[arg(short = 't', long, env = "PORCHLIGHT_TOKEN", hide_env_values = true)]
    token: String,

    /// Booking whose chat to open
    #[arg(short = 'b', long)]
    booking: String,

    /// User id the token was issued for
    #[arg(short = 'u', long)]
    user: String,

    /// WebSocket endpoint
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// REST root
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    api: String,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = ClientConfig {
        ws_url: args.url,
        api_url: args.api,
        token: args.token,
        booking_id: args.booking,
        user_id: args.user,
    };

    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
