//! porchlight real-time hub.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin porchlight-server -- --jwt-secret dev-secret
//! cargo run --bin porchlight-server -- --host 0.0.0.0 --port 3000 --room-access open
//! ```

use std::sync::Arc;

use clap::Parser;
use porchlight_server::{
    bootstrap::build_state,
    config::{Args, HubConfig},
    ui::Server,
};
use porchlight_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = HubConfig::from(args);
    let state = build_state(&config, Arc::new(SystemClock));

    let server = Server::new(state);
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
