//! Server configuration.
//!
//! Every flag can also be given through a `PORCHLIGHT_*` environment
//! variable; a `.env` file is loaded by the binary before parsing.

use clap::Parser;

use crate::{
    domain::dedup::{DEFAULT_DEDUP_CAPACITY, DEFAULT_DEDUP_WINDOW_MS},
    usecase::RoomAccessPolicy,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "porchlight-server")]
#[command(about = "Real-time chat, live location and notification hub", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "PORCHLIGHT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORCHLIGHT_PORT", default_value = "8080")]
    pub port: u16,

    /// HS256 secret used to verify access tokens
    #[arg(long, env = "PORCHLIGHT_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Window within which identical notifications are pushed only once
    #[arg(long, env = "PORCHLIGHT_DEDUP_WINDOW_MS", default_value_t = DEFAULT_DEDUP_WINDOW_MS)]
    pub dedup_window_ms: i64,

    /// Maximum number of keys tracked by the notification dedup guard
    #[arg(long, env = "PORCHLIGHT_DEDUP_CAPACITY", default_value_t = DEFAULT_DEDUP_CAPACITY)]
    pub dedup_capacity: usize,

    /// Room admission policy: `verified` or `open`
    #[arg(long, env = "PORCHLIGHT_ROOM_ACCESS", default_value = "verified")]
    pub room_access: RoomAccessPolicy,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "PORCHLIGHT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Resolved settings handed to the composition root.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub dedup_window_ms: i64,
    pub dedup_capacity: usize,
    pub room_access: RoomAccessPolicy,
}

impl HubConfig {
    /// Defaults for everything except the token secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: jwt_secret.into(),
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            room_access: RoomAccessPolicy::default(),
        }
    }
}

impl From<Args> for HubConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            jwt_secret: args.jwt_secret,
            dedup_window_ms: args.dedup_window_ms,
            dedup_capacity: args.dedup_capacity,
            room_access: args.room_access,
        }
    }
}
