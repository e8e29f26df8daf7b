//! UI layer: HTTP and WebSocket entry points of the hub.

mod auth;
mod dispatcher;
pub mod error;
mod handler;
mod server;
mod signal;
pub mod state;

pub use auth::AuthUser;
pub use dispatcher::dispatch_frame;
pub use error::{ApiError, ApiResult};
pub use server::{Server, router};
pub use state::AppState;
