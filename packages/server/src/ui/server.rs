//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        health_check, list_chat_messages, list_notifications, mark_all_notifications_read,
        mark_notification_read, refresh_admin_stats, register_booking, send_chat_message,
        start_live_session, stop_live_session, update_booking_status, update_payment_status,
        websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Build the router with every endpoint of the hub.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .route(
            "/api/chat/{booking_id}",
            get(list_chat_messages).post(send_chat_message),
        )
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/mark-all", put(mark_all_notifications_read))
        .route("/api/notifications/{id}/read", put(mark_notification_read))
        .route("/api/bookings", post(register_booking))
        .route("/api/bookings/{id}/start-live", put(start_live_session))
        .route("/api/bookings/{id}/stop-live", put(stop_live_session))
        .route("/api/bookings/{id}/status", put(update_booking_status))
        .route("/api/bookings/{id}/payment", put(update_payment_status))
        .route("/api/admin/stats/refresh", post(refresh_admin_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Real-time hub server
///
/// # Example
///
/// ```ignore
/// let state = bootstrap::build_state(&config, Arc::new(SystemClock));
/// Server::new(state).run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Run the hub until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = router(self.state);

        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("porchlight hub listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?token=<jwt>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
