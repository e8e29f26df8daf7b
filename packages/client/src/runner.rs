//! Client execution logic with reconnection support.

use std::sync::Arc;

use porchlight_shared::time::SystemClock;

use crate::{
    api::ChatApi, chat_view::ChatView, error::ClientError, reconnect::ReconnectPolicy,
    session::Session, ui::spawn_line_reader,
};

/// Everything the CLI needs to open a session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub ws_url: String,
    /// REST root, e.g. `http://127.0.0.1:8080`
    pub api_url: String,
    pub token: String,
    pub booking_id: String,
    pub user_id: String,
}

/// Run the client, reconnecting per [`ReconnectPolicy`].
///
/// The chat view lives across reconnects, so unconfirmed sends and the
/// folded statuses are kept; rooms are re-joined by each new session.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let policy = ReconnectPolicy::default();
    let api = ChatApi::new(&config.api_url, &config.token);
    let view = ChatView::new(&config.booking_id, &config.user_id);
    let session = Session::new(
        &config.ws_url,
        &config.token,
        api,
        view,
        Arc::new(SystemClock),
    );
    let mut input = spawn_line_reader(&config.user_id);

    let mut failed_attempts = 0;

    loop {
        tracing::info!(
            "Connecting to {} as '{}' (attempt {}/{})",
            config.ws_url,
            config.user_id,
            failed_attempts + 1,
            policy.max_attempts
        );

        match session.run(&mut input).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e) => {
                // A drop after a successful connect starts a fresh budget
                if matches!(e, ClientError::ConnectionLost) {
                    failed_attempts = 0;
                }

                if !policy.should_retry(&e, failed_attempts) {
                    tracing::error!("{}", e);
                    if !ReconnectPolicy::should_exit_immediately(&e) {
                        tracing::error!(
                            "Failed to reconnect after {} attempts. Exiting.",
                            policy.max_attempts
                        );
                    }
                    return Err(e);
                }

                tracing::warn!("{}", e);
                failed_attempts += 1;
                tracing::info!(
                    "Reconnecting in {} ms... (attempt {}/{})",
                    policy.interval.as_millis(),
                    failed_attempts,
                    policy.max_attempts
                );
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}
