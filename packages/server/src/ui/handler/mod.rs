//! Request handlers.

mod http;
mod websocket;

pub use http::{
    health_check, list_chat_messages, list_notifications, mark_all_notifications_read,
    mark_notification_read, refresh_admin_stats, register_booking, send_chat_message,
    start_live_session, stop_live_session, update_booking_status, update_payment_status,
};
pub use websocket::websocket_handler;
