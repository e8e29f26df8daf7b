//! メッセージ送信（通知）の実装
//!
//! `MessagePusher` / `RoomRegistry` の具体的な実装を提供します。
//!
//! - `websocket`: WebSocket 接続を束ねるプロセス内ハブ
//! - 複数プロセス構成では pub/sub バックプレーンを挟む実装に差し替える

pub mod websocket;

pub use websocket::WebSocketHub;
