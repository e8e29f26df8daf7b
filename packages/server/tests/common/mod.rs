//! Helpers shared by the integration tests.
//!
//! Connections here are plain channels registered with the real hub, so
//! every frame a test observes went through the same encoding and room
//! fan-out as a WebSocket client would see.

#![allow(dead_code)]

use std::sync::Arc;

use porchlight_server::{
    bootstrap::build_state,
    config::HubConfig,
    domain::{BookingId, BookingStatus, ConnectionId, UserId},
    ui::{AppState, dispatch_frame},
    usecase::{RegisterBooking, RoomAccessPolicy},
};
use porchlight_shared::time::ManualClock;
use serde_json::Value;
use tokio::sync::mpsc;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestHub {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
}

impl TestHub {
    pub fn start(policy: RoomAccessPolicy) -> Self {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let mut config = HubConfig::new(JWT_SECRET);
        config.room_access = policy;
        let state = build_state(&config, clock.clone());
        Self { state, clock }
    }

    /// Register a channel-backed connection, authenticated as `user` if given.
    pub async fn connect(&self, user: Option<&str>) -> TestConnection {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::generate();
        self.state
            .connection_usecase
            .connect(id.clone(), user.map(user_id), tx)
            .await;
        TestConnection { id, rx }
    }

    /// Feed one inbound frame as if `conn` had sent it.
    pub async fn send(&self, conn: &TestConnection, frame: Value) {
        dispatch_frame(&self.state, &conn.id, &frame.to_string()).await;
    }

    /// Create a booking between `client` and `worker` and move it to `status`.
    pub async fn booking(&self, id: &str, client: &str, worker: &str, status: BookingStatus) -> BookingId {
        let booking = self
            .state
            .booking_events_usecase
            .register(RegisterBooking {
                booking_id: Some(booking_id(id)),
                client_id: user_id(client),
                worker_id: user_id(worker),
                price: 1_200,
            })
            .await
            .unwrap();
        if status != BookingStatus::Pending {
            self.state
                .booking_events_usecase
                .update_status(&user_id(worker), &booking.id, status)
                .await
                .unwrap();
        }
        booking.id
    }
}

pub struct TestConnection {
    pub id: ConnectionId,
    rx: mpsc::UnboundedReceiver<String>,
}

impl TestConnection {
    /// Every frame received so far, decoded.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(raw) = self.rx.try_recv() {
            frames.push(serde_json::from_str(&raw).unwrap());
        }
        frames
    }

    /// Received frames whose event name is `event`.
    pub fn events(&mut self, event: &str) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|f| f["event"] == event)
            .collect()
    }
}

pub fn user_id(raw: &str) -> UserId {
    UserId::new(raw.to_string()).unwrap()
}

pub fn booking_id(raw: &str) -> BookingId {
    BookingId::new(raw.to_string()).unwrap()
}
