//! Per-user push channels for open WebSocket connections

use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::PushEvent;

/// Sender half feeding one WebSocket connection
pub type PushSender = mpsc::UnboundedSender<Message>;

struct PushConnection {
    user_id: Uuid,
    sender: PushSender,
}

/// Registry of live connections, keyed by connection id.
///
/// A user may have several connections (one per tab or device); every one of
/// them receives the user's frames.
#[derive(Default)]
pub struct PushHub {
    connections: RwLock<HashMap<Uuid, PushConnection>>,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the receiver to forward into the socket
    pub async fn add(&self, conn_id: Uuid, user_id: Uuid) -> mpsc::UnboundedReceiver<Message> {
        let (sender, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .await
            .insert(conn_id, PushConnection { user_id, sender });
        rx
    }

    pub async fn remove(&self, conn_id: Uuid) {
        self.connections.write().await.remove(&conn_id);
    }

    /// Send `event` to every connection of `user_id`, returning how many were reached.
    ///
    /// Closed channels are skipped; their socket task removes them on exit.
    pub async fn send_to_user(&self, user_id: Uuid, event: &PushEvent) -> usize {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode push event: {}", e);
                return 0;
            }
        };

        let conns = self.connections.read().await;
        conns
            .values()
            .filter(|conn| conn.user_id == user_id)
            .filter(|conn| conn.sender.send(Message::Text(text.clone())).is_ok())
            .count()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
