//! Live attendance: in-memory session state, typed events, and the
//! per-class `WebSocket` connection registry used for broadcast delivery.

pub mod events;
pub mod session;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A message destined for a specific `WebSocket` client.
pub type WsTx = mpsc::UnboundedSender<String>;

/// Identifies a connected client within a class's live channel.
///
/// Carries the identity claim established at connection upgrade; it is
/// immutable for the connection's lifetime and authorizes every event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    Teacher(Uuid),
    Student(Uuid),
}

impl ClientKey {
    /// The user id behind this connection.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        match self {
            Self::Teacher(id) | Self::Student(id) => *id,
        }
    }

    #[must_use]
    pub const fn is_teacher(&self) -> bool {
        matches!(self, Self::Teacher(_))
    }

    #[must_use]
    pub const fn role_str(&self) -> &'static str {
        match self {
            Self::Teacher(_) => "teacher",
            Self::Student(_) => "student",
        }
    }
}

/// Tracks all active `WebSocket` connections per class.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    /// `class_id` → map of `ClientKey` → sender channel
    classes: Arc<DashMap<Uuid, DashMap<ClientKey, WsTx>>>,
}

impl ConnectionRegistry {
    /// Create a new empty connection registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: Arc::new(DashMap::new()),
        }
    }

    /// Register a client connection for a class.
    pub fn register(&self, class_id: Uuid, key: ClientKey, tx: WsTx) {
        self.classes.entry(class_id).or_default().insert(key, tx);
    }

    /// Unregister a client connection from a class.
    pub fn unregister(&self, class_id: Uuid, key: &ClientKey) {
        if let Some(clients) = self.classes.get(&class_id) {
            clients.remove(key);
        }
        // remove_if holds the shard write lock across the emptiness check,
        // so a concurrent register cannot be wiped out with the class entry.
        self.classes
            .remove_if(&class_id, |_, clients| clients.is_empty());
    }

    /// Broadcast a message to all connected clients of a class.
    pub fn broadcast(&self, class_id: Uuid, message: &str) {
        if let Some(clients) = self.classes.get(&class_id) {
            for entry in clients.iter() {
                let _ = entry.value().send(message.to_string());
            }
        }
    }

    /// Broadcast a message to all clients of a class except the sender.
    pub fn broadcast_except(&self, class_id: Uuid, sender: &ClientKey, message: &str) {
        if let Some(clients) = self.classes.get(&class_id) {
            for entry in clients.iter() {
                if entry.key() != sender {
                    let _ = entry.value().send(message.to_string());
                }
            }
        }
    }

    /// Check if a specific client is connected.
    #[must_use]
    pub fn is_connected(&self, class_id: Uuid, key: &ClientKey) -> bool {
        self.classes
            .get(&class_id)
            .is_some_and(|clients| clients.contains_key(key))
    }
}
