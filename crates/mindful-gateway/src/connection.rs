use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Represents a connected WebSocket client.
#[derive(Debug)]
pub struct Connection {
    pub id: Uuid,
    pub session_id: Uuid,
    pub tx: mpsc::UnboundedSender<String>,
}

/// Manages active WebSocket connections. A session may be open in several
/// tabs; every one of them receives that session's events.
pub struct ConnectionManager {
    connections: RwLock<HashMap<Uuid, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add(&self, conn: Connection) {
        let id = conn.id;
        self.connections.write().await.insert(id, conn);
        tracing::info!(connection_id = %id, "Connection added");
    }

    pub async fn remove(&self, id: Uuid) {
        self.connections.write().await.remove(&id);
        tracing::info!(connection_id = %id, "Connection removed");
    }

    /// Sends `message` to every connection of `session_id`; returns how many
    /// connections accepted it.
    pub async fn send_to_session(&self, session_id: Uuid, message: &str) -> usize {
        let conns = self.connections.read().await;
        conns
            .values()
            .filter(|conn| conn.session_id == session_id)
            .filter(|conn| conn.tx.send(message.to_string()).is_ok())
            .count()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_only_that_session() {
        let manager = ConnectionManager::new();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        for (tx, session_id) in [(tx1, session_a), (tx2, session_a), (tx3, session_b)] {
            manager
                .add(Connection {
                    id: Uuid::new_v4(),
                    session_id,
                    tx,
                })
                .await;
        }

        assert_eq!(manager.send_to_session(session_a, "hello").await, 2);
        assert_eq!(rx1.recv().await.unwrap(), "hello");
        assert_eq!(rx2.recv().await.unwrap(), "hello");
        assert!(rx3.try_recv().is_err());
        assert_eq!(manager.connection_count().await, 3);
    }

    #[tokio::test]
    async fn test_remove() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        manager.add(Connection { id, session_id, tx }).await;
        manager.remove(id).await;
        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(manager.send_to_session(session_id, "x").await, 0);
    }
}
