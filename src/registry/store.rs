//! Client registry implementation
//!
//! Maps peripheral names to their live connection. Connection tasks register
//! and unregister; the outbound sender only reads.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::entry::PeripheralConnection;

/// Registry of named peripheral connections
///
/// Thread-safe via `RwLock`. Locks are held only for the map operation, never
/// across I/O on a connection.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    /// Map of peripheral name to connection
    clients: RwLock<HashMap<String, Arc<PeripheralConnection>>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under `name`
    ///
    /// Replaces any existing entry. The superseded connection is returned but
    /// not closed; its own read loop still owns that.
    pub async fn register(
        &self,
        name: &str,
        connection: Arc<PeripheralConnection>,
    ) -> Option<Arc<PeripheralConnection>> {
        let session_id = connection.id();
        let previous = self.clients.write().await.insert(name.to_string(), connection);

        match &previous {
            Some(old) => tracing::info!(
                peripheral = name,
                session_id = session_id,
                superseded = old.id(),
                "Peripheral re-registered"
            ),
            None => tracing::info!(peripheral = name, session_id = session_id, "Peripheral registered"),
        }

        previous
    }

    /// Remove `name` only if it still maps to `connection`
    ///
    /// Returns `true` if the entry was removed. A connection that has been
    /// superseded by a reconnect under the same name leaves the newer entry
    /// in place.
    pub async fn unregister(&self, name: &str, connection: &Arc<PeripheralConnection>) -> bool {
        let mut clients = self.clients.write().await;

        match clients.get(name) {
            Some(current) if Arc::ptr_eq(current, connection) => {
                clients.remove(name);
                tracing::info!(peripheral = name, session_id = connection.id(), "Peripheral unregistered");
                true
            }
            Some(current) => {
                tracing::debug!(
                    peripheral = name,
                    current = current.id(),
                    stale = connection.id(),
                    "Stale unregister ignored"
                );
                false
            }
            None => false,
        }
    }

    /// Look up the connection for `name`
    pub async fn get(&self, name: &str) -> Option<Arc<PeripheralConnection>> {
        self.clients.read().await.get(name).cloned()
    }

    /// Check if a peripheral is registered
    pub async fn contains(&self, name: &str) -> bool {
        self.clients.read().await.contains_key(name)
    }

    /// Names of all registered peripherals
    pub async fn names(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }

    /// Number of registered peripherals
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Check if no peripherals are registered
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Remove every entry, returning the connections
    pub async fn clear(&self) -> Vec<Arc<PeripheralConnection>> {
        self.clients.write().await.drain().map(|(_, conn)| conn).collect()
    }
}
