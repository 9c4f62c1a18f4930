use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::realtime::connections::ConnId;

/// One authenticated account on one live connection.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    pub account_id: i64,
    pub name: String,
    pub conn: ConnId,
}

/// In-memory map of authenticated accounts to their live connections.
///
/// This is bookkeeping for the disconnect path only; the connected-users
/// list handed to clients always comes from the credential store.
#[derive(Default)]
pub struct PresenceRegistry {
    entries: RwLock<HashMap<i64, PresenceEntry>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for an account.
    pub async fn insert(&self, entry: PresenceEntry) {
        self.entries.write().await.insert(entry.account_id, entry);
    }

    /// Remove and return the entry owned by the given connection, if any.
    pub async fn remove_by_conn(&self, conn: ConnId) -> Option<PresenceEntry> {
        let mut entries = self.entries.write().await;
        let account_id = entries
            .values()
            .find(|entry| entry.conn == conn)
            .map(|entry| entry.account_id)?;
        entries.remove(&account_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(account_id: i64, conn: ConnId) -> PresenceEntry {
        PresenceEntry {
            account_id,
            name: format!("user {}", account_id),
            conn,
        }
    }

    #[tokio::test]
    async fn insert_then_remove_by_conn() {
        let registry = PresenceRegistry::new();
        registry.insert(entry(1, 10)).await;
        registry.insert(entry(2, 20)).await;
        assert_eq!(registry.len().await, 2);

        let removed = registry.remove_by_conn(10).await.unwrap();
        assert_eq!(removed.account_id, 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn remove_unknown_conn_is_none() {
        let registry = PresenceRegistry::new();
        registry.insert(entry(1, 10)).await;
        assert!(registry.remove_by_conn(99).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn reauthenticate_overwrites_previous_connection() {
        let registry = PresenceRegistry::new();
        registry.insert(entry(1, 10)).await;
        registry.insert(entry(1, 11)).await;
        assert_eq!(registry.len().await, 1);

        // The stale connection no longer owns an entry
        assert!(registry.remove_by_conn(10).await.is_none());
        let removed = registry.remove_by_conn(11).await.unwrap();
        assert_eq!(removed.account_id, 1);
    }
}
