use super::{CredentialStore, Credentials};
use crate::{error::StoreError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory credential store (for testing or single-run; not persistent).
pub struct MemoryStore {
    creds: RwLock<Option<Credentials>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            creds: RwLock::new(None),
        }
    }

    /// Pre-seeded store, as if a session had already been paired.
    pub fn with_credentials(creds: Credentials) -> Self {
        Self {
            creds: RwLock::new(Some(creds)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        Ok(self
            .creds
            .read()
            .map_err(|e| StoreError::Load(e.to_string()))?
            .clone())
    }

    async fn save(&self, creds: &Credentials) -> Result<()> {
        *self
            .creds
            .write()
            .map_err(|e| StoreError::Save(e.to_string()))? = Some(creds.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self
            .creds
            .write()
            .map_err(|e| StoreError::Save(e.to_string()))? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Jid;

    #[tokio::test]
    async fn memory_store_save_and_load() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        let creds = Credentials {
            id: Some(Jid::user_jid("919876543210")),
            payload: vec![1, 2, 3],
        };
        store.save(&creds).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, creds);
        assert!(loaded.is_paired());
    }

    #[tokio::test]
    async fn memory_store_clear() {
        let creds = Credentials {
            id: Some(Jid::user_jid("1234567890")),
            payload: vec![],
        };
        let store = MemoryStore::with_credentials(creds);
        assert!(store.load().await.unwrap().is_some());
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
