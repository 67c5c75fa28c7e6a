use super::{CredentialStore, Credentials};
use crate::{error::StoreError, types::Jid, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

const CREDS_FILE: &str = "session.creds";

/// File-backed credential store.
///
/// Layout: one file under the session directory, first line the paired JID
/// (empty when unpaired), followed by the opaque library payload.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(CREDS_FILE),
        }
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        let bytes = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Load(e.to_string()).into()),
        };
        let split = bytes.iter().position(|&b| b == b'\n');
        let (header, payload) = match split {
            Some(i) => (&bytes[..i], bytes[i + 1..].to_vec()),
            None => (&bytes[..], Vec::new()),
        };
        let header = std::str::from_utf8(header)
            .map_err(|e| StoreError::Load(format!("bad header: {e}")))?
            .trim();
        let id = if header.is_empty() {
            None
        } else {
            Some(
                header
                    .parse::<Jid>()
                    .map_err(|e| StoreError::Load(e.to_string()))?,
            )
        };
        Ok(Some(Credentials { id, payload }))
    }

    async fn save(&self, creds: &Credentials) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::Save(e.to_string()))?;
        }
        let header = creds
            .id
            .as_ref()
            .map(|j| j.to_string())
            .unwrap_or_default();
        let mut bytes = header.into_bytes();
        bytes.push(b'\n');
        bytes.extend_from_slice(&creds.payload);
        fs::write(&self.path, bytes)
            .await
            .map_err(|e| StoreError::Save(e.to_string()).into())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Save(e.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load().await.unwrap().is_none());

        let creds = Credentials {
            id: Some(Jid::user_jid("919876543210")),
            payload: b"opaque-key-material".to_vec(),
        };
        store.save(&creds).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, creds);
    }

    #[tokio::test]
    async fn file_store_unpaired_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let creds = Credentials {
            id: None,
            payload: vec![0, 1, 2],
        };
        store.save(&creds).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert!(loaded.id.is_none());
        assert_eq!(loaded.payload, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.clear().await.unwrap();

        store.save(&Credentials::default()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
