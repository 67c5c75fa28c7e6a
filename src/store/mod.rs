//! Credential persistence boundary.
//!
//! The credential payload format belongs to the messaging-client library and
//! is treated as opaque bytes here; the store only moves it across restarts.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::types::Jid;
use async_trait::async_trait;
use std::sync::Arc;

/// Persisted session credentials for one linked device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Our JID after pairing (None if never paired).
    pub id: Option<Jid>,
    /// Opaque key material owned by the client library.
    pub payload: Vec<u8>,
}

impl Credentials {
    pub fn is_paired(&self) -> bool {
        self.id.is_some()
    }
}

/// Store trait: persist and load session credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load credentials, or None when no session has been persisted.
    async fn load(&self) -> crate::Result<Option<Credentials>>;

    /// Save credentials (after pairing or key rotation).
    async fn save(&self, creds: &Credentials) -> crate::Result<()>;

    /// Delete persisted credentials (logout).
    async fn clear(&self) -> crate::Result<()>;
}

/// Alias for shared store (common usage).
pub type Store = Arc<dyn CredentialStore>;
