//! Messaging-client boundary.
//!
//! The session manager and gateway only talk to the network through
//! [`MessagingClient`]; the pairing cryptography and wire protocol live
//! behind it and are opaque to this crate.

mod send;

use crate::error::{ConnectionError, Error};
use crate::events::ConnectionEvent;
use crate::store::{Credentials, Store};
use crate::types::{Jid, MessageId};
use async_trait::async_trait;
use sha2::Digest;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

pub use send::SendReceipt;

/// Async trait for the messaging-client boundary.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Begin establishing a session. Progress is reported as
    /// [`ConnectionEvent`]s on the channel handed out at construction.
    async fn start(&self) -> crate::Result<()>;

    /// Deliver a text message to the given destination.
    async fn send_text(&self, to: &Jid, body: &str) -> crate::Result<SendReceipt>;

    /// Tear down the connection.
    async fn close(&self) -> crate::Result<()>;
}

/// Client for one WhatsApp web multidevice session.
///
/// Pairing completion is driven from outside this crate: whatever embeds
/// the client (the protocol library's network task in production, the
/// test harness here) calls [`WaClient::complete_pairing`] once the code
/// served at `/qr` has been scanned and verified. Until that happens,
/// `start()` only emits the pairing code and the session stays in pairing.
pub struct WaClient {
    store: Store,
    creds: RwLock<Option<Credentials>>,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    connected: AtomicBool,
    logged_in: AtomicBool,
}

impl WaClient {
    /// Create a client with the given credential store. Returns the client
    /// and the receiving end of its event channel.
    pub fn new(store: Store) -> (Arc<Self>, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let client = Arc::new(Self {
            store,
            creds: RwLock::new(None),
            event_tx,
            connected: AtomicBool::new(false),
            logged_in: AtomicBool::new(false),
        });
        (client, event_rx)
    }

    /// Whether the client currently holds a live connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Whether a paired session exists.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    /// Our JID if paired.
    pub async fn own_id(&self) -> Option<Jid> {
        self.creds.read().await.as_ref().and_then(|c| c.id.clone())
    }

    /// Persist credentials after a scan completed and mark the session live.
    /// The payload is the library's opaque key material.
    pub async fn complete_pairing(&self, jid: Jid, payload: Vec<u8>) -> crate::Result<()> {
        let creds = Credentials {
            id: Some(jid),
            payload,
        };
        self.store.save(&creds).await?;
        *self.creds.write().await = Some(creds);
        self.logged_in.store(true, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        self.emit(ConnectionEvent::Open);
        Ok(())
    }

    /// Unpair and drop persisted credentials.
    pub async fn logout(&self) -> crate::Result<()> {
        self.store.clear().await?;
        *self.creds.write().await = None;
        self.logged_in.store(false, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn emit(&self, evt: ConnectionEvent) {
        // Receiver dropped means the session manager is gone; nothing to do.
        let _ = self.event_tx.send(evt);
    }
}

#[async_trait]
impl MessagingClient for WaClient {
    async fn start(&self) -> crate::Result<()> {
        let creds = self.store.load().await?;
        let paired = creds.as_ref().is_some_and(|c| c.is_paired());
        *self.creds.write().await = creds;

        if !paired {
            let code = generate_pairing_code();
            tracing::info!("no persisted session, requesting pairing");
            self.emit(ConnectionEvent::PairingCode(code));
            return Ok(());
        }

        self.connected.store(true, Ordering::SeqCst);
        self.logged_in.store(true, Ordering::SeqCst);
        tracing::info!("session restored from store");
        self.emit(ConnectionEvent::Open);
        Ok(())
    }

    async fn send_text(&self, to: &Jid, body: &str) -> crate::Result<SendReceipt> {
        if !self.is_connected() {
            return Err(Error::Connection(ConnectionError::Disconnected));
        }
        let id = generate_message_id();
        tracing::debug!(to = %to, id = %id, len = body.len(), "delivering text");
        Ok(SendReceipt {
            id,
            timestamp: std::time::SystemTime::now(),
            sender: self.own_id().await,
        })
    }

    async fn close(&self) -> crate::Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Generate a message ID (3EB0 + hex of hash).
pub fn generate_message_id() -> MessageId {
    use std::time::{SystemTime, UNIX_EPOCH};
    let mut data = Vec::with_capacity(8 + 5 + 16);
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    data.extend_from_slice(&t.to_be_bytes());
    data.extend_from_slice(b"@c.us");
    data.extend_from_slice(&rand::random::<[u8; 16]>());
    let hash = sha2::Sha256::digest(&data);
    format!("3EB0{}", hex::encode(&hash[..9]).to_uppercase())
}

/// Opaque one-time pairing token, rendered as a QR for the user to scan.
fn generate_pairing_code() -> String {
    hex::encode(rand::random::<[u8; 16]>()).to_uppercase()
}
